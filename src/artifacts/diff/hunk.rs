//! Grouping of an edit script into `@@` hunks with three lines of context.

use crate::artifacts::diff::diff_algorithm::Edit;

const HUNK_CONTEXT: isize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk<T> {
    a_start: usize,
    b_start: usize,
    edits: Vec<Edit<T>>,
}

impl<T: Clone> Hunk<T> {
    /// Split `edits` into hunks, dropping runs of unchanged lines longer
    /// than twice the context.
    pub fn filter(edits: &[Edit<T>]) -> Vec<Hunk<T>> {
        let mut hunks = Vec::new();
        let mut offset: isize = 0;
        let len = edits.len() as isize;

        loop {
            while offset < len && edits[offset as usize].is_equal() {
                offset += 1;
            }
            if offset >= len {
                return hunks;
            }

            offset -= HUNK_CONTEXT + 1;
            let (a_start, b_start) = if offset < 0 {
                (0, 0)
            } else {
                let edit = &edits[offset as usize];
                (
                    edit.a_line().map_or(0, |line| line.number),
                    edit.b_line().map_or(0, |line| line.number),
                )
            };

            let mut hunk = Hunk {
                a_start,
                b_start,
                edits: Vec::new(),
            };
            offset = hunk.build(edits, offset);
            hunks.push(hunk);
        }
    }

    fn build(&mut self, edits: &[Edit<T>], mut offset: isize) -> isize {
        let len = edits.len() as isize;
        let mut counter: isize = -1;

        while counter != 0 {
            if offset >= 0 && counter > 0 {
                self.edits.push(edits[offset as usize].clone());
            }

            offset += 1;
            if offset >= len {
                break;
            }

            match edits.get((offset + HUNK_CONTEXT) as usize) {
                Some(edit) if !edit.is_equal() => counter = 2 * HUNK_CONTEXT + 1,
                _ => counter -= 1,
            }
        }

        offset
    }

    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    /// `@@ -a,b +c,d @@`
    pub fn header(&self) -> String {
        let a_lines = self.edits.iter().filter_map(Edit::a_line).collect::<Vec<_>>();
        let b_lines = self.edits.iter().filter_map(Edit::b_line).collect::<Vec<_>>();

        let a_start = a_lines.first().map_or(self.a_start, |line| line.number);
        let b_start = b_lines.first().map_or(self.b_start, |line| line.number);

        format!(
            "@@ -{},{} +{},{} @@",
            a_start,
            a_lines.len(),
            b_start,
            b_lines.len()
        )
    }
}
