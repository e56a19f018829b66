//! Line-level three-way merge
//!
//! `O` is the common ancestor, `A` and `B` the two sides. Lines of `O`
//! matched by both Myers diffs anchor the merge; the stretches between two
//! anchors form a chunk that is clean when at most one side changed it (or
//! both changed it the same way) and a conflict otherwise.

use crate::artifacts::diff::diff_algorithm::{DiffAlgorithm, Edit, MyersDiff};
use std::collections::HashMap;

type Line<'a> = &'a [u8];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<'a> {
    Clean(Vec<Line<'a>>),
    Conflict {
        o: Vec<Line<'a>>,
        a: Vec<Line<'a>>,
        b: Vec<Line<'a>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult<'a> {
    chunks: Vec<Chunk<'a>>,
}

impl<'a> MergeResult<'a> {
    pub fn is_clean(&self) -> bool {
        self.chunks
            .iter()
            .all(|chunk| matches!(chunk, Chunk::Clean(_)))
    }

    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    /// The merged text, conflicts framed by markers naming both sides.
    pub fn to_bytes(&self, a_name: &str, b_name: &str) -> Vec<u8> {
        let mut text = Vec::new();

        for chunk in &self.chunks {
            match chunk {
                Chunk::Clean(lines) => lines.iter().for_each(|line| text.extend_from_slice(line)),
                Chunk::Conflict { a, b, .. } => {
                    separator(&mut text, b'<', Some(a_name));
                    a.iter().for_each(|line| text.extend_from_slice(line));
                    separator(&mut text, b'=', None);
                    b.iter().for_each(|line| text.extend_from_slice(line));
                    separator(&mut text, b'>', Some(b_name));
                }
            }
        }

        text
    }
}

fn separator(text: &mut Vec<u8>, marker: u8, name: Option<&str>) {
    if text.last().is_some_and(|&byte| byte != b'\n') {
        text.push(b'\n');
    }

    text.extend(std::iter::repeat_n(marker, 7));
    if let Some(name) = name {
        text.push(b' ');
        text.extend_from_slice(name.as_bytes());
    }
    text.push(b'\n');
}

/// Split on `\n`, keeping the terminator with each line.
pub fn split_lines(data: &[u8]) -> Vec<Line<'_>> {
    data.split_inclusive(|&byte| byte == b'\n').collect()
}

pub struct Diff3<'a> {
    o: Vec<Line<'a>>,
    a: Vec<Line<'a>>,
    b: Vec<Line<'a>>,
    chunks: Vec<Chunk<'a>>,
    line_o: usize,
    line_a: usize,
    line_b: usize,
    match_a: HashMap<usize, usize>,
    match_b: HashMap<usize, usize>,
}

impl<'a> Diff3<'a> {
    pub fn merge(o: &'a [u8], a: &'a [u8], b: &'a [u8]) -> MergeResult<'a> {
        let (o, a, b) = (split_lines(o), split_lines(a), split_lines(b));
        let match_a = Self::match_set(&o, &a);
        let match_b = Self::match_set(&o, &b);

        let mut diff3 = Diff3 {
            o,
            a,
            b,
            chunks: Vec::new(),
            line_o: 0,
            line_a: 0,
            line_b: 0,
            match_a,
            match_b,
        };
        diff3.generate_chunks();

        MergeResult {
            chunks: diff3.chunks,
        }
    }

    /// Line numbers of `o` mapped to the equal line of `other`.
    fn match_set(o: &[Line<'a>], other: &[Line<'a>]) -> HashMap<usize, usize> {
        MyersDiff::new(o, other)
            .diff()
            .into_iter()
            .filter_map(|edit| match edit {
                Edit::Equal { a_line, b_line } => Some((a_line.number, b_line.number)),
                _ => None,
            })
            .collect()
    }

    fn generate_chunks(&mut self) {
        loop {
            match self.find_next_mismatch() {
                Some(1) => match self.find_next_match() {
                    (o, Some(a), Some(b)) => self.emit_chunk(o, a, b),
                    _ => return self.emit_final_chunk(),
                },
                Some(i) => self.emit_chunk(self.line_o + i, self.line_a + i, self.line_b + i),
                None => return self.emit_final_chunk(),
            }
        }
    }

    fn find_next_mismatch(&self) -> Option<usize> {
        let mut i = 1;
        while self.in_bounds(i)
            && Self::is_match(&self.match_a, self.line_o, self.line_a, i)
            && Self::is_match(&self.match_b, self.line_o, self.line_b, i)
        {
            i += 1;
        }

        self.in_bounds(i).then_some(i)
    }

    fn in_bounds(&self, i: usize) -> bool {
        self.line_o + i <= self.o.len()
            || self.line_a + i <= self.a.len()
            || self.line_b + i <= self.b.len()
    }

    fn is_match(matches: &HashMap<usize, usize>, line_o: usize, offset: usize, i: usize) -> bool {
        matches.get(&(line_o + i)) == Some(&(offset + i))
    }

    fn find_next_match(&self) -> (usize, Option<usize>, Option<usize>) {
        let mut o = self.line_o + 1;
        while o <= self.o.len()
            && !(self.match_a.contains_key(&o) && self.match_b.contains_key(&o))
        {
            o += 1;
        }

        (o, self.match_a.get(&o).copied(), self.match_b.get(&o).copied())
    }

    fn emit_chunk(&mut self, o: usize, a: usize, b: usize) {
        let chunk = Self::chunk_for(
            &self.o[self.line_o..o - 1],
            &self.a[self.line_a..a - 1],
            &self.b[self.line_b..b - 1],
        );
        self.chunks.push(chunk);

        (self.line_o, self.line_a, self.line_b) = (o - 1, a - 1, b - 1);
    }

    fn emit_final_chunk(&mut self) {
        let chunk = Self::chunk_for(
            &self.o[self.line_o..],
            &self.a[self.line_a..],
            &self.b[self.line_b..],
        );
        self.chunks.push(chunk);
    }

    fn chunk_for(o: &[Line<'a>], a: &[Line<'a>], b: &[Line<'a>]) -> Chunk<'a> {
        if a == o || a == b {
            Chunk::Clean(b.to_vec())
        } else if b == o {
            Chunk::Clean(a.to_vec())
        } else {
            Chunk::Conflict {
                o: o.to_vec(),
                a: a.to_vec(),
                b: b.to_vec(),
            }
        }
    }
}
