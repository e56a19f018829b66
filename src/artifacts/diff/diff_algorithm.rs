use derive_new::new;
use std::fmt::Display;

/// A line and its 1-based position in the sequence it came from.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Line<T> {
    pub number: usize,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    Delete { a_line: Line<T> },
    Insert { b_line: Line<T> },
    Equal { a_line: Line<T>, b_line: Line<T> },
}

impl<T> Edit<T> {
    pub fn is_equal(&self) -> bool {
        matches!(self, Edit::Equal { .. })
    }

    pub fn a_line(&self) -> Option<&Line<T>> {
        match self {
            Edit::Delete { a_line } | Edit::Equal { a_line, .. } => Some(a_line),
            Edit::Insert { .. } => None,
        }
    }

    pub fn b_line(&self) -> Option<&Line<T>> {
        match self {
            Edit::Insert { b_line } | Edit::Equal { b_line, .. } => Some(b_line),
            Edit::Delete { .. } => None,
        }
    }

    fn symbol(&self) -> char {
        match self {
            Edit::Delete { .. } => '-',
            Edit::Insert { .. } => '+',
            Edit::Equal { .. } => ' ',
        }
    }

    fn value(&self) -> &T {
        match self {
            Edit::Delete { a_line } | Edit::Equal { a_line, .. } => &a_line.value,
            Edit::Insert { b_line } => &b_line.value,
        }
    }
}

impl<T: Display> Display for Edit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.symbol(), self.value())
    }
}

pub trait DiffAlgorithm<T> {
    type Trace;
    type EditPath;

    fn compute_shortest_edit(&self) -> Self::Trace;
    fn backtrack(&self) -> Self::EditPath;
    fn diff(&self) -> Vec<Edit<T>>;
}

/// Myers' greedy shortest edit script, O((N + M) D).
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<'d, T: Eq + Clone> DiffAlgorithm<T> for MyersDiff<'d, T> {
    type Trace = Vec<Vec<isize>>;
    type EditPath = Vec<(isize, isize, isize, isize)>;

    fn compute_shortest_edit(&self) -> Self::Trace {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        let offset = (n + m) as usize;

        // v[offset + k] holds the furthest x reached on diagonal k
        let mut v = vec![0; 2 * offset + 2];
        let mut trace = Vec::new();

        for d in 0..=(n + m) {
            trace.push(v.clone());

            for k in (-d..=d).step_by(2) {
                let idx = (offset as isize + k) as usize;

                let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                    // down from k + 1: an insertion
                    v[idx + 1]
                } else {
                    // right from k - 1: a deletion
                    v[idx - 1] + 1
                };

                let mut y = x - k;
                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
                    x += 1;
                    y += 1;
                }

                v[idx] = x;

                if x >= n && y >= m {
                    return trace;
                }
            }
        }

        trace
    }

    fn backtrack(&self) -> Self::EditPath {
        let (mut x, mut y) = (self.a.len() as isize, self.b.len() as isize);
        let offset = x + y;
        let mut edit_path = Vec::new();

        let trace = self.compute_shortest_edit();

        for (d, v) in trace.iter().enumerate().rev() {
            let d = d as isize;
            let k = x - y;
            let at = |k: isize| v[(offset + k) as usize];

            let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
                k + 1
            } else {
                k - 1
            };

            let prev_x = at(prev_k);
            let prev_y = prev_x - prev_k;

            while x > prev_x && y > prev_y {
                edit_path.push((x - 1, y - 1, x, y));
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                edit_path.push((prev_x, prev_y, x, y));
            }

            (x, y) = (prev_x, prev_y);
        }

        edit_path
    }

    fn diff(&self) -> Vec<Edit<T>> {
        if self.a.is_empty() && self.b.is_empty() {
            return Vec::new();
        }

        let a_line = |x: isize| Line::new(x as usize + 1, self.a[x as usize].clone());
        let b_line = |y: isize| Line::new(y as usize + 1, self.b[y as usize].clone());

        let mut diff = self
            .backtrack()
            .into_iter()
            .map(|(prev_x, prev_y, x, y)| {
                if x == prev_x {
                    Edit::Insert {
                        b_line: b_line(prev_y),
                    }
                } else if y == prev_y {
                    Edit::Delete {
                        a_line: a_line(prev_x),
                    }
                } else {
                    Edit::Equal {
                        a_line: a_line(prev_x),
                        b_line: b_line(prev_y),
                    }
                }
            })
            .collect::<Vec<_>>();

        diff.reverse();
        diff
    }
}
