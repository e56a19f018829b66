//! Restricting tree walks to a set of path prefixes
//!
//! The prefixes are stored as a trie of path components. A walk asks the
//! filter whether a name at the current level is relevant, then descends
//! with [`PathFilter::join`]. Once a full prefix has been matched every
//! name below it is relevant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Trie {
    matched: bool,
    children: HashMap<String, Trie>,
}

impl Trie {
    fn matching() -> Self {
        Trie {
            matched: true,
            children: HashMap::new(),
        }
    }

    fn insert<'p>(&mut self, components: impl IntoIterator<Item = &'p str>) {
        let node = components.into_iter().fold(self, |node, component| {
            node.children.entry(component.to_string()).or_default()
        });
        node.matched = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    trie: Trie,
    path: PathBuf,
}

impl PathFilter {
    /// A filter that lets every path through.
    pub fn any() -> Self {
        Self {
            trie: Trie::matching(),
            path: PathBuf::new(),
        }
    }

    /// A filter for the given prefixes. An empty list matches nothing.
    pub fn new<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let mut trie = Trie::default();
        for path in paths {
            trie.insert(path.as_ref().iter().filter_map(|component| component.to_str()));
        }

        Self {
            trie,
            path: PathBuf::new(),
        }
    }

    /// The directory this filter has descended into.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn matches(&self, name: &str) -> bool {
        self.trie.matched || self.trie.children.contains_key(name)
    }

    /// The filter for the entries of `name`.
    pub fn join(&self, name: &str) -> Self {
        let trie = if self.trie.matched {
            Trie::matching()
        } else {
            self.trie.children.get(name).cloned().unwrap_or_default()
        };

        Self {
            trie,
            path: self.path.join(name),
        }
    }
}
