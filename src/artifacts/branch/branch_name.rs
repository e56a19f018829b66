use crate::artifacts::branch::{INVALID_BRANCH_NAME_REGEX, RefError};

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const HEAD_REF_NAME: &str = "HEAD";

/// A ref path relative to the git directory, e.g. `refs/heads/main` or
/// `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn new(path: impl Into<String>) -> Self {
        SymRefName(path.into())
    }

    pub fn head() -> Self {
        SymRefName(HEAD_REF_NAME.to_string())
    }

    pub fn is_detached_head(&self) -> bool {
        self.0 == HEAD_REF_NAME
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    /// `refs/heads/main` -> `main`; other refs are returned unchanged.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(HEADS_PREFIX).unwrap_or(&self.0)
    }
}

impl From<&BranchName> for SymRefName {
    fn from(name: &BranchName) -> Self {
        SymRefName(format!("{HEADS_PREFIX}{name}"))
    }
}

impl std::fmt::Display for SymRefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: impl Into<String>) -> Result<Self, RefError> {
        let name = name.into();
        if name.is_empty() || INVALID_BRANCH_NAME_REGEX.is_match(&name) {
            return Err(RefError::invalid_branch(format!(
                "'{name}' is not a valid branch name."
            )));
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
