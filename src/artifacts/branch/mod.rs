//! Branch names and revision expressions
//!
//! - `branch_name`: validated branch names and ref paths
//! - `revision`: `<rev>^`, `<rev>~<n>` and `@` parsing and resolution

pub mod branch_name;
pub mod revision;

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub static INVALID_BRANCH_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]")
        .expect("branch name pattern compiles")
});
pub static PARENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\^$").expect("parent pattern compiles"));
pub static ANCESTOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\~(\d+)$").expect("ancestor pattern compiles"));
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RefError {
    #[error("{message}")]
    InvalidBranch { message: String },
    #[error("{}", render_with_hints(.message, .hints))]
    InvalidObject { message: String, hints: Vec<String> },
}

impl RefError {
    pub fn invalid_branch(message: impl Into<String>) -> Self {
        RefError::InvalidBranch {
            message: message.into(),
        }
    }

    pub fn invalid_object(message: impl Into<String>) -> Self {
        RefError::InvalidObject {
            message: message.into(),
            hints: Vec::new(),
        }
    }
}

fn render_with_hints(message: &str, hints: &[String]) -> String {
    if hints.is_empty() {
        return message.to_string();
    }

    let mut rendered = format!("{message}\nhint: The candidates are:");
    for hint in hints {
        rendered.push_str(&format!("\nhint:   {hint}"));
    }
    rendered
}
