use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::SymRefName;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use colored::{ColoredString, Colorize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CommitDisplayFormat {
    #[default]
    Medium,
    #[value(name = "oneline")]
    OneLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CommitDecoration {
    #[default]
    Short,
    Full,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub revisions: Vec<String>,
    pub paths: Vec<PathBuf>,
    pub abbrev_commit: bool,
    pub format: CommitDisplayFormat,
    pub decorate: CommitDecoration,
    pub patch: bool,
}

/// Refs by the commit they point at, and the ref `HEAD` resolves to.
struct Decorations {
    reverse_refs: HashMap<ObjectId, Vec<SymRefName>>,
    current_ref: SymRefName,
}

impl Repository {
    /// Walk the history selected by the revisions and path filter, newest
    /// first, printing each commit.
    pub fn log(&mut self, options: &LogOptions) -> anyhow::Result<()> {
        let decorations = Decorations {
            reverse_refs: self.refs().reverse_refs()?,
            current_ref: self.refs().current_ref()?,
        };
        let mut rev_list = RevList::new(self, &options.revisions, &options.paths)?;
        let mut first = true;

        while let Some((oid, commit)) = rev_list.next_commit()? {
            if options.format == CommitDisplayFormat::Medium && !first {
                writeln!(self.writer())?;
            }
            first = false;

            match options.format {
                CommitDisplayFormat::Medium => {
                    self.show_commit_medium(&oid, &commit, options, &decorations)?
                }
                CommitDisplayFormat::OneLine => {
                    self.show_commit_oneline(&oid, &commit, options, &decorations)?
                }
            }

            if options.patch && !commit.is_merge() {
                let diff = rev_list.tree_diff(commit.parent(), &oid)?;
                if options.format == CommitDisplayFormat::Medium {
                    writeln!(self.writer())?;
                }
                self.print_change_set(&diff)?;
            }
        }

        Ok(())
    }

    fn show_commit_medium(
        &self,
        oid: &ObjectId,
        commit: &Commit,
        options: &LogOptions,
        decorations: &Decorations,
    ) -> anyhow::Result<()> {
        let header = format!("commit {}", abbrev_commit_id(oid, options.abbrev_commit));
        writeln!(
            self.writer(),
            "{}{}",
            header.yellow(),
            decorate(oid, options.decorate, decorations)
        )?;

        if commit.is_merge() {
            let parents = commit
                .parents()
                .iter()
                .map(ObjectId::to_short_oid)
                .collect::<Vec<_>>();
            writeln!(self.writer(), "Merge: {}", parents.join(" "))?;
        }

        writeln!(self.writer(), "Author: {}", commit.author().display_name())?;
        writeln!(
            self.writer(),
            "Date:   {}",
            commit.author().readable_timestamp()
        )?;
        writeln!(self.writer())?;
        for message_line in commit.message().lines() {
            writeln!(self.writer(), "    {message_line}")?;
        }

        Ok(())
    }

    fn show_commit_oneline(
        &self,
        oid: &ObjectId,
        commit: &Commit,
        options: &LogOptions,
        decorations: &Decorations,
    ) -> anyhow::Result<()> {
        writeln!(
            self.writer(),
            "{}{} {}",
            abbrev_commit_id(oid, options.abbrev_commit).yellow(),
            decorate(oid, options.decorate, decorations),
            commit.short_message()
        )?;

        Ok(())
    }
}

fn abbrev_commit_id(oid: &ObjectId, abbrev_commit: bool) -> String {
    if abbrev_commit {
        oid.to_short_oid()
    } else {
        oid.to_string()
    }
}

/// ` (HEAD -> master, topic)`, or nothing when no ref points at `oid`.
fn decorate(oid: &ObjectId, decoration: CommitDecoration, decorations: &Decorations) -> String {
    if decoration == CommitDecoration::None {
        return String::new();
    }
    let Some(ref_names) = decorations.reverse_refs.get(oid) else {
        return String::new();
    };

    // HEAD folds into the branch it is attached to
    let attached = !decorations.current_ref.is_detached_head();
    let (head, refs): (Vec<_>, Vec<_>) = ref_names
        .iter()
        .partition(|ref_name| ref_name.is_detached_head() && attached);

    let names = refs
        .into_iter()
        .map(|ref_name| {
            let name = match decoration {
                CommitDecoration::Full => ref_name.as_ref_path().to_string(),
                _ => ref_name.short_name().to_string(),
            };
            let name = ref_color(ref_name, name);

            match head.first() {
                Some(head) if *ref_name == decorations.current_ref => {
                    ref_color(head, format!("{} -> {name}", head.as_ref_path())).to_string()
                }
                _ => name.to_string(),
            }
        })
        .collect::<Vec<_>>();

    if names.is_empty() {
        return String::new();
    }

    format!(
        "{}{}{}",
        " (".yellow(),
        names.join(&", ".yellow().to_string()),
        ")".yellow()
    )
}

fn ref_color(ref_name: &SymRefName, name: String) -> ColoredString {
    if ref_name.is_detached_head() {
        name.bold().cyan()
    } else {
        name.bold().green()
    }
}
