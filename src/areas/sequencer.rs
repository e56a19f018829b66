//! The list of commits a cherry-pick still has to replay
//!
//! Lives under `.git/sequencer/` while a multi-commit pick is stopped:
//! `head` is where `HEAD` was before the first pick, `abort-safety` where it
//! was after the last successful one, and `todo` holds one
//! `pick <oid> <subject>` line per remaining commit.

use crate::artifacts::core::lockfile::Lockfile;
use crate::artifacts::merge::MergeError;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

const SEQUENCER_DIR: &str = "sequencer";
const HEAD_FILE: &str = "head";
const ABORT_SAFETY_FILE: &str = "abort-safety";
const TODO_FILE: &str = "todo";
const PICK: &str = "pick";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickCommand {
    pub oid: ObjectId,
    pub subject: String,
}

#[derive(Debug)]
pub struct Sequencer {
    path: PathBuf,
    commands: VecDeque<PickCommand>,
}

impl Sequencer {
    pub fn new(git_path: &Path) -> Self {
        Sequencer {
            path: git_path.join(SEQUENCER_DIR),
            commands: VecDeque::new(),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.path.is_dir()
    }

    /// Record where `HEAD` stands before anything is picked.
    pub fn start(&mut self, head: &ObjectId) -> anyhow::Result<()> {
        if self.in_progress() {
            return Err(MergeError::SequenceInProgress("cherry-pick").into());
        }
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("could not create {}", self.path.display()))?;

        self.write_oid(HEAD_FILE, head)?;
        self.write_oid(ABORT_SAFETY_FILE, head)?;
        self.commands.clear();

        Ok(())
    }

    pub fn pick(&mut self, oid: ObjectId, subject: &str) {
        self.commands.push_back(PickCommand {
            oid,
            subject: subject.to_string(),
        });
    }

    pub fn next_command(&self) -> Option<&PickCommand> {
        self.commands.front()
    }

    /// Forget the command just applied; `head` is the commit it produced.
    pub fn drop_command(&mut self, head: &ObjectId) -> anyhow::Result<()> {
        self.commands.pop_front();
        self.write_oid(ABORT_SAFETY_FILE, head)
    }

    pub fn head_oid(&self) -> anyhow::Result<ObjectId> {
        self.read_oid(HEAD_FILE)
    }

    pub fn abort_safety_oid(&self) -> anyhow::Result<ObjectId> {
        self.read_oid(ABORT_SAFETY_FILE)
    }

    /// Read the remaining commands of a stopped sequence.
    pub fn load(&mut self) -> anyhow::Result<()> {
        if !self.in_progress() {
            return Err(MergeError::NoSequence("cherry-pick").into());
        }
        let todo_path = self.path.join(TODO_FILE);
        let todo = match std::fs::read_to_string(&todo_path) {
            Ok(todo) => todo,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("could not read {}", todo_path.display()));
            }
        };

        self.commands = todo
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_todo_line)
            .collect::<anyhow::Result<_>>()?;
        debug!(remaining = self.commands.len(), "sequencer loaded");

        Ok(())
    }

    pub fn dump(&self) -> anyhow::Result<()> {
        let todo = self
            .commands
            .iter()
            .map(|command| format!("{PICK} {} {}\n", command.oid, command.subject))
            .collect::<String>();

        let mut lock = Lockfile::acquire(&self.path.join(TODO_FILE))?;
        lock.write_bytes(todo.as_bytes())?;
        lock.commit()?;

        Ok(())
    }

    /// Remove all sequencer state.
    pub fn quit(&mut self) -> anyhow::Result<()> {
        self.commands.clear();
        match std::fs::remove_dir_all(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn write_oid(&self, file: &str, oid: &ObjectId) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire(&self.path.join(file))?;
        lock.write_bytes(format!("{oid}\n").as_bytes())?;
        lock.commit()?;

        Ok(())
    }

    fn read_oid(&self, file: &str) -> anyhow::Result<ObjectId> {
        let path = self.path.join(file);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?;

        ObjectId::try_parse(content.trim().to_string())
    }
}

fn parse_todo_line(line: &str) -> anyhow::Result<PickCommand> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next()) {
        (Some(PICK), Some(oid)) => Ok(PickCommand {
            oid: ObjectId::try_parse(oid.to_string())?,
            subject: parts.next().unwrap_or_default().to_string(),
        }),
        _ => anyhow::bail!("invalid sequencer line: {line}"),
    }
}
