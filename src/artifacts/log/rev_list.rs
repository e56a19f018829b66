//! Commits reachable from a set of start points, newest first
//!
//! Start points are revisions, optionally excluded with `^rev` or given as a
//! range `from..to` (everything reachable from `to` but not from `from`).
//! Commits are walked in commit-date order through every parent, so merged
//! histories interleave. With excluded revisions the list is limited up
//! front: the walk continues until no queued commit can still be
//! interesting.
//!
//! With path filters, a commit whose tree matches one of its parents on the
//! filtered paths is skipped and history continues through that parent only.

use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::diff::tree_diff::ChangeSet;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::{HashMap, VecDeque};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::trace;

static RANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\.\.(.*)$").expect("range pattern compiles"));
static EXCLUDE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^(.+)$").expect("exclude pattern compiles"));

const HEAD: &str = "HEAD";

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct RevFlags: u8 {
        const SEEN = 1 << 0;
        const ADDED = 1 << 1;
        const UNINTERESTING = 1 << 2;
        const TREESAME = 1 << 3;
    }
}

pub struct RevList<'r> {
    repository: &'r Repository,
    commits: HashMap<ObjectId, Commit>,
    flags: HashMap<ObjectId, RevFlags>,
    queue: VecDeque<ObjectId>,
    output: Vec<ObjectId>,
    limited: bool,
    has_start: bool,
    filter: Option<PathFilter>,
    diffs: HashMap<(Option<ObjectId>, ObjectId), ChangeSet>,
}

impl<'r> RevList<'r> {
    /// Without any included revision the walk starts from `HEAD`.
    pub fn new(
        repository: &'r Repository,
        revisions: &[String],
        paths: &[PathBuf],
    ) -> anyhow::Result<Self> {
        let mut rev_list = RevList {
            repository,
            commits: HashMap::new(),
            flags: HashMap::new(),
            queue: VecDeque::new(),
            output: Vec::new(),
            limited: false,
            has_start: false,
            filter: (!paths.is_empty()).then(|| PathFilter::new(paths)),
            diffs: HashMap::new(),
        };

        for revision in revisions {
            rev_list.handle_revision(revision)?;
        }
        if !rev_list.has_start {
            rev_list.set_start_point(HEAD, true)?;
        }
        if rev_list.limited {
            rev_list.limit_list()?;
        }

        Ok(rev_list)
    }

    /// Every remaining commit, in output order.
    pub fn collect_commits(mut self) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        let mut commits = Vec::new();
        while let Some(commit) = self.next_commit()? {
            commits.push(commit);
        }
        Ok(commits)
    }

    pub fn next_commit(&mut self) -> anyhow::Result<Option<(ObjectId, Commit)>> {
        while let Some(oid) = self.queue.pop_front() {
            if !self.limited {
                self.add_parents(&oid)?;
            }
            if self.is_marked(&oid, RevFlags::UNINTERESTING) || self.is_marked(&oid, RevFlags::TREESAME)
            {
                continue;
            }

            let commit = self.load_commit(&oid)?;
            return Ok(Some((oid, commit)));
        }

        Ok(None)
    }

    fn handle_revision(&mut self, revision: &str) -> anyhow::Result<()> {
        if let Some(captures) = RANGE_REGEX.captures(revision) {
            self.set_start_point(&captures[1], false)?;
            self.set_start_point(&captures[2], true)?;
        } else if let Some(captures) = EXCLUDE_REGEX.captures(revision) {
            self.set_start_point(&captures[1], false)?;
        } else {
            self.set_start_point(revision, true)?;
        }

        Ok(())
    }

    fn set_start_point(&mut self, revision: &str, interesting: bool) -> anyhow::Result<()> {
        let revision = if revision.is_empty() { HEAD } else { revision };
        let Some(oid) = self.resolve_start(revision)? else {
            return Ok(());
        };

        self.enqueue_commit(&oid)?;

        if interesting {
            self.has_start = true;
        } else {
            self.limited = true;
            self.mark(&oid, RevFlags::UNINTERESTING);
            self.mark_parents_uninteresting(&oid)?;
        }

        Ok(())
    }

    /// An unborn `HEAD` has no history; any other name must resolve.
    fn resolve_start(&self, revision: &str) -> anyhow::Result<Option<ObjectId>> {
        if revision == HEAD && self.repository.refs().read_head()?.is_none() {
            return Ok(None);
        }

        RevisionResolver::new(self.repository)
            .resolve_commit(revision)
            .map(Some)
    }

    fn load_commit(&mut self, oid: &ObjectId) -> anyhow::Result<Commit> {
        if let Some(commit) = self.commits.get(oid) {
            return Ok(commit.clone());
        }

        let commit = self.repository.database().load_commit(oid)?;
        self.commits.insert(oid.clone(), commit.clone());
        Ok(commit)
    }

    fn mark(&mut self, oid: &ObjectId, flag: RevFlags) -> bool {
        let flags = self.flags.entry(oid.clone()).or_default();
        let fresh = !flags.contains(flag);
        flags.insert(flag);
        fresh
    }

    fn is_marked(&self, oid: &ObjectId, flag: RevFlags) -> bool {
        self.flags
            .get(oid)
            .is_some_and(|flags| flags.contains(flag))
    }

    /// Insert after every commit at least as new, so equal dates keep
    /// their discovery order.
    fn enqueue_commit(&mut self, oid: &ObjectId) -> anyhow::Result<()> {
        if !self.mark(oid, RevFlags::SEEN) {
            return Ok(());
        }

        let date = self.load_commit(oid)?.timestamp();
        let mut position = self.queue.len();
        for (index, queued) in self.queue.iter().enumerate() {
            let queued_date = self
                .commits
                .get(queued)
                .map(Commit::timestamp)
                .unwrap_or(date);
            if queued_date < date {
                position = index;
                break;
            }
        }
        self.queue.insert(position, oid.clone());
        trace!(%oid, position, "queued commit");

        Ok(())
    }

    fn mark_parents_uninteresting(&mut self, oid: &ObjectId) -> anyhow::Result<()> {
        let mut pending = self.load_commit(oid)?.parents().to_vec();

        while let Some(parent) = pending.pop() {
            if !self.mark(&parent, RevFlags::UNINTERESTING) {
                continue;
            }
            if let Some(commit) = self.commits.get(&parent) {
                pending.extend(commit.parents().iter().cloned());
            }
        }

        Ok(())
    }

    fn limit_list(&mut self) -> anyhow::Result<()> {
        while self.still_interesting() {
            let Some(oid) = self.queue.pop_front() else {
                break;
            };
            self.add_parents(&oid)?;

            if !self.is_marked(&oid, RevFlags::UNINTERESTING) {
                self.output.push(oid);
            }
        }

        self.queue = std::mem::take(&mut self.output).into();
        Ok(())
    }

    fn still_interesting(&self) -> bool {
        let Some(newest_in) = self.queue.front() else {
            return false;
        };

        let date = |oid: &ObjectId| self.commits.get(oid).map(Commit::timestamp);
        if let Some(oldest_out) = self.output.last()
            && date(oldest_out) <= date(newest_in)
        {
            return true;
        }

        self.queue
            .iter()
            .any(|oid| !self.is_marked(oid, RevFlags::UNINTERESTING))
    }

    fn add_parents(&mut self, oid: &ObjectId) -> anyhow::Result<()> {
        if !self.mark(oid, RevFlags::ADDED) {
            return Ok(());
        }

        let parents = if self.is_marked(oid, RevFlags::UNINTERESTING) {
            let parents = self.load_commit(oid)?.parents().to_vec();
            for parent in &parents {
                self.load_commit(parent)?;
                self.mark(parent, RevFlags::UNINTERESTING);
                self.mark_parents_uninteresting(parent)?;
            }
            parents
        } else {
            self.simplify_commit(oid)?
        };

        for parent in &parents {
            self.enqueue_commit(parent)?;
        }

        Ok(())
    }

    /// The parents history continues through: all of them, or the first
    /// one whose tree matches on the filtered paths.
    fn simplify_commit(&mut self, oid: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
        let parents = self.load_commit(oid)?.parents().to_vec();
        if self.filter.is_none() {
            return Ok(parents);
        }

        let candidates = if parents.is_empty() {
            vec![None]
        } else {
            parents.iter().cloned().map(Some).collect()
        };

        for parent in candidates {
            if self.tree_diff(parent.as_ref(), oid)?.is_empty() {
                self.mark(oid, RevFlags::TREESAME);
                return Ok(parent.into_iter().collect());
            }
        }

        Ok(parents)
    }

    /// Changes between a commit and one of its parents, restricted to the
    /// filtered paths.
    pub fn tree_diff(
        &mut self,
        old: Option<&ObjectId>,
        new: &ObjectId,
    ) -> anyhow::Result<ChangeSet> {
        let key = (old.cloned(), new.clone());
        if let Some(diff) = self.diffs.get(&key) {
            return Ok(diff.clone());
        }

        let any = PathFilter::any();
        let filter = self.filter.as_ref().unwrap_or(&any);
        let diff = self.repository.database().tree_diff(old, Some(new), filter)?;
        self.diffs.insert(key, diff.clone());

        Ok(diff)
    }
}
