//! Best common ancestors of two commits
//!
//! ## Phase 1: common ancestors
//!
//! Both tips are pushed on a queue ordered by commit date, newest first. The
//! source is tagged `VISITED_FROM_SOURCE`, the target(s) `VISITED_FROM_TARGET`,
//! and every popped commit hands its tags down to its parents. A commit that
//! carries both tags is a common ancestor; its parents are additionally tagged
//! `STALE`, since anything below a common ancestor cannot be a best one. The
//! walk stops as soon as every queued commit is stale.
//!
//! ## Phase 2: best common ancestors
//!
//! > A best common ancestor of X and Y is a common ancestor of X and Y that
//! > is not an ancestor of any other common ancestor.
//!
//! With more than one candidate, each one is walked against the others. A
//! candidate reached from the other side is redundant, and so is every other
//! candidate reached from its side. Criss-cross histories keep several
//! candidates after this filter; all of them are returned.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use chrono::{DateTime, FixedOffset};
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{debug, trace};

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct VisitState: u8 {
        const VISITED_FROM_SOURCE = 0b0001;
        const VISITED_FROM_TARGET = 0b0010;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
        const STALE = 0b0100;
        const RESULT = 0b1000;
    }
}

/// One walk of phase 1.
pub struct CommonAncestors<'l, L> {
    commit_loader: &'l L,
    commits: HashMap<ObjectId, SlimCommit>,
    states: HashMap<ObjectId, VisitState>,
    queue: BinaryHeap<(DateTime<FixedOffset>, ObjectId)>,
    results: Vec<ObjectId>,
}

impl<'l, L> CommonAncestors<'l, L>
where
    L: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(
        commit_loader: &'l L,
        source: &ObjectId,
        targets: &[ObjectId],
    ) -> anyhow::Result<Self> {
        let mut walk = CommonAncestors {
            commit_loader,
            commits: HashMap::new(),
            states: HashMap::new(),
            queue: BinaryHeap::new(),
            results: Vec::new(),
        };

        walk.mark(source, VisitState::VISITED_FROM_SOURCE)?;
        for target in targets {
            walk.mark(target, VisitState::VISITED_FROM_TARGET)?;
        }

        Ok(walk)
    }

    /// Run the walk; returns the non-stale common ancestors, newest first.
    pub fn find(&mut self) -> anyhow::Result<Vec<ObjectId>> {
        while !self.all_stale() {
            self.process_queue()?;
        }

        Ok(self
            .results
            .iter()
            .filter(|oid| !self.is_marked(oid, VisitState::STALE))
            .cloned()
            .collect())
    }

    pub fn is_marked(&self, oid: &ObjectId, state: VisitState) -> bool {
        self.states
            .get(oid)
            .is_some_and(|current| current.contains(state))
    }

    fn process_queue(&mut self) -> anyhow::Result<()> {
        let Some((_, oid)) = self.queue.pop() else {
            return Ok(());
        };
        let state = self.states.get(&oid).copied().unwrap_or_default();
        if state.contains(VisitState::RESULT) {
            return Ok(());
        }
        trace!(%oid, ?state, "processing commit");

        if state == VisitState::VISITED_FROM_BOTH {
            self.states.insert(oid.clone(), state | VisitState::RESULT);
            self.results.push(oid.clone());
            self.add_parents(&oid, state | VisitState::STALE)
        } else {
            self.add_parents(&oid, state)
        }
    }

    fn add_parents(&mut self, oid: &ObjectId, state: VisitState) -> anyhow::Result<()> {
        let parents = self
            .commits
            .get(oid)
            .map(|commit| commit.parents.clone())
            .unwrap_or_default();

        for parent in parents {
            if self.is_marked(&parent, state) {
                continue;
            }
            self.mark(&parent, state)?;
        }

        Ok(())
    }

    fn mark(&mut self, oid: &ObjectId, state: VisitState) -> anyhow::Result<()> {
        if !self.commits.contains_key(oid) {
            let commit = (self.commit_loader)(oid)?;
            self.commits.insert(oid.clone(), commit);
        }
        let timestamp = self.commits[oid].timestamp;

        *self.states.entry(oid.clone()).or_default() |= state;
        self.queue.push((timestamp, oid.clone()));

        Ok(())
    }

    fn all_stale(&self) -> bool {
        self.queue
            .iter()
            .all(|(_, oid)| self.is_marked(oid, VisitState::STALE))
    }
}

pub struct BCAFinder<L> {
    commit_loader: L,
}

impl<L> BCAFinder<L>
where
    L: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(commit_loader: L) -> Self {
        BCAFinder { commit_loader }
    }

    /// All best common ancestors of `source` and `target`; empty when the
    /// histories are unrelated.
    pub fn find_best_common_ancestors(
        &self,
        source: &ObjectId,
        target: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        let candidates =
            CommonAncestors::new(&self.commit_loader, source, std::slice::from_ref(target))?
                .find()?;
        debug!(%source, %target, count = candidates.len(), "common ancestors");

        if candidates.len() <= 1 {
            return Ok(candidates);
        }

        let mut redundant = HashSet::new();
        for candidate in &candidates {
            self.filter_candidate(candidate, &candidates, &mut redundant)?;
        }

        let bases = candidates
            .into_iter()
            .filter(|candidate| !redundant.contains(candidate))
            .collect::<Vec<_>>();
        debug!(%source, %target, ?bases, "best common ancestors");

        Ok(bases)
    }

    fn filter_candidate(
        &self,
        candidate: &ObjectId,
        candidates: &[ObjectId],
        redundant: &mut HashSet<ObjectId>,
    ) -> anyhow::Result<()> {
        if redundant.contains(candidate) {
            return Ok(());
        }

        let others = candidates
            .iter()
            .filter(|other| *other != candidate && !redundant.contains(*other))
            .cloned()
            .collect::<Vec<_>>();
        if others.is_empty() {
            return Ok(());
        }

        let mut walk = CommonAncestors::new(&self.commit_loader, candidate, &others)?;
        walk.find()?;

        if walk.is_marked(candidate, VisitState::VISITED_FROM_TARGET) {
            trace!(%candidate, "reachable from another candidate");
            redundant.insert(candidate.clone());
        }
        for other in others {
            if walk.is_marked(&other, VisitState::VISITED_FROM_SOURCE) {
                trace!(%other, via = %candidate, "reachable from candidate");
                redundant.insert(other);
            }
        }

        Ok(())
    }
}
