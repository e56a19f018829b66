use crate::areas::pending_commit::{MergeKind, PendingCommitError};
use crate::areas::refs::ORIG_HEAD;
use crate::areas::repository::Repository;
use crate::areas::sequencer::{PickCommand, Sequencer};
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::merge::MergeError;
use crate::artifacts::merge::inputs::Inputs;
use crate::artifacts::merge::resolve::Resolve;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::plumbing::write_commit::CommitIdentity;
use anyhow::Context;
use std::io::Write;
use tracing::debug;

const CONFLICT_HINTS: &str = "\
hint: after resolving the conflicts, mark the corrected paths
hint: with 'bit add <paths>' or 'bit rm <paths>'
hint: and commit the result with 'bit commit'";

impl Repository {
    /// Replay each commit named by `revisions` on top of `HEAD`.
    ///
    /// Arguments holding a range (`a..b`, `^a b`) are walked oldest first.
    /// A pick that conflicts stops the sequence; the remaining commits are
    /// kept for `--continue`.
    pub async fn cherry_pick(
        &mut self,
        revisions: &[String],
        identity: &CommitIdentity,
    ) -> anyhow::Result<()> {
        if let Some(kind) = self.pending_commit().merge_type() {
            return Err(PendingCommitError::Unconcluded(kind).into());
        }
        let head_oid = self
            .refs()
            .read_head()?
            .context("cannot cherry-pick onto an empty branch")?;

        let commits = self.select_picks(revisions)?;
        if let Some((oid, _)) = commits.iter().find(|(_, commit)| commit.is_merge()) {
            return Err(MergeError::MergeCommitPick(oid.to_string()).into());
        }

        let mut sequencer = Sequencer::new(self.git_path());
        sequencer.start(&head_oid)?;
        for (oid, commit) in commits {
            sequencer.pick(oid, &commit.short_message());
        }

        self.resume_sequencer(&mut sequencer, identity).await
    }

    /// Commit the pick the user resolved, then replay the rest.
    pub async fn cherry_pick_continue(&mut self, identity: &CommitIdentity) -> anyhow::Result<()> {
        let mut sequencer = Sequencer::new(self.git_path());
        sequencer.load()?;

        if self.pending_commit().merge_type() == Some(MergeKind::CherryPick) {
            let index = self.index();
            let mut index = index.lock().await;
            index.load()?;
            self.conclude_pending_commit(&index, MergeKind::CherryPick, None, identity)?;
        }

        // HEAD only stays put when the stopped pick never produced a commit;
        // that command is then replayed instead of dropped.
        let head_oid = self
            .refs()
            .read_head()?
            .context("HEAD is missing, cannot continue the cherry-pick")?;
        if head_oid != sequencer.abort_safety_oid()? {
            sequencer.drop_command(&head_oid)?;
        }

        self.resume_sequencer(&mut sequencer, identity).await
    }

    /// Throw away every pick of the sequence and return to where it started.
    pub async fn cherry_pick_abort(&mut self) -> anyhow::Result<()> {
        let mut sequencer = Sequencer::new(self.git_path());
        if !sequencer.in_progress() {
            return Err(MergeError::NoSequence("cherry-pick").into());
        }
        if self.pending_commit().merge_type() == Some(MergeKind::CherryPick) {
            self.pending_commit().clear(MergeKind::CherryPick)?;
        }

        let start_oid = sequencer.head_oid()?;

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        if let Err(err) = self.hard_reset(&mut index, &start_oid) {
            index.rollback()?;
            return Err(err);
        }
        index.write_updates()?;

        if let Some(head_oid) = self.refs().read_head()? {
            self.refs().update_ref(ORIG_HEAD, &head_oid)?;
        }
        self.refs().update_head(&start_oid)?;

        sequencer.quit()
    }

    fn select_picks(&self, revisions: &[String]) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        let is_range = revisions
            .iter()
            .any(|revision| revision.contains("..") || revision.starts_with('^'));

        if is_range {
            let mut commits = RevList::new(self, revisions, &[])?.collect_commits()?;
            commits.reverse();
            return Ok(commits);
        }

        let resolver = RevisionResolver::new(self);
        revisions
            .iter()
            .map(|revision| {
                let oid = resolver.resolve_commit(revision)?;
                let commit = self.database().load_commit(&oid)?;
                Ok((oid, commit))
            })
            .collect()
    }

    async fn resume_sequencer(
        &mut self,
        sequencer: &mut Sequencer,
        identity: &CommitIdentity,
    ) -> anyhow::Result<()> {
        while let Some(command) = sequencer.next_command().cloned() {
            let picked = match self.database().load_commit(&command.oid) {
                Ok(commit) => self
                    .pick_commit(&command, &commit, identity)
                    .await
                    .map(|new_head| (commit, new_head)),
                Err(err) => Err(err),
            };
            let (commit, new_head) = match picked {
                Ok(picked) => picked,
                Err(err) => {
                    sequencer.dump()?;
                    return Err(err);
                }
            };

            match new_head {
                Some(new_head) => sequencer.drop_command(&new_head)?,
                None => {
                    sequencer.dump()?;
                    self.pending_commit().start(
                        &command.oid,
                        MergeKind::CherryPick,
                        commit.message(),
                    )?;

                    let title = pick_title(&command);
                    eprintln!("error: could not apply {title}");
                    eprintln!("{CONFLICT_HINTS}");
                    return Err(MergeError::PickConflicted(title).into());
                }
            }
        }

        sequencer.quit()
    }

    /// Apply one commit and commit the result. `None` when it conflicted.
    async fn pick_commit(
        &mut self,
        command: &PickCommand,
        commit: &Commit,
        identity: &CommitIdentity,
    ) -> anyhow::Result<Option<ObjectId>> {
        let head_oid = self
            .refs()
            .read_head()?
            .context("cannot cherry-pick onto an empty branch")?;
        let inputs = Inputs::for_pick(
            head_oid.clone(),
            pick_title(command),
            command.oid.clone(),
            commit.parent().cloned(),
        );

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let clean = {
            let mut resolve = Resolve::new(self, &mut index, &inputs);
            let resolved = resolve.execute();
            for line in resolve.messages() {
                writeln!(self.writer(), "{line}")?;
            }
            resolved.map(|_| resolve.is_clean())
        };
        let clean = match clean {
            Ok(clean) => clean,
            Err(err) => {
                index.rollback()?;
                return Err(err);
            }
        };
        index.write_updates()?;

        if !clean {
            debug!(oid = %command.oid, "pick stopped on conflicts");
            return Ok(None);
        }

        let tree_oid = self.write_tree(&index)?;
        let (oid, new_commit) = self.write_commit(
            vec![head_oid],
            tree_oid,
            commit.author().clone(),
            identity.committer().clone(),
            commit.message(),
        )?;
        self.print_commit_summary(&oid, &new_commit)?;

        Ok(Some(oid))
    }
}

fn pick_title(command: &PickCommand) -> String {
    format!("{}... {}", command.oid.to_short_oid(), command.subject)
}
