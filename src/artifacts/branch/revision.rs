use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES, RefError};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::cell::RefCell;
use tracing::trace;

/// Shortest hex string tried as an abbreviated object id.
const MIN_PREFIX_LENGTH: usize = 4;

/// A parsed revision expression.
///
/// Suffixes bind to everything on their left, so `@~2^` is the parent of
/// the second ancestor of `HEAD`:
///
/// ```text
/// expr := ref | expr "^" | expr "~" <uint>
/// ref  := "@" | "HEAD" | <branch name> | <object id or prefix>
/// ```
///
/// A `Ref` is looked up as a ref first; only when no ref of that name
/// exists is it tried as an object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Ref(BranchName),
    /// The nth first-parent ancestor (`HEAD~3`)
    Ancestor(Box<Revision>, usize),
    /// The first parent (`HEAD^`)
    Parent(Box<Revision>),
}

impl Revision {
    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        if let Some(caps) = PARENT_REGEX.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ANCESTOR_REGEX.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            let branch_name = BranchName::try_parse(resolved_name)
                .map_err(|_| RefError::invalid_object(not_valid_name(revision)))?;

            Ok(Revision::Ref(branch_name))
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Ref(name) => write!(f, "{name}"),
            Revision::Parent(base) => write!(f, "{base}^"),
            Revision::Ancestor(base, generations) => write!(f, "{base}~{generations}"),
        }
    }
}

fn not_valid_name(expression: &str) -> String {
    format!("Not a valid object name: '{expression}'.")
}

/// Resolves revision expressions against one repository, remembering the
/// candidates of ambiguous prefixes so the final error can list them.
pub struct RevisionResolver<'r> {
    repository: &'r Repository,
    hints: RefCell<Vec<String>>,
}

impl<'r> RevisionResolver<'r> {
    pub fn new(repository: &'r Repository) -> Self {
        RevisionResolver {
            repository,
            hints: RefCell::new(Vec::new()),
        }
    }

    /// Resolve `expression` to a commit id.
    pub fn resolve_commit(&self, expression: &str) -> anyhow::Result<ObjectId> {
        self.resolve_as(expression, ObjectType::Commit)
    }

    /// Resolve `expression` to an object of `expected` kind.
    pub fn resolve_as(&self, expression: &str, expected: ObjectType) -> anyhow::Result<ObjectId> {
        let oid = self.resolve_object(expression)?;
        self.check_type(&oid, expected)?;
        trace!(%expression, %oid, "resolved revision");

        Ok(oid)
    }

    /// Resolve `expression` to an object of any kind.
    pub fn resolve_object(&self, expression: &str) -> anyhow::Result<ObjectId> {
        let revision = Revision::try_parse(expression)?;

        self.resolve(&revision)?.ok_or_else(|| {
            RefError::InvalidObject {
                message: not_valid_name(expression),
                hints: self.hints.take(),
            }
            .into()
        })
    }

    /// Walk the expression; `None` when a ref is missing or a parent step
    /// runs off a root commit.
    pub fn resolve(&self, revision: &Revision) -> anyhow::Result<Option<ObjectId>> {
        match revision {
            Revision::Ref(name) => self.read_ref(name.as_ref()),
            Revision::Parent(base) => match self.resolve(base)? {
                Some(oid) => self.commit_parent(&oid),
                None => Ok(None),
            },
            Revision::Ancestor(base, generations) => {
                let mut oid = self.resolve(base)?;
                for _ in 0..*generations {
                    oid = match oid {
                        Some(oid) => self.commit_parent(&oid)?,
                        None => break,
                    };
                }

                Ok(oid)
            }
        }
    }

    fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        if let Some(oid) = self.repository.refs().read_ref(name)? {
            return Ok(Some(oid));
        }
        if !ObjectId::is_hex_prefix(name, MIN_PREFIX_LENGTH) {
            return Ok(None);
        }

        let mut candidates = self.repository.database().prefix_match(name)?;
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => {
                self.record_ambiguity(name, &candidates)?;
                Ok(None)
            }
        }
    }

    fn record_ambiguity(&self, prefix: &str, candidates: &[ObjectId]) -> anyhow::Result<()> {
        let mut hints = self.hints.borrow_mut();
        let database = self.repository.database();

        for oid in candidates {
            hints.push(format!(
                "{} {}",
                database.short_oid(oid)?,
                database.object_type(oid)?
            ));
        }
        trace!(%prefix, candidates = candidates.len(), "ambiguous object prefix");

        Ok(())
    }

    fn commit_parent(&self, oid: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        self.check_type(oid, ObjectType::Commit)?;
        let commit = self.repository.database().load_commit(oid)?;

        Ok(commit.parent().cloned())
    }

    fn check_type(&self, oid: &ObjectId, expected: ObjectType) -> anyhow::Result<()> {
        let actual = self.repository.database().object_type(oid)?;

        if actual != expected {
            return Err(RefError::invalid_object(format!(
                "object {} is a {actual}, not a {expected}",
                self.repository.database().short_oid(oid)?
            ))
            .into());
        }

        Ok(())
    }
}
