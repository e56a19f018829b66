use colored::Colorize;

const LABEL_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkspaceChangeType {
    #[default]
    None,
    Untracked,
    Modified,
    Deleted,
}

impl WorkspaceChangeType {
    pub fn short_code(&self) -> &'static str {
        match self {
            WorkspaceChangeType::None => " ",
            WorkspaceChangeType::Untracked => "??",
            WorkspaceChangeType::Modified => "M",
            WorkspaceChangeType::Deleted => "D",
        }
    }

    pub fn long_label(&self) -> &'static str {
        match self {
            WorkspaceChangeType::Modified => "modified:",
            WorkspaceChangeType::Deleted => "deleted:",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexChangeType {
    #[default]
    None,
    Added,
    Modified,
    Deleted,
}

impl IndexChangeType {
    pub fn short_code(&self) -> &'static str {
        match self {
            IndexChangeType::None => " ",
            IndexChangeType::Added => "A",
            IndexChangeType::Modified => "M",
            IndexChangeType::Deleted => "D",
        }
    }

    pub fn long_label(&self) -> &'static str {
        match self {
            IndexChangeType::Added => "new file:",
            IndexChangeType::Modified => "modified:",
            IndexChangeType::Deleted => "deleted:",
            IndexChangeType::None => "",
        }
    }
}

/// How a conflicted path is unmerged, named after the stages present:
/// `U` for a side that changed the path, `A` for one that added it and `D`
/// for one that deleted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConflictKind {
    BothDeleted,
    AddedByUs,
    DeletedByThem,
    AddedByThem,
    DeletedByUs,
    BothAdded,
    BothModified,
}

impl ConflictKind {
    /// Classify by which of stages 1, 2 and 3 are present.
    pub fn from_stages(base: bool, ours: bool, theirs: bool) -> Option<Self> {
        match (base, ours, theirs) {
            (true, false, false) => Some(ConflictKind::BothDeleted),
            (false, true, false) => Some(ConflictKind::AddedByUs),
            (true, true, false) => Some(ConflictKind::DeletedByThem),
            (false, false, true) => Some(ConflictKind::AddedByThem),
            (true, false, true) => Some(ConflictKind::DeletedByUs),
            (false, true, true) => Some(ConflictKind::BothAdded),
            (true, true, true) => Some(ConflictKind::BothModified),
            (false, false, false) => None,
        }
    }

    pub fn short_code(&self) -> &'static str {
        match self {
            ConflictKind::BothDeleted => "DD",
            ConflictKind::AddedByUs => "AU",
            ConflictKind::DeletedByThem => "UD",
            ConflictKind::AddedByThem => "UA",
            ConflictKind::DeletedByUs => "DU",
            ConflictKind::BothAdded => "AA",
            ConflictKind::BothModified => "UU",
        }
    }

    pub fn long_label(&self) -> &'static str {
        match self {
            ConflictKind::BothDeleted => "both deleted:",
            ConflictKind::AddedByUs => "added by us:",
            ConflictKind::DeletedByThem => "deleted by them:",
            ConflictKind::AddedByThem => "added by them:",
            ConflictKind::DeletedByUs => "deleted by us:",
            ConflictKind::BothAdded => "both added:",
            ConflictKind::BothModified => "both modified:",
        }
    }
}

/// Where a change sits in the long status format, which picks its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeType {
    Workspace(WorkspaceChangeType),
    Index(IndexChangeType),
    Conflict(ConflictKind),
}

impl std::fmt::Display for FileChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileChangeType::Workspace(change) => format!("{:<12}", change.long_label()).red(),
            FileChangeType::Index(change) => format!("{:<12}", change.long_label()).green(),
            FileChangeType::Conflict(kind) => format!("{:<17}", kind.long_label()).red(),
        };
        write!(f, "{:>width$}{}", "", label, width = LABEL_WIDTH)
    }
}

/// Both halves of a tracked path's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileChange {
    pub index_change: IndexChangeType,
    pub workspace_change: WorkspaceChangeType,
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            self.index_change.short_code(),
            self.workspace_change.short_code()
        )
    }
}
