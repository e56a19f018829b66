use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use anyhow::Context;
use std::fs;
use std::io::Write;

const DEFAULT_BRANCH: &str = "master";

impl Repository {
    /// Create the object store and refs layout, and point `HEAD` at the
    /// unborn default branch. Running it again leaves existing data alone.
    pub fn init(&mut self) -> anyhow::Result<()> {
        fs::create_dir_all(self.database().objects_path())
            .context("Failed to create .git/objects directory")?;

        fs::create_dir_all(self.refs().heads_path())
            .context("Failed to create .git/refs/heads directory")?;

        if !self.refs().head_path().exists() {
            let branch = BranchName::try_parse(DEFAULT_BRANCH)?;
            self.refs()
                .attach_head(&branch)
                .context("Failed to create initial HEAD reference")?;
        }

        let index_path = self.git_path().join("index");
        if !index_path.exists() {
            fs::write(&index_path, b"").context("Failed to create .git/index file")?;
        }

        writeln!(
            self.writer(),
            "Initialized empty Git repository in {}",
            self.git_path().display()
        )?;

        Ok(())
    }
}
