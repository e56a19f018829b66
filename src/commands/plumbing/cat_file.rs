use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::RevisionResolver;
use std::io::Write;

impl Repository {
    /// Pretty-print any object named by a revision or an id prefix.
    pub fn cat_file(&mut self, revision: &str) -> anyhow::Result<()> {
        let oid = RevisionResolver::new(self).resolve_object(revision)?;
        let object = self.database().load(&oid)?;

        write!(self.writer(), "{}", object.display())?;

        Ok(())
    }

    /// Print the type of the object named by `revision`.
    pub fn cat_file_type(&mut self, revision: &str) -> anyhow::Result<()> {
        let oid = RevisionResolver::new(self).resolve_object(revision)?;
        let object_type = self.database().object_type(&oid)?;

        writeln!(self.writer(), "{object_type}")?;

        Ok(())
    }
}
