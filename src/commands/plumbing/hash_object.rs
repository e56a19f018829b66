use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Object;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Print the blob id of a workspace file, storing it when `write` is set.
    pub fn hash_object(&mut self, object_path: &Path, write: bool) -> anyhow::Result<()> {
        let blob = self.workspace().parse_blob(object_path)?;

        let object_id = if write {
            self.database().store(&blob)?
        } else {
            blob.object_id()?
        };

        write!(self.writer(), "{object_id}")?;

        Ok(())
    }
}
