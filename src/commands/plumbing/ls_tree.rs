use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// List a tree, or the tree of a commit. Subtrees are listed as entries
    /// unless `recursive` is set, in which case only blobs are printed.
    pub fn ls_tree(&mut self, revision: &str, recursive: bool) -> anyhow::Result<()> {
        let oid = RevisionResolver::new(self).resolve_object(revision)?;
        self.print_tree(&oid, Path::new(""), recursive)
    }

    fn print_tree(&self, oid: &ObjectId, prefix: &Path, recursive: bool) -> anyhow::Result<()> {
        let tree = self.database().load_tree_of(oid)?;

        for (name, entry) in tree.entries() {
            let path = prefix.join(name);

            if entry.is_tree() && recursive {
                self.print_tree(&entry.oid, &path, recursive)?;
                continue;
            }

            writeln!(
                self.writer(),
                "{} {} {}",
                entry.mode,
                entry.oid,
                path.display()
            )?;
        }

        Ok(())
    }
}
