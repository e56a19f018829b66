use crate::common::command::{init_repository_dir, run_bit_command, stdout_of};
use crate::common::file::{FileSpec, delete_path, write_file};
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn nothing_to_show_on_clean_tree(init_repository_dir: TempDir) {
    let diff = stdout_of(run_bit_command(init_repository_dir.path(), &["diff"]));
    assert_eq!(diff, "");
}

#[rstest]
fn modified_file_shows_a_hunk(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one\nmore".to_string()));

    let diff = stdout_of(run_bit_command(dir, &["diff"]));

    assert_eq!(
        diff,
        "diff --git a/1.txt b/1.txt\n\
         index 43dd47e..1496875 100644\n\
         --- a/1.txt\n\
         +++ b/1.txt\n\
         @@ -1,1 +1,2 @@\n \
         one\n\
         +more\n"
    );
}

#[rstest]
fn deleted_file_diffs_against_dev_null(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("a").join("2.txt"));

    let diff = stdout_of(run_bit_command(dir, &["diff"]));

    assert_eq!(
        diff,
        "diff --git a/a/2.txt b/a/2.txt\n\
         deleted file mode 100644\n\
         index 64c5e58..0000000\n\
         --- a/a/2.txt\n\
         +++ /dev/null\n\
         @@ -1,1 +0,0 @@\n\
         -two\n"
    );
}

#[rstest]
fn untracked_files_are_not_diffed(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("new.txt"), "new".to_string()));

    let diff = stdout_of(run_bit_command(dir, &["diff"]));

    assert_eq!(diff, "");
}

#[cfg(unix)]
#[rstest]
fn mode_change_without_content_change(init_repository_dir: TempDir) {
    use crate::common::file::make_executable;

    let dir = init_repository_dir.path();
    make_executable(&dir.join("a").join("b").join("3.txt"));

    let diff = stdout_of(run_bit_command(dir, &["diff"]));

    assert_eq!(
        diff,
        "diff --git a/a/b/3.txt b/a/b/3.txt\n\
         old mode 100644\n\
         new mode 100755\n"
    );
}
