use crate::common::command::{init_repository_dir, run_bit_command, stdout_of};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn staged_new_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a").join("4.txt"), "four".to_string()));
    run_bit_command(dir, &["add", "a/4.txt"]).assert().success();

    let diff = stdout_of(run_bit_command(dir, &["diff", "--cached"]));

    assert_eq!(
        diff,
        "diff --git a/a/4.txt b/a/4.txt\n\
         new file mode 100644\n\
         index 0000000..ea1f343\n\
         --- /dev/null\n\
         +++ b/a/4.txt\n\
         @@ -0,0 +1,1 @@\n\
         +four\n"
    );
}

#[rstest]
fn staged_modification_with_staged_alias(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a").join("2.txt"), "changed two".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();

    let diff = stdout_of(run_bit_command(dir, &["diff", "--staged"]));

    assert_eq!(
        diff,
        "diff --git a/a/2.txt b/a/2.txt\n\
         index 64c5e58..2a59f29 100644\n\
         --- a/a/2.txt\n\
         +++ b/a/2.txt\n\
         @@ -1,1 +1,1 @@\n\
         -two\n\
         +changed two\n"
    );
}

#[rstest]
fn staged_removal(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["rm", "1.txt"]).assert().success();

    let diff = stdout_of(run_bit_command(dir, &["diff", "--cached"]));

    assert_eq!(
        diff,
        "diff --git a/1.txt b/1.txt\n\
         deleted file mode 100644\n\
         index 43dd47e..0000000\n\
         --- a/1.txt\n\
         +++ /dev/null\n\
         @@ -1,1 +0,0 @@\n\
         -one\n"
    );
}

#[rstest]
fn unstaged_changes_are_not_in_cached_diff(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one\nmore".to_string()));

    let diff = stdout_of(run_bit_command(dir, &["diff", "--cached"]));

    assert_eq!(diff, "");
}
