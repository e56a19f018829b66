use crate::common::command::{
    bit_commit, init_repository_dir, repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, delete_path, make_executable, write_file};
use assert_fs::TempDir;
use filetime::FileTime;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

fn porcelain_status(dir: &Path) -> String {
    stdout_of(run_bit_command(dir, &["status", "--porcelain"]))
}

#[rstest]
fn list_untracked_files_in_name_order(repository_dir: TempDir) {
    let dir = repository_dir.path();
    run_bit_command(dir, &["init"]).assert().success();
    write_file(FileSpec::new(dir.join("file.txt"), "file".to_string()));
    write_file(FileSpec::new(dir.join("another.txt"), "another".to_string()));

    assert_eq!(porcelain_status(dir), "?? another.txt\n?? file.txt\n");
}

#[rstest]
fn list_untracked_directories_not_their_contents(repository_dir: TempDir) {
    let dir = repository_dir.path();
    run_bit_command(dir, &["init"]).assert().success();
    write_file(FileSpec::new(dir.join("file.txt"), "file".to_string()));
    write_file(FileSpec::new(
        dir.join("dir").join("nested").join("another.txt"),
        "another".to_string(),
    ));
    std::fs::create_dir_all(dir.join("empty")).unwrap();

    assert_eq!(porcelain_status(dir), "?? dir/\n?? file.txt\n");
}

#[rstest]
fn list_untracked_files_inside_tracked_directories(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a").join("4.txt"), "four".to_string()));
    write_file(FileSpec::new(
        dir.join("a").join("b").join("c").join("5.txt"),
        "five".to_string(),
    ));

    assert_eq!(porcelain_status(dir), "?? a/4.txt\n?? a/b/c/\n");
}

#[rstest]
fn print_nothing_when_no_files_are_changed(init_repository_dir: TempDir) {
    assert_eq!(porcelain_status(init_repository_dir.path()), "");
}

#[rstest]
fn print_nothing_if_a_file_is_touched(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 60, 0);
    filetime::set_file_mtime(dir.join("1.txt"), later).unwrap();

    assert_eq!(porcelain_status(dir), "");
    assert_eq!(porcelain_status(dir), "");
}

#[rstest]
fn report_files_with_modified_contents(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "modified one".to_string()));
    write_file(FileSpec::new(
        dir.join("a").join("2.txt"),
        "modified two".to_string(),
    ));

    assert_eq!(porcelain_status(dir), " M 1.txt\n M a/2.txt\n");
}

#[rstest]
fn report_modified_files_with_unchanged_size(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(
        dir.join("a").join("b").join("3.txt"),
        "hello".to_string(),
    ));
    let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 60, 0);
    filetime::set_file_mtime(dir.join("a").join("b").join("3.txt"), later).unwrap();

    assert_eq!(porcelain_status(dir), " M a/b/3.txt\n");
}

#[cfg(unix)]
#[rstest]
fn report_modified_modes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    make_executable(&dir.join("a").join("2.txt"));

    assert_eq!(porcelain_status(dir), " M a/2.txt\n");
}

#[rstest]
fn report_deleted_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("a"));

    assert_eq!(porcelain_status(dir), " D a/2.txt\n D a/b/3.txt\n");
}

#[rstest]
fn report_files_added_to_the_index(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a").join("4.txt"), "four".to_string()));
    write_file(FileSpec::new(dir.join("d").join("e").join("5.txt"), "five".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();

    assert_eq!(porcelain_status(dir), "A  a/4.txt\nA  d/e/5.txt\n");
}

#[rstest]
fn report_staged_and_unstaged_changes_of_one_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "staged one".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    write_file(FileSpec::new(dir.join("1.txt"), "unstaged edit of one".to_string()));

    assert_eq!(porcelain_status(dir), "MM 1.txt\n");
}

#[rstest]
fn report_deleted_files_from_last_commit(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("a").join("2.txt"));
    delete_path(&dir.join(".git").join("index"));
    run_bit_command(dir, &["add", "."]).assert().success();

    assert_eq!(porcelain_status(dir), "D  a/2.txt\n");
}

#[rstest]
fn committing_clears_the_status(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "modified one".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();
    bit_commit(dir, "Second commit").assert().success();

    assert_eq!(porcelain_status(dir), "");
}
