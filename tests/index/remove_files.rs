use crate::common::command::{init_repository_dir, run_bit_command, stdout_of};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn remove_committed_file_from_index_and_workspace(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    run_bit_command(dir, &["rm", "1.txt"])
        .assert()
        .success()
        .stdout("rm '1.txt'\n");

    assert!(!dir.join("1.txt").exists());
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "D  1.txt\n"
    );
}

#[rstest]
fn remove_cached_keeps_the_workspace_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    run_bit_command(dir, &["rm", "--cached", "1.txt"])
        .assert()
        .success();

    assert!(dir.join("1.txt").is_file());
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "D  1.txt\n?? 1.txt\n"
    );
}

#[rstest]
fn removing_a_locally_modified_file_is_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, edited".to_string()));

    run_bit_command(dir, &["rm", "1.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "error: the following file has local modifications:\n    1.txt",
        ));

    assert!(dir.join("1.txt").is_file());
    assert!(!dir.join(".git").join("index.lock").exists());
}

#[rstest]
fn removing_a_staged_file_is_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, staged".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();

    run_bit_command(dir, &["rm", "1.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "error: the following file has changes staged in the index:\n    1.txt",
        ));

    run_bit_command(dir, &["rm", "--cached", "1.txt"])
        .assert()
        .success();
}

#[rstest]
fn force_removes_modified_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, edited".to_string()));

    run_bit_command(dir, &["rm", "-f", "1.txt"])
        .assert()
        .success();

    assert!(!dir.join("1.txt").exists());
}

#[rstest]
fn removing_a_directory_needs_recursion(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    run_bit_command(dir, &["rm", "a"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains(
            "not removing 'a' recursively without -r",
        ));

    run_bit_command(dir, &["rm", "-r", "a"])
        .assert()
        .success()
        .stdout("rm 'a/2.txt'\nrm 'a/b/3.txt'\n");

    assert!(!dir.join("a").join("2.txt").exists());
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "D  a/2.txt\nD  a/b/3.txt\n"
    );
}

#[rstest]
fn removing_an_untracked_path_fails(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("loose.txt"), "loose".to_string()));

    run_bit_command(dir, &["rm", "loose.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not match any files"));

    assert!(dir.join("loose.txt").is_file());
}
