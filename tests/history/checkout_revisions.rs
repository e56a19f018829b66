use crate::common::command::{
    commit_files, get_head_commit_sha, init_repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// `topic` stays at the initial commit while master moves on.
fn diverge_master(dir: &std::path::Path) {
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    commit_files(
        dir,
        &[("1.txt", "uno"), ("a/b/4.txt", "four"), ("c/5.txt", "five")],
        "Master work",
    );
}

#[rstest]
fn switch_branch_rewrites_workspace(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    diverge_master(dir);

    run_bit_command(dir, &["checkout", "topic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to branch 'topic'"));

    assert_eq!(read_file(&dir.join("1.txt")), "one");
    assert!(!dir.join("a/b/4.txt").exists());
    assert!(!dir.join("c").exists());
    assert_eq!(
        std::fs::read_to_string(dir.join(".git/HEAD"))?,
        "ref: refs/heads/topic\n"
    );
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        ""
    );

    run_bit_command(dir, &["checkout", "master"]).assert().success();
    assert_eq!(read_file(&dir.join("1.txt")), "uno");
    assert_eq!(read_file(&dir.join("c/5.txt")), "five");

    Ok(())
}

#[rstest]
fn checkout_current_branch_reports_already_on(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["checkout", "master"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already on 'master'"));
}

#[rstest]
fn checkout_commit_detaches_head(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = get_head_commit_sha(dir)?;
    commit_files(dir, &[("1.txt", "uno")], "Second");

    run_bit_command(dir, &["checkout", "HEAD^"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Note: checking out 'HEAD^'."))
        .stdout(predicate::str::contains(format!(
            "HEAD is now at {} Initial commit",
            &first[..7]
        )));

    assert_eq!(
        std::fs::read_to_string(dir.join(".git/HEAD"))?.trim(),
        first
    );
    assert_eq!(read_file(&dir.join("1.txt")), "one");

    let status = stdout_of(run_bit_command(dir, &["status"]));
    assert!(status.starts_with("Not currently on any branch.\n"));

    Ok(())
}

#[rstest]
fn local_changes_block_checkout(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    diverge_master(dir);
    let head = get_head_commit_sha(dir)?;
    write_file(FileSpec::new(dir.join("1.txt"), "local edit".to_string()));

    run_bit_command(dir, &["checkout", "topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains(
            "error: Your local changes to the following files would be overwritten by checkout:\n\
             \t1.txt\n\
             Please commit your changes or stash them before you switch branches.\n\
             Aborting",
        ));

    assert_eq!(get_head_commit_sha(dir)?, head);
    assert_eq!(read_file(&dir.join("1.txt")), "local edit");
    assert!(dir.join("c/5.txt").exists());

    Ok(())
}

#[rstest]
fn untracked_file_in_the_way_blocks_checkout(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("new.txt", "tracked on topic")], "Topic adds new.txt");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    write_file(FileSpec::new(dir.join("new.txt"), "untracked".to_string()));

    run_bit_command(dir, &["checkout", "topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains(
            "The following untracked working tree files would be overwritten by checkout:\n\tnew.txt",
        ));

    assert_eq!(read_file(&dir.join("new.txt")), "untracked");
}

#[rstest]
fn unrelated_local_changes_survive_checkout(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    diverge_master(dir);
    write_file(FileSpec::new(dir.join("a/2.txt"), "two edited".to_string()));

    run_bit_command(dir, &["checkout", "topic"]).assert().success();

    assert_eq!(read_file(&dir.join("a/2.txt")), "two edited");
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        " M a/2.txt\n"
    );
}

#[rstest]
fn unknown_target_is_refused(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["checkout", "nowhere"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("Not a valid object name: 'nowhere'."));
}
