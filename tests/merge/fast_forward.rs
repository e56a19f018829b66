use crate::common::command::{
    bit_merge, commit_files, get_branch_commit_sha, get_head_commit_sha, init_repository_dir,
    run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// `topic` is one commit ahead of master.
fn topic_ahead(dir: &std::path::Path) {
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("1.txt", "one\ntopic"), ("new.txt", "new")], "Topic work");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
}

#[rstest]
fn fast_forward_moves_branch_and_workspace(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    topic_ahead(dir);
    let master = get_head_commit_sha(dir)?;
    let topic = get_branch_commit_sha(dir, "topic")?;

    let output = stdout_of(bit_merge(dir, "topic", "unused"));

    assert_eq!(
        output,
        format!("Updating {}..{}\nFast-forward\n", &master[..7], &topic[..7])
    );
    assert_eq!(get_branch_commit_sha(dir, "master")?, topic);
    assert_eq!(read_file(&dir.join("1.txt")), "one\ntopic");
    assert_eq!(read_file(&dir.join("new.txt")), "new");
    assert_eq!(
        std::fs::read_to_string(dir.join(".git/ORIG_HEAD"))?.trim(),
        master
    );
    assert_eq!(stdout_of(run_bit_command(dir, &["status", "--porcelain"])), "");

    Ok(())
}

#[rstest]
fn merging_an_ancestor_is_a_no_op(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "old"])
        .assert()
        .success();
    commit_files(dir, &[("1.txt", "uno")], "Second");
    let head = get_head_commit_sha(dir)?;

    bit_merge(dir, "old", "unused")
        .assert()
        .success()
        .stdout("Already up to date.\n");
    bit_merge(dir, "HEAD", "unused")
        .assert()
        .success()
        .stdout("Already up to date.\n");

    assert_eq!(get_head_commit_sha(dir)?, head);
    assert!(!dir.join(".git/ORIG_HEAD").exists());

    Ok(())
}

#[rstest]
fn local_changes_block_fast_forward(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    topic_ahead(dir);
    let master = get_head_commit_sha(dir)?;
    write_file(FileSpec::new(dir.join("1.txt"), "local edit".to_string()));

    bit_merge(dir, "topic", "unused")
        .assert()
        .code(128)
        .stderr(predicate::str::contains(
            "Your local changes to the following files would be overwritten by merge:\n\t1.txt",
        ));

    assert_eq!(get_head_commit_sha(dir)?, master);
    assert_eq!(read_file(&dir.join("1.txt")), "local edit");
    assert!(!dir.join("new.txt").exists());

    Ok(())
}

#[rstest]
fn unknown_revision_is_refused(init_repository_dir: TempDir) {
    bit_merge(init_repository_dir.path(), "nowhere", "unused")
        .assert()
        .code(128)
        .stderr(predicate::str::contains("Not a valid object name: 'nowhere'."));
}
