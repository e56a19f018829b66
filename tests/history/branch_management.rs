use crate::common::command::{
    commit_files, get_branch_commit_sha, get_head_commit_sha, init_repository_dir,
    run_bit_command, stdout_of,
};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn create_branch_at_head(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();

    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();

    assert_eq!(get_branch_commit_sha(dir, "topic")?, get_head_commit_sha(dir)?);

    Ok(())
}

#[rstest]
fn create_branch_at_start_point(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = get_head_commit_sha(dir)?;
    commit_files(dir, &[("1.txt", "one\ntwo")], "Second");

    run_bit_command(dir, &["branch", "create", "old", "HEAD^"])
        .assert()
        .success();
    run_bit_command(dir, &["branch", "create", "nested/topic", &first[..7]])
        .assert()
        .success();

    assert_eq!(get_branch_commit_sha(dir, "old")?, first);
    assert_eq!(get_branch_commit_sha(dir, "nested/topic")?, first);

    Ok(())
}

#[rstest]
#[case(".hidden")]
#[case("double..dot")]
#[case("ends.lock")]
#[case("trailing/")]
#[case("with space")]
fn invalid_names_are_refused(init_repository_dir: TempDir, #[case] name: &str) {
    run_bit_command(init_repository_dir.path(), &["branch", "create", "--", name])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("is not a valid branch name"));
}

#[rstest]
fn duplicate_branch_is_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();

    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("A branch named 'topic' already exists."));
}

#[rstest]
fn unknown_start_point_is_refused(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["branch", "create", "topic", "nowhere"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("Not a valid object name: 'nowhere'."));
}

#[rstest]
fn list_marks_current_branch(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = get_head_commit_sha(dir)?;
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();

    let plain = stdout_of(run_bit_command(dir, &["branch", "list"]));
    let verbose = stdout_of(run_bit_command(dir, &["branch", "list", "-v"]));

    assert_eq!(plain, "* master\n  topic\n");
    assert_eq!(
        verbose,
        format!(
            "* master {short} Initial commit\n  topic  {short} Initial commit\n",
            short = &head[..7]
        )
    );

    Ok(())
}

#[rstest]
fn delete_merged_branch(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = get_head_commit_sha(dir)?;
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();

    run_bit_command(dir, &["branch", "delete", "topic"])
        .assert()
        .success()
        .stdout(format!("Deleted branch topic (was {}).\n", &head[..7]));

    assert!(!dir.join(".git/refs/heads/topic").exists());

    Ok(())
}

#[rstest]
fn delete_unmerged_branch_needs_force(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("1.txt", "one\ntwo")], "Topic work");
    run_bit_command(dir, &["checkout", "master"]).assert().success();

    run_bit_command(dir, &["branch", "delete", "topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("The branch 'topic' is not fully merged."));

    run_bit_command(dir, &["branch", "delete", "--force", "topic"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Deleted branch topic"));
}

#[rstest]
fn current_branch_cannot_be_deleted(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["branch", "delete", "master"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("Cannot delete branch 'master' checked out at"));
}

#[rstest]
fn deleting_nested_branch_prunes_empty_directories(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "feature/login"])
        .assert()
        .success();

    run_bit_command(dir, &["branch", "delete", "feature/login"])
        .assert()
        .success();

    assert!(!dir.join(".git/refs/heads/feature").exists());
    assert!(dir.join(".git/refs/heads").is_dir());
}
