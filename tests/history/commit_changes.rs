use crate::common::command::{
    AUTHOR_EMAIL, AUTHOR_NAME, bit_commit, get_head_commit_sha, get_parent_commit_ids,
    init_repository_dir, repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn first_commit_is_a_root_commit(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = repository_dir.path();
    run_bit_command(dir, &["init"]).assert().success();
    write_file(FileSpec::new(dir.join("1.txt"), "one".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();

    let output = stdout_of(bit_commit(dir, "Initial commit"));

    let head = get_head_commit_sha(dir)?;
    assert_eq!(output, format!("[master (root-commit) {}] Initial commit\n", &head[..7]));
    assert!(get_parent_commit_ids(dir, &head).is_empty());

    Ok(())
}

#[rstest]
fn next_commit_points_at_previous_head(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = get_head_commit_sha(dir)?;
    write_file(FileSpec::new(dir.join("1.txt"), "one again".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();

    let output = stdout_of(bit_commit(dir, "Second commit\n\nWith a body."));

    let second = get_head_commit_sha(dir)?;
    assert_eq!(output, format!("[master {}] Second commit\n", &second[..7]));
    assert_eq!(get_parent_commit_ids(dir, &second), vec![first]);

    Ok(())
}

#[rstest]
fn commit_records_author_from_environment(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = get_head_commit_sha(dir)?;

    let content = stdout_of(run_bit_command(dir, &["cat-file", "-p", &head]));

    assert!(content.contains(&format!(
        "author {AUTHOR_NAME} <{AUTHOR_EMAIL}> 1672574400 +0000\n"
    )));
    assert!(content.contains(&format!(
        "committer {AUTHOR_NAME} <{AUTHOR_EMAIL}> 1672574400 +0000\n"
    )));

    Ok(())
}

#[rstest]
fn committer_overrides_apply_separately(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one again".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();

    bit_commit(dir, "Committed by someone else")
        .env("GIT_COMMITTER_NAME", "other_user")
        .assert()
        .success();

    let head = get_head_commit_sha(dir)?;
    let content = stdout_of(run_bit_command(dir, &["cat-file", "-p", &head]));
    assert!(content.contains(&format!("author {AUTHOR_NAME} <{AUTHOR_EMAIL}>")));
    assert!(content.contains(&format!("committer other_user <{AUTHOR_EMAIL}>")));

    Ok(())
}

#[rstest]
fn empty_message_is_refused(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = get_head_commit_sha(dir)?;

    bit_commit(dir, "   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty commit message"));

    assert_eq!(get_head_commit_sha(dir)?, head);

    Ok(())
}

#[rstest]
fn missing_identity_is_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    run_bit_command(dir, &["commit", "-m", "anonymous"])
        .env_remove("GIT_AUTHOR_NAME")
        .env_remove("GIT_AUTHOR_EMAIL")
        .env_remove("GIT_COMMITTER_NAME")
        .env_remove("GIT_COMMITTER_EMAIL")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("GIT_AUTHOR_NAME"));
}
