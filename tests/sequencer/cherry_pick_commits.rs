use crate::common::command::{
    AUTHOR_EMAIL, AUTHOR_NAME, bit_cherry_pick, bit_commit, bit_merge, commit_files,
    get_branch_commit_sha, get_commit_message, get_head_commit_sha, get_parent_commit_ids,
    init_repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

fn start_topic(dir: &Path) {
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
}

#[rstest]
fn pick_keeps_author_and_message(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    start_topic(dir);
    write_file(FileSpec::new(dir.join("topic.txt"), "topic".to_string()));
    run_bit_command(dir, &["add", "."]).assert().success();
    bit_commit(dir, "Topic adds a file\n\nWith some details.")
        .env("GIT_AUTHOR_NAME", "topic_author")
        .env("GIT_AUTHOR_EMAIL", "topic@example.com")
        .assert()
        .success();
    let picked = get_branch_commit_sha(dir, "topic")?;
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    let master = get_head_commit_sha(dir)?;

    let output = stdout_of(bit_cherry_pick(dir, &["topic"]));

    let head = get_head_commit_sha(dir)?;
    assert_ne!(head, picked);
    assert_eq!(output, format!("[master {}] Topic adds a file\n", &head[..7]));
    assert_eq!(get_parent_commit_ids(dir, &head), vec![master]);
    assert_eq!(
        get_commit_message(dir, &head),
        "Topic adds a file\n\nWith some details.\n"
    );

    let content = stdout_of(run_bit_command(dir, &["cat-file", "-p", &head]));
    assert!(content.contains("author topic_author <topic@example.com>"));
    assert!(content.contains(&format!("committer {AUTHOR_NAME} <{AUTHOR_EMAIL}>")));
    assert_eq!(read_file(&dir.join("topic.txt")), "topic");
    assert!(!dir.join(".git/sequencer").exists());

    Ok(())
}

#[rstest]
fn pick_applies_only_the_commit_changes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    start_topic(dir);
    commit_files(dir, &[("first.txt", "first")], "First on topic");
    commit_files(dir, &[("second.txt", "second")], "Second on topic");
    run_bit_command(dir, &["checkout", "master"]).assert().success();

    bit_cherry_pick(dir, &["topic"]).assert().success();

    assert_eq!(read_file(&dir.join("second.txt")), "second");
    assert!(!dir.join("first.txt").exists());
}

#[rstest]
fn range_is_replayed_oldest_first(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    start_topic(dir);
    commit_files(dir, &[("t1.txt", "1")], "T1");
    commit_files(dir, &[("t2.txt", "2")], "T2");
    commit_files(dir, &[("t3.txt", "3")], "T3");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("1.txt", "uno")], "Master work");

    bit_cherry_pick(dir, &["master..topic"]).assert().success();

    let log = stdout_of(run_bit_command(dir, &["log", "--oneline"]));
    let subjects = log
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject))
        .collect::<Vec<_>>();
    assert_eq!(
        subjects,
        vec!["T3", "T2", "T1", "Master work", "Initial commit"]
    );
    assert_eq!(read_file(&dir.join("t3.txt")), "3");
}

#[rstest]
fn several_revisions_are_picked_in_order(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    start_topic(dir);
    commit_files(dir, &[("t1.txt", "1")], "T1");
    commit_files(dir, &[("t2.txt", "2")], "T2");
    run_bit_command(dir, &["checkout", "master"]).assert().success();

    bit_cherry_pick(dir, &["topic", "topic^"]).assert().success();

    let log = stdout_of(run_bit_command(dir, &["log", "--oneline"]));
    let subjects = log
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject))
        .collect::<Vec<_>>();
    assert_eq!(subjects, vec!["T1", "T2", "Initial commit"]);
}

#[rstest]
fn merge_commits_are_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    start_topic(dir);
    commit_files(dir, &[("topic.txt", "topic")], "Topic work");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("master.txt", "master")], "Master work");
    bit_merge(dir, "topic", "Merge topic").assert().success();
    let merge = get_head_commit_sha(dir).expect("HEAD exists");
    run_bit_command(dir, &["checkout", "topic"]).assert().success();

    bit_cherry_pick(dir, &[&merge])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("is a merge but no -m option was given."));

    assert!(!dir.join(".git/sequencer").exists());
}
