use crate::common::command::{
    bit_cherry_pick, commit_files, get_branch_commit_sha, get_commit_message,
    get_head_commit_sha, get_parent_commit_ids, init_repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

/// topic: T1 adds `t1.txt`, T2 rewrites `1.txt`, T3 adds `t3.txt`.
/// master rewrites `1.txt` too, so T2 conflicts. Returns T2's id.
fn conflicting_topic(dir: &Path) -> String {
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("t1.txt", "1")], "T1");
    commit_files(dir, &[("1.txt", "eins")], "T2");
    let t2 = get_branch_commit_sha(dir, "topic").expect("topic exists");
    commit_files(dir, &[("t3.txt", "3")], "T3");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("1.txt", "uno")], "Master work");

    t2
}

fn subjects(dir: &Path) -> Vec<String> {
    stdout_of(run_bit_command(dir, &["log", "--oneline"]))
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject.to_string()))
        .collect()
}

#[rstest]
fn conflict_stops_the_sequence(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let t2 = conflicting_topic(dir);

    bit_cherry_pick(dir, &["master..topic"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "error: could not apply {}... T2",
            &t2[..7]
        )))
        .stderr(predicate::str::contains("hint: and commit the result with 'bit commit'"));

    assert_eq!(subjects(dir), vec!["T1", "Master work", "Initial commit"]);
    assert!(dir.join(".git/sequencer").is_dir());
    assert_eq!(read_file(&dir.join(".git/CHERRY_PICK_HEAD")).trim(), t2);
    assert_eq!(
        read_file(&dir.join("1.txt")),
        format!("<<<<<<< HEAD\nuno\n=======\neins\n>>>>>>> {}... T2\n", &t2[..7])
    );
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "UU 1.txt\n"
    );

    let status = stdout_of(run_bit_command(dir, &["status"]));
    assert!(status.contains(&format!(
        "You are currently cherry-picking commit {}.",
        &t2[..7]
    )));
}

#[rstest]
fn continue_commits_the_resolution_and_picks_the_rest(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_topic(dir);
    bit_cherry_pick(dir, &["master..topic"]).assert().code(1);
    let t1_pick = get_head_commit_sha(dir).expect("HEAD exists");

    write_file(FileSpec::new(dir.join("1.txt"), "uno, eins".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    bit_cherry_pick(dir, &["--continue"]).assert().success();

    assert_eq!(
        subjects(dir),
        vec!["T3", "T2", "T1", "Master work", "Initial commit"]
    );
    let head = get_head_commit_sha(dir).expect("HEAD exists");
    let t2_pick = get_parent_commit_ids(dir, &head).remove(0);
    assert_eq!(get_parent_commit_ids(dir, &t2_pick), vec![t1_pick]);
    assert_eq!(get_commit_message(dir, &t2_pick), "T2\n");
    assert_eq!(read_file(&dir.join("1.txt")), "uno, eins");
    assert_eq!(read_file(&dir.join("t3.txt")), "3");
    assert!(!dir.join(".git/sequencer").exists());
    assert!(!dir.join(".git/CHERRY_PICK_HEAD").exists());
}

#[rstest]
fn commit_then_continue_skips_the_concluded_pick(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_topic(dir);
    bit_cherry_pick(dir, &["master..topic"]).assert().code(1);

    write_file(FileSpec::new(dir.join("1.txt"), "resolved".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    crate::common::command::run_bit_command_as_author(dir, &["commit"])
        .assert()
        .success();
    bit_cherry_pick(dir, &["--continue"]).assert().success();

    assert_eq!(
        subjects(dir),
        vec!["T3", "T2", "T1", "Master work", "Initial commit"]
    );
}

#[rstest]
fn continue_refuses_unmerged_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_topic(dir);
    bit_cherry_pick(dir, &["master..topic"]).assert().code(1);

    bit_cherry_pick(dir, &["--continue"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("you have unmerged files"));

    assert!(dir.join(".git/sequencer").is_dir());
}

#[rstest]
fn abort_returns_to_the_starting_commit(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_topic(dir);
    let master = get_head_commit_sha(dir).expect("HEAD exists");
    bit_cherry_pick(dir, &["master..topic"]).assert().code(1);

    bit_cherry_pick(dir, &["--abort"]).assert().success();

    assert_eq!(get_head_commit_sha(dir).expect("HEAD exists"), master);
    assert_eq!(read_file(&dir.join("1.txt")), "uno");
    assert!(!dir.join("t1.txt").exists());
    assert!(!dir.join(".git/sequencer").exists());
    assert!(!dir.join(".git/CHERRY_PICK_HEAD").exists());
    assert_eq!(stdout_of(run_bit_command(dir, &["status", "--porcelain"])), "");
}

#[rstest]
fn new_pick_refused_while_one_is_stopped(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_topic(dir);
    bit_cherry_pick(dir, &["master..topic"]).assert().code(1);

    bit_cherry_pick(dir, &["topic"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("You have not concluded your cherry-pick"));
}

#[rstest]
fn continue_and_abort_need_a_sequence(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    bit_cherry_pick(dir, &["--continue"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("no cherry-pick in progress"));
    bit_cherry_pick(dir, &["--abort"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("no cherry-pick in progress"));
}

#[rstest]
fn failed_pick_keeps_the_sequence_for_continue(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("t1.txt", "1")], "T1");
    commit_files(dir, &[("t2.txt", "2")], "T2");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("master.txt", "m")], "Master work");
    let index_lock = dir.join(".git/index.lock");
    std::fs::write(&index_lock, b"").expect("Failed to hold the index lock");

    bit_cherry_pick(dir, &["master..topic"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("index.lock"));

    assert_eq!(subjects(dir), vec!["Master work", "Initial commit"]);
    let todo = read_file(&dir.join(".git/sequencer/todo"));
    let picks = todo
        .lines()
        .filter_map(|line| line.splitn(3, ' ').nth(2))
        .collect::<Vec<_>>();
    assert_eq!(picks, vec!["T1", "T2"]);

    std::fs::remove_file(&index_lock).expect("Failed to release the index lock");
    bit_cherry_pick(dir, &["--continue"]).assert().success();

    assert_eq!(
        subjects(dir),
        vec!["T2", "T1", "Master work", "Initial commit"]
    );
    assert!(!dir.join(".git/sequencer").exists());
}
