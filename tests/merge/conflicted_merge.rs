use crate::common::command::{
    bit_commit, bit_merge, commit_files, get_branch_commit_sha, get_commit_message,
    get_head_commit_sha, get_parent_commit_ids, init_repository_dir, run_bit_command,
    run_bit_command_as_author, stdout_of,
};
use crate::common::file::{FileSpec, make_executable, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

/// Both branches rewrite `1.txt`; returns (master, topic) tips.
fn conflicting_branches(dir: &Path) -> (String, String) {
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("1.txt", "eins"), ("topic.txt", "topic")], "Topic work");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("1.txt", "uno")], "Master work");

    (
        get_branch_commit_sha(dir, "master").expect("master exists"),
        get_branch_commit_sha(dir, "topic").expect("topic exists"),
    )
}

#[rstest]
fn content_conflict_stops_the_merge(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let (master, topic) = conflicting_branches(dir);

    bit_merge(dir, "topic", "Merge topic")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Auto-merging 1.txt\n\
             CONFLICT (content): Merge conflict in 1.txt\n\
             Automatic merge failed; fix conflicts and then commit the result.\n",
        ));

    assert_eq!(
        read_file(&dir.join("1.txt")),
        "<<<<<<< HEAD\nuno\n=======\neins\n>>>>>>> topic\n"
    );
    assert_eq!(read_file(&dir.join("topic.txt")), "topic");
    assert_eq!(read_file(&dir.join(".git/MERGE_HEAD")).trim(), topic);
    assert_eq!(read_file(&dir.join(".git/MERGE_MSG")).trim(), "Merge topic");
    assert_eq!(get_branch_commit_sha(dir, "master").expect("master exists"), master);
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "UU 1.txt\nA  topic.txt\n"
    );
}

#[rstest]
fn long_status_lists_unmerged_paths(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    let status = stdout_of(run_bit_command(dir, &["status"]));

    assert!(status.contains("You have unmerged paths."));
    assert!(status.contains("both modified:   1.txt"));
}

#[rstest]
fn continue_commits_the_resolution(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let (master, topic) = conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    write_file(FileSpec::new(dir.join("1.txt"), "uno und eins".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    run_bit_command_as_author(dir, &["merge", "--continue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("] Merge topic\n"));

    let merge = get_head_commit_sha(dir).expect("HEAD exists");
    assert_eq!(get_parent_commit_ids(dir, &merge), vec![master, topic]);
    assert_eq!(get_commit_message(dir, &merge), "Merge topic\n");
    assert!(!dir.join(".git/MERGE_HEAD").exists());
    assert!(!dir.join(".git/MERGE_MSG").exists());
    assert_eq!(stdout_of(run_bit_command(dir, &["status", "--porcelain"])), "");
}

#[rstest]
fn commit_concludes_a_pending_merge(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let (master, topic) = conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    write_file(FileSpec::new(dir.join("1.txt"), "resolved".to_string()));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    run_bit_command_as_author(dir, &["commit"]).assert().success();

    let merge = get_head_commit_sha(dir).expect("HEAD exists");
    assert_eq!(get_parent_commit_ids(dir, &merge), vec![master, topic]);
    assert_eq!(get_commit_message(dir, &merge), "Merge topic\n");
}

#[rstest]
fn continue_refuses_unmerged_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let (master, _) = conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    run_bit_command_as_author(dir, &["merge", "--continue"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains(
            "Committing is not possible because you have unmerged files.",
        ));
    bit_commit(dir, "try anyway").assert().code(5);

    assert_eq!(get_head_commit_sha(dir).expect("HEAD exists"), master);
    assert!(dir.join(".git/MERGE_HEAD").exists());
}

#[rstest]
fn new_merge_refused_while_one_is_pending(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    bit_merge(dir, "topic", "Again")
        .assert()
        .code(5)
        .stderr(predicate::str::contains(
            "You have not concluded your merge (MERGE_HEAD exists).",
        ));
}

#[rstest]
fn abort_restores_the_previous_head(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let (master, _) = conflicting_branches(dir);
    bit_merge(dir, "topic", "Merge topic").assert().code(1);

    run_bit_command(dir, &["merge", "--abort"]).assert().success();

    assert_eq!(get_head_commit_sha(dir).expect("HEAD exists"), master);
    assert_eq!(read_file(&dir.join("1.txt")), "uno");
    assert!(!dir.join("topic.txt").exists());
    assert!(!dir.join(".git/MERGE_HEAD").exists());
    assert_eq!(stdout_of(run_bit_command(dir, &["status", "--porcelain"])), "");
}

#[rstest]
fn abort_without_a_merge_is_refused(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["merge", "--abort"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains(
            "There is no merge to abort (MERGE_HEAD missing).",
        ));
}

#[rstest]
fn modify_delete_keeps_the_modified_version(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("a/2.txt", "two on topic")], "Topic edits 2.txt");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    run_bit_command(dir, &["rm", "a/2.txt"]).assert().success();
    bit_commit(dir, "Master deletes 2.txt").assert().success();

    bit_merge(dir, "topic", "Merge topic")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "CONFLICT (modify/delete): a/2.txt deleted in HEAD and modified in topic. \
             Version topic of a/2.txt left in tree.",
        ));

    assert_eq!(read_file(&dir.join("a/2.txt")), "two on topic");
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "DU a/2.txt\n"
    );
}

#[rstest]
fn add_add_conflict(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    commit_files(dir, &[("new.txt", "from topic\n")], "Topic adds new.txt");
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("new.txt", "from master\n")], "Master adds new.txt");

    bit_merge(dir, "topic", "Merge topic")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "CONFLICT (add/add): Merge conflict in new.txt",
        ));

    assert_eq!(
        read_file(&dir.join("new.txt")),
        "<<<<<<< HEAD\nfrom master\n=======\nfrom topic\n>>>>>>> topic\n"
    );
    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "AA new.txt\n"
    );
}

#[rstest]
fn content_and_mode_changes_report_both_conflicts(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "topic"]).assert().success();
    write_file(FileSpec::new(dir.join("1.txt"), "eins".to_string()));
    make_executable(&dir.join("1.txt"));
    run_bit_command(dir, &["add", "1.txt"]).assert().success();
    bit_commit(dir, "Topic rewrites 1.txt as a script")
        .assert()
        .success();
    run_bit_command(dir, &["checkout", "master"]).assert().success();
    commit_files(dir, &[("1.txt", "uno")], "Master work");

    bit_merge(dir, "topic", "Merge topic")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Auto-merging 1.txt\n\
             CONFLICT (content): Merge conflict in 1.txt\n\
             CONFLICT (mode): Merge conflict in 1.txt\n\
             Automatic merge failed; fix conflicts and then commit the result.\n",
        ));

    assert_eq!(
        stdout_of(run_bit_command(dir, &["status", "--porcelain"])),
        "UU 1.txt\n"
    );
}
