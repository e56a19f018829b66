use crate::common::command::{init_repository_dir, repository_dir, run_bit_command, stdout_of};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
fn clean_working_tree(init_repository_dir: TempDir) {
    let status = stdout_of(run_bit_command(init_repository_dir.path(), &["status"]));

    assert_eq!(
        status,
        "On branch master\nnothing to commit, working tree clean\n"
    );
}

#[rstest]
fn untracked_files_only(repository_dir: TempDir) {
    let dir = repository_dir.path();
    run_bit_command(dir, &["init"]).assert().success();
    write_file(FileSpec::new(dir.join("new.txt"), "new".to_string()));

    let status = stdout_of(run_bit_command(dir, &["status"]));

    assert_eq!(
        status,
        "On branch master\n\
         Untracked files:\n\
         \n        new.txt\n\
         \n\
         nothing added to commit but untracked files present\n"
    );
}

#[rstest]
fn staged_unstaged_and_untracked_sections(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a").join("4.txt"), "four".to_string()));
    run_bit_command(dir, &["add", "a"]).assert().success();
    write_file(FileSpec::new(dir.join("1.txt"), "modified one".to_string()));
    write_file(FileSpec::new(dir.join("new.txt"), "new".to_string()));

    let status = stdout_of(run_bit_command(dir, &["status"]));

    let expected = [
        "On branch master",
        "Changes to be committed:",
        "",
        "        new file:   a/4.txt",
        "",
        "Changes not staged for commit:",
        "",
        "        modified:   1.txt",
        "",
        "Untracked files:",
        "",
        "        new.txt",
        "",
    ]
    .map(|line| format!("{line}\n"))
    .concat();
    assert_eq!(status, expected);
}

#[rstest]
fn unstaged_changes_only(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    std::fs::remove_file(dir.join("1.txt")).unwrap();

    let status = stdout_of(run_bit_command(dir, &["status"]));

    assert_eq!(
        status,
        "On branch master\n\
         Changes not staged for commit:\n\
         \n        deleted:    1.txt\n\
         \n\
         no changes added to commit\n"
    );
}

#[rstest]
fn detached_head_is_reported(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let head = std::fs::read_to_string(dir.join(".git/refs/heads/master")).unwrap();
    run_bit_command(dir, &["checkout", head.trim()])
        .assert()
        .success();

    let status = stdout_of(run_bit_command(dir, &["status"]));

    assert!(status.starts_with("Not currently on any branch.\n"));
}
