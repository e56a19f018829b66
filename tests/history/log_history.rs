use crate::common::command::{
    AUTHOR_EMAIL, AUTHOR_NAME, commit_files, get_head_commit_sha, init_repository_dir,
    run_bit_command, stdout_of,
};
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Three commits on master: the initial one, "Second" and "Third".
fn linear_history(dir: &std::path::Path) {
    commit_files(dir, &[("1.txt", "one\ntwo")], "Second");
    commit_files(dir, &[("a/2.txt", "two\nthree")], "Third");
}

#[rstest]
fn medium_format_walks_from_head(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = get_head_commit_sha(dir)?;
    commit_files(dir, &[("1.txt", "one\ntwo")], "Second");
    let second = get_head_commit_sha(dir)?;

    let log = stdout_of(run_bit_command(dir, &["log"]));

    let entry = |oid: &str, message: &str| {
        format!(
            "commit {oid}\n\
             Author: {AUTHOR_NAME} <{AUTHOR_EMAIL}>\n\
             Date:   Sun Jan 1 12:00:00 2023 +0000\n\
             \n    {message}\n"
        )
    };
    assert_eq!(
        log,
        format!("{}\n{}", entry(&second, "Second"), entry(&first, "Initial commit"))
    );

    Ok(())
}

#[rstest]
fn oneline_abbreviates_and_keeps_subjects(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = get_head_commit_sha(dir)?;
    linear_history(dir);
    let third = get_head_commit_sha(dir)?;

    let log = stdout_of(run_bit_command(dir, &["log", "--oneline"]));

    let lines = log.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format!("{} Third", &third[..7]));
    assert_eq!(lines[2], format!("{} Initial commit", &first[..7]));

    Ok(())
}

#[rstest]
fn decorate_marks_head_and_branches(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = get_head_commit_sha(dir)?;
    run_bit_command(dir, &["branch", "create", "topic"])
        .assert()
        .success();

    let short = stdout_of(run_bit_command(dir, &["log", "--oneline", "--decorate=short"]));
    let full = stdout_of(run_bit_command(dir, &["log", "--oneline", "--decorate=full"]));
    let plain = stdout_of(run_bit_command(dir, &["log", "--oneline"]));

    assert_eq!(
        short,
        format!("{} (HEAD -> master, topic) Initial commit\n", &head[..7])
    );
    assert_eq!(
        full,
        format!(
            "{} (HEAD -> refs/heads/master, refs/heads/topic) Initial commit\n",
            &head[..7]
        )
    );
    assert_eq!(plain, format!("{} Initial commit\n", &head[..7]));

    Ok(())
}

#[rstest]
fn range_excludes_reachable_history(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    run_bit_command(dir, &["branch", "create", "base"])
        .assert()
        .success();
    linear_history(dir);

    let log = stdout_of(run_bit_command(dir, &["log", "--oneline", "base..master"]));
    let excluded = stdout_of(run_bit_command(dir, &["log", "--oneline", "^master", "base"]));

    let subjects = log
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject))
        .collect::<Vec<_>>();
    assert_eq!(subjects, vec!["Third", "Second"]);
    assert_eq!(excluded, "");

    Ok(())
}

#[rstest]
fn path_filter_keeps_commits_touching_the_path(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    linear_history(dir);

    let log = stdout_of(run_bit_command(dir, &["log", "--oneline", "--", "a"]));

    let subjects = log
        .lines()
        .filter_map(|line| line.split_once(' ').map(|(_, subject)| subject))
        .collect::<Vec<_>>();
    assert_eq!(subjects, vec!["Third", "Initial commit"]);
}

#[rstest]
fn patch_shows_each_commit_change(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    commit_files(dir, &[("1.txt", "one\ntwo")], "Second");

    let log = stdout_of(run_bit_command(dir, &["log", "-p", "HEAD"]));

    assert!(log.contains(
        "diff --git a/1.txt b/1.txt\n\
         index 43dd47e..9ed40b4 100644\n\
         --- a/1.txt\n\
         +++ b/1.txt\n\
         @@ -1,1 +1,2 @@\n \
         one\n\
         +two\n"
    ));
    assert!(log.contains("new file mode 100644\n"));
}
