use crate::common::command::{
    get_head_commit_sha, init_repository_dir, repository_dir, run_bit_command, stdout_of,
};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

const HI_BLOB: &str = "45b983be36b73c0788dc9cbcb76cbb80fc7bb057";

#[rstest]
fn hash_object_without_write_stores_nothing(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    write_file(FileSpec::new(
        repository_dir.path().join("hi.txt"),
        "hi\n".to_string(),
    ));

    run_bit_command(repository_dir.path(), &["hash-object", "hi.txt"])
        .assert()
        .success()
        .stdout(HI_BLOB);

    let object_path = repository_dir
        .path()
        .join(".git/objects")
        .join(&HI_BLOB[..2])
        .join(&HI_BLOB[2..]);
    assert!(!object_path.exists());
}

#[rstest]
fn write_blob_object_successfully(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    write_file(FileSpec::new(
        repository_dir.path().join("hi.txt"),
        "hi\n".to_string(),
    ));

    run_bit_command(repository_dir.path(), &["hash-object", "-w", "hi.txt"])
        .assert()
        .success()
        .stdout(HI_BLOB);

    let object_path = repository_dir
        .path()
        .join(".git/objects")
        .join(&HI_BLOB[..2])
        .join(&HI_BLOB[2..]);
    assert!(object_path.is_file());

    run_bit_command(repository_dir.path(), &["cat-file", "-p", HI_BLOB])
        .assert()
        .success()
        .stdout("hi\n");
    run_bit_command(repository_dir.path(), &["cat-file", "-t", &HI_BLOB[..7]])
        .assert()
        .success()
        .stdout("blob\n");
}

#[rstest]
fn cat_file_resolves_revisions(init_repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let head = get_head_commit_sha(init_repository_dir.path())?;

    let content = stdout_of(run_bit_command(
        init_repository_dir.path(),
        &["cat-file", "-p", "HEAD"],
    ));

    assert!(content.starts_with("tree "));
    assert!(content.contains("author fake_user <fake_email@email.com> 1672574400 +0000"));
    assert!(content.ends_with("\n\nInitial commit\n"));

    run_bit_command(init_repository_dir.path(), &["cat-file", "-t", &head])
        .assert()
        .success()
        .stdout("commit\n");

    Ok(())
}

#[rstest]
fn list_all_blobs_from_head_commit(init_repository_dir: TempDir) {
    let expected = "\
100644 43dd47ea691c90a5fa7827892c70241913351963 1.txt
100644 64c5e5885a4b06010b3a0c20edb7900dd0311025 a/2.txt
100644 1d19714ffbc272ba0da6eb419d66123c20527174 a/b/3.txt
";

    let listing = stdout_of(run_bit_command(
        init_repository_dir.path(),
        &["ls-tree", "-r", "HEAD"],
    ));

    assert_eq!(listing, expected);
}

#[rstest]
fn ls_tree_without_recursion_lists_subtrees(init_repository_dir: TempDir) {
    let listing = stdout_of(run_bit_command(init_repository_dir.path(), &["ls-tree"]));
    let lines = listing.lines().collect::<Vec<_>>();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" 1.txt"));
    assert!(lines[1].starts_with("040000 "));
    assert!(lines[1].ends_with(" a"));
}

#[rstest]
fn cat_file_of_unknown_object_fails(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["cat-file", "-p", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("fatal:"));
}
