use anyhow::Context;
use bit::areas::pending_commit::PendingCommitError;
use bit::areas::repository::{Repository, RepositoryError};
use bit::artifacts::branch::RefError;
use bit::artifacts::checkout::conflict::MigrationError;
use bit::artifacts::core::lockfile::LockError;
use bit::artifacts::merge::MergeError;
use bit::artifacts::objects::commit::Author;
use bit::commands::plumbing::write_commit::CommitIdentity;
use bit::commands::porcelain::log::{CommitDecoration, CommitDisplayFormat, LogOptions};
use bit::commands::porcelain::reset::ResetMode;
use bit::commands::porcelain::rm::{RemoveError, RemoveOptions};
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BIT_LOG";

#[derive(Parser)]
#[command(
    name = "bit",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A content-addressed version control system",
    long_about = "bit keeps snapshots of a directory tree in a content-addressed \
    object store, using the same on-disk formats as git. It covers the local \
    workflow: staging, committing, branching, merging and cherry-picking.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content or the type of an object in the repository. \
        The object may be given as any revision expression."
    )]
    CatFile {
        #[arg(short = 'p', help = "Pretty-print the object content")]
        pretty: bool,
        #[arg(short = 't', conflicts_with = "pretty", help = "Print the object type")]
        show_type: bool,
        #[arg(index = 1, help = "The object to print")]
        object: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes a file as a blob and can write it to the object database. \
        It requires the path to the file to be specified."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(
        name = "ls-tree",
        about = "List the contents of a tree object",
        long_about = "This command lists the entries of the tree a revision points at."
    )]
    LsTree {
        #[arg(short, help = "Recurse into subtrees")]
        recursive: bool,
        #[arg(index = 1, default_value = "HEAD")]
        tree: String,
    },
    #[command(
        name = "add",
        about = "Add file contents to the index",
        long_about = "This command stores the given files, or every file under the given directories, \
        and records them in the index."
    )]
    Add {
        #[arg(required = true, help = "Files or directories to add")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "rm",
        about = "Remove files from the workspace and the index",
        long_about = "This command untracks the given paths and deletes them from the workspace. \
        Paths whose content would be lost are refused unless forced."
    )]
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, help = "Only remove from the index")]
        cached: bool,
        #[arg(short, long, help = "Skip the up-to-date checks")]
        force: bool,
        #[arg(short, help = "Allow recursive removal of directories")]
        recursive: bool,
    },
    #[command(
        name = "status",
        about = "Show the working tree status",
        long_about = "This command shows staged, unstaged, conflicted and untracked paths."
    )]
    Status {
        #[arg(long, help = "Give the output in the short, stable format")]
        porcelain: bool,
    },
    #[command(
        name = "diff",
        about = "Show changes between the index and the workspace, or HEAD and the index",
        long_about = "Without flags this command shows unstaged changes. \
        With --cached it shows what would be committed."
    )]
    Diff {
        #[arg(long, alias = "staged", help = "Compare HEAD with the index")]
        cached: bool,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit from the index. While a merge or cherry-pick \
        is stopped on conflicts it concludes it, and the message may be omitted."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: Option<String>,
    },
    #[command(
        name = "branch",
        about = "Create, list or delete branches",
        subcommand_required = true
    )]
    Branch {
        #[command(subcommand)]
        command: BranchCommands,
    },
    #[command(
        name = "checkout",
        about = "Switch branches or detach HEAD at a commit",
        long_about = "This command updates the workspace and the index to the target revision. \
        It refuses to run when local changes would be overwritten."
    )]
    Checkout {
        #[arg(index = 1)]
        target: String,
    },
    #[command(name = "log", about = "Show commit history")]
    Log {
        #[arg(help = "Revisions to start from; 'a..b' and '^a' exclude history")]
        revisions: Vec<String>,
        #[arg(last = true, help = "Only show commits touching these paths")]
        paths: Vec<PathBuf>,
        #[arg(long, help = "Show abbreviated commit ids")]
        abbrev_commit: bool,
        #[arg(long, help = "Shorthand for --format=oneline --abbrev-commit")]
        oneline: bool,
        #[arg(long, alias = "pretty", value_enum, default_value = "medium")]
        format: CommitDisplayFormat,
        #[arg(
            long,
            value_enum,
            num_args = 0..=1,
            default_value = "none",
            default_missing_value = "short"
        )]
        decorate: CommitDecoration,
        #[arg(short, long, help = "Show the patch each commit introduces")]
        patch: bool,
    },
    #[command(
        name = "merge",
        about = "Join another history into the current branch",
        long_about = "This command merges a revision into HEAD, fast-forwarding when possible. \
        Conflicts are left in the index and the workspace to be resolved and committed."
    )]
    Merge {
        #[arg(index = 1, required_unless_present_any = ["continue_merge", "abort"])]
        revision: Option<String>,
        #[arg(short, long, help = "The merge commit message")]
        message: Option<String>,
        #[arg(long = "continue", conflicts_with = "abort", help = "Commit the resolved merge")]
        continue_merge: bool,
        #[arg(long, help = "Abandon the merge and restore the previous HEAD")]
        abort: bool,
    },
    #[command(
        name = "cherry-pick",
        about = "Apply the changes introduced by existing commits",
        long_about = "This command replays commits on top of HEAD. A conflicting pick stops the \
        sequence until it is continued or aborted."
    )]
    CherryPick {
        #[arg(required_unless_present_any = ["continue_pick", "abort"])]
        revisions: Vec<String>,
        #[arg(long = "continue", conflicts_with = "abort", help = "Resume after resolving conflicts")]
        continue_pick: bool,
        #[arg(long, help = "Return to where the sequence started")]
        abort: bool,
    },
    #[command(
        name = "reset",
        about = "Reset HEAD, the index or the workspace to a commit",
        long_about = "This command moves HEAD to a commit and rebuilds the index from it (--mixed), \
        leaves the index alone (--soft) or rewrites the workspace too (--hard). \
        Given paths, it only restores their index entries."
    )]
    Reset {
        #[arg(long, conflicts_with_all = ["mixed", "hard"])]
        soft: bool,
        #[arg(long, conflicts_with = "hard")]
        mixed: bool,
        #[arg(long)]
        hard: bool,
        #[arg(help = "An optional revision followed by paths")]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum BranchCommands {
    #[command(name = "create", about = "Create a branch at HEAD or a start point")]
    Create {
        #[arg(index = 1)]
        name: String,
        #[arg(index = 2)]
        start_point: Option<String>,
    },
    #[command(name = "list", about = "List branches")]
    List {
        #[arg(short, long, help = "Show the commit each branch points at")]
        verbose: bool,
    },
    #[command(name = "delete", about = "Delete branches")]
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(short, long, help = "Delete even if not merged")]
        force: bool,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("missing identity: set {0}")]
struct IdentityError(&'static str);

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(128)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();
    init_colors();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("fatal: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn init_colors() {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let pwd = std::env::current_dir().context("could not read the current directory")?;

    if let Commands::Init { path } = &cli.command {
        let path = path.clone().unwrap_or(pwd);
        let mut repository = Repository::new(&path, Box::new(std::io::stdout()))?;
        repository.init()?;
        repository.writer().flush()?;
        return Ok(());
    }

    let mut repository = Repository::new(&pwd, Box::new(std::io::stdout()))?;
    repository.ensure_initialized()?;

    let result = dispatch(&mut repository, cli.command).await;
    repository.writer().flush()?;

    result
}

async fn dispatch(repository: &mut Repository, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { .. } => Ok(()),
        Commands::CatFile {
            show_type, object, ..
        } => {
            if show_type {
                repository.cat_file_type(&object)
            } else {
                repository.cat_file(&object)
            }
        }
        Commands::HashObject { write, file } => repository.hash_object(&file, write),
        Commands::LsTree { recursive, tree } => repository.ls_tree(&tree, recursive),
        Commands::Add { paths } => repository.add(&paths).await,
        Commands::Rm {
            paths,
            cached,
            force,
            recursive,
        } => {
            let options = RemoveOptions {
                cached,
                force,
                recursive,
            };
            repository.rm(&paths, options).await
        }
        Commands::Status { porcelain } => repository.status(porcelain).await,
        Commands::Diff { cached } => repository.diff(cached).await,
        Commands::Commit { message } => {
            let identity = identity_from_env()?;
            repository.commit(message.as_deref(), &identity).await
        }
        Commands::Branch { command } => match command {
            BranchCommands::Create { name, start_point } => {
                repository.create_branch(&name, start_point.as_deref())
            }
            BranchCommands::List { verbose } => repository.list_branches(verbose),
            BranchCommands::Delete { names, force } => repository.delete_branches(&names, force),
        },
        Commands::Checkout { target } => repository.checkout(&target).await,
        Commands::Log {
            revisions,
            paths,
            abbrev_commit,
            oneline,
            format,
            decorate,
            patch,
        } => {
            let options = LogOptions {
                revisions,
                paths,
                abbrev_commit: abbrev_commit || oneline,
                format: if oneline {
                    CommitDisplayFormat::OneLine
                } else {
                    format
                },
                decorate,
                patch,
            };
            repository.log(&options)
        }
        Commands::Merge {
            revision,
            message,
            continue_merge,
            abort,
        } => {
            if abort {
                return repository.merge_abort().await;
            }
            let identity = identity_from_env()?;
            match (continue_merge, revision) {
                (true, _) => repository.merge_continue(&identity).await,
                (false, Some(revision)) => {
                    repository
                        .merge(&revision, message.as_deref(), &identity)
                        .await
                }
                (false, None) => anyhow::bail!("nothing to merge"),
            }
        }
        Commands::CherryPick {
            revisions,
            continue_pick,
            abort,
        } => {
            if abort {
                return repository.cherry_pick_abort().await;
            }
            let identity = identity_from_env()?;
            if continue_pick {
                repository.cherry_pick_continue(&identity).await
            } else {
                repository.cherry_pick(&revisions, &identity).await
            }
        }
        Commands::Reset {
            soft, hard, args, ..
        } => {
            let mode = if soft {
                ResetMode::Soft
            } else if hard {
                ResetMode::Hard
            } else {
                ResetMode::Mixed
            };
            repository.reset(&args, mode).await
        }
    }
}

/// Author from `GIT_AUTHOR_*`; the committer falls back to it field by field.
fn identity_from_env() -> anyhow::Result<CommitIdentity> {
    let author = author_from_env("GIT_AUTHOR", None)?;
    let committer = author_from_env("GIT_COMMITTER", Some(&author))?;

    Ok(CommitIdentity::new(author, committer))
}

fn author_from_env(prefix: &'static str, fallback: Option<&Author>) -> anyhow::Result<Author> {
    let read = |suffix: &str| {
        std::env::var(format!("{prefix}_{suffix}"))
            .ok()
            .filter(|value| !value.trim().is_empty())
    };

    let name = match (read("NAME"), fallback) {
        (Some(name), _) => name,
        (None, Some(author)) => author.name().to_string(),
        (None, None) => return Err(IdentityError("GIT_AUTHOR_NAME").into()),
    };
    let email = match (read("EMAIL"), fallback) {
        (Some(email), _) => email,
        (None, Some(author)) => author.email().to_string(),
        (None, None) => return Err(IdentityError("GIT_AUTHOR_EMAIL").into()),
    };
    let timestamp = match (read("DATE"), fallback) {
        (Some(date), _) => Author::parse_date(&date)?,
        (None, Some(author)) => author.timestamp(),
        (None, None) => return Ok(Author::new(name, email)),
    };

    Ok(Author::new_with_timestamp(name, email, timestamp))
}

fn find_cause<T: std::error::Error + 'static>(err: &anyhow::Error) -> Option<&T> {
    err.chain().find_map(|cause| cause.downcast_ref::<T>())
}

/// Print the error the way the command line expects and pick the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(merge_error) = find_cause::<MergeError>(err) {
        return match merge_error {
            MergeError::Conflicted | MergeError::PickConflicted(_) => ExitCode::from(1),
            _ => {
                eprintln!("fatal: {merge_error}");
                ExitCode::from(128)
            }
        };
    }
    if let Some(migration) = find_cause::<MigrationError>(err) {
        eprintln!("{}", migration.report());
        return ExitCode::from(128);
    }
    if let Some(remove_error) = find_cause::<RemoveError>(err) {
        return match remove_error {
            RemoveError::Unsafe { .. } => {
                eprintln!("{remove_error}");
                ExitCode::from(1)
            }
            _ => {
                eprintln!("fatal: {remove_error}");
                ExitCode::from(128)
            }
        };
    }
    if find_cause::<PendingCommitError>(err).is_some() || find_cause::<IdentityError>(err).is_some()
    {
        eprintln!("fatal: {err}");
        return ExitCode::from(5);
    }

    eprintln!("fatal: {err}");
    if find_cause::<LockError>(err).is_some()
        || find_cause::<RepositoryError>(err).is_some()
        || find_cause::<RefError>(err).is_some()
    {
        return ExitCode::from(128);
    }

    ExitCode::from(1)
}
