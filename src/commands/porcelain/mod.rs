//! Porcelain commands
//!
//! The user-facing workflows. Each one is an `impl Repository` block that
//! composes the areas and artifacts, locks the index when it writes it, and
//! reports to the repository writer.
//!
//! - `init`, `add`, `rm`, `commit`, `status`, `diff`, `log`
//! - `branch`, `checkout`
//! - `merge`, `cherry_pick`, `reset`

pub mod add;
pub mod branch;
pub mod checkout;
pub mod cherry_pick;
pub mod commit;
pub mod diff;
pub mod init;
pub mod log;
pub mod merge;
pub mod reset;
pub mod rm;
pub mod status;
