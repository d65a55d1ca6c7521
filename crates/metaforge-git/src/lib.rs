//! Git execution layer for metaforge.
//!
//! This crate implements the process boundary: a streamed subprocess runner
//! that merges stdout/stderr line-by-line into the log as the child produces
//! them (`run_streamed`), a typed wrapper over the git subcommands the
//! reconciler issues (`Git`), and read-only repository inspection
//! (`Git::inspect` → `RepoState`).

pub mod git;
pub mod inspect;
pub mod process;

pub use git::Git;
pub use inspect::RepoState;
pub use process::{run_streamed, RunResult};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'git {args}' in {} exited with status {code:?}", .dir.display())]
    QueryFailed {
        args: String,
        dir: PathBuf,
        code: Option<i32>,
    },
    #[error("HEAD is detached in {}; a named branch must be checked out", .0.display())]
    DetachedHead(PathBuf),
    #[error("no commits found in {}", .0.display())]
    EmptyHistory(PathBuf),
    #[error("could not determine the current branch in {}", .0.display())]
    NoCurrentBranch(PathBuf),
}
