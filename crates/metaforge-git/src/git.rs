use crate::process::{run_streamed, RunResult};
use crate::GitError;
use std::path::Path;
use std::time::Duration;

/// Typed wrapper over the git subcommands the reconciler issues.
///
/// Mutating operations stream their output into the log; housekeeping and
/// stash bookkeeping run silently, matching the noise level a user wants
/// during a long synchronization. Methods return the raw [`RunResult`] so the
/// engine decides which failures are fatal.
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
    timeout: Option<Duration>,
}

impl Default for Git {
    fn default() -> Self {
        Self::new()
    }
}

impl Git {
    pub fn new() -> Self {
        Self {
            program: "git".to_owned(),
            timeout: None,
        }
    }

    /// Apply a per-operation timeout to every subsequent invocation.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the git executable. Intended for tests.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub(crate) fn run(
        &self,
        cwd: Option<&Path>,
        args: &[&str],
        silent: bool,
    ) -> Result<RunResult, GitError> {
        run_streamed(&self.program, args, cwd, silent, self.timeout)
    }

    /// `git --version`, silently. Used for environment diagnostics.
    pub fn version(&self) -> Result<RunResult, GitError> {
        self.run(None, &["--version"], true)
    }

    /// Clone `url` into `dest` on the remote's default branch.
    pub fn clone_repo(&self, url: &str, dest: &Path) -> Result<RunResult, GitError> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", url, &dest], false)
    }

    /// Create a local branch tracking `origin/{branch}` and switch to it.
    /// With `force`, an existing branch of that name is recreated and
    /// uncommitted local changes are discarded.
    pub fn checkout_track(
        &self,
        dir: &Path,
        branch: &str,
        force: bool,
    ) -> Result<RunResult, GitError> {
        let remote_ref = format!("origin/{branch}");
        let args: Vec<&str> = if force {
            vec!["checkout", "-f", "-B", branch, remote_ref.as_str()]
        } else {
            vec!["checkout", "-b", branch, remote_ref.as_str()]
        };
        self.run(Some(dir), &args, false)
    }

    /// Check out an existing local branch.
    pub fn checkout(&self, dir: &Path, branch: &str, force: bool) -> Result<RunResult, GitError> {
        let mut args = vec!["checkout"];
        if force {
            args.push("-f");
        }
        args.push(branch);
        self.run(Some(dir), &args, false)
    }

    /// Repoint the `origin` remote at `url`.
    pub fn set_remote_url(&self, dir: &Path, url: &str) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["remote", "set-url", "origin", url], false)
    }

    /// Refresh remote-tracking refs from all remotes.
    pub fn remote_update(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["remote", "update"], false)
    }

    /// Drop remote-tracking refs for branches deleted on `origin`.
    pub fn remote_prune(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["remote", "prune", "origin"], true)
    }

    /// Set aside uncommitted local modifications.
    pub fn stash(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["stash"], true)
    }

    /// Restore the most recently stashed modifications.
    pub fn stash_pop(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["stash", "pop"], true)
    }

    /// Object id of `refs/stash`, if any stash entries exist. Lets the caller
    /// tell whether a `stash` invocation actually recorded something.
    pub fn stash_ref(&self, dir: &Path) -> Result<Option<String>, GitError> {
        let result = self.run(Some(dir), &["rev-parse", "-q", "--verify", "refs/stash"], true)?;
        if result.success() {
            Ok(Some(result.output.trim().to_owned()))
        } else {
            Ok(None)
        }
    }

    /// Pull the current branch, rebasing local commits on top.
    pub fn pull_rebase(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["pull", "--rebase"], false)
    }

    /// Forcibly move the working tree to `revision`.
    pub fn reset_hard(&self, dir: &Path, revision: &str) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["reset", "--hard", revision], false)
    }

    /// Repository housekeeping.
    pub fn gc(&self, dir: &Path) -> Result<RunResult, GitError> {
        self.run(Some(dir), &["gc"], true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_program_is_git() {
        let git = Git::new();
        assert_eq!(git.program, "git");
        assert!(git.timeout.is_none());
    }

    #[test]
    fn timeout_is_carried() {
        let git = Git::new().with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(git.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn program_override_is_used() {
        // `true` accepts any arguments and exits 0; good enough to prove the
        // override reaches the runner.
        let git = Git::new().with_program("true");
        let result = git.version().unwrap();
        assert!(result.success());
    }

    #[test]
    fn spawn_failure_surfaces_program_name() {
        let git = Git::new().with_program("metaforge-no-such-git");
        let err = git.version().unwrap_err();
        assert!(err.to_string().contains("metaforge-no-such-git"));
    }
}
