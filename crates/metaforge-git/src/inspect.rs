use crate::git::Git;
use crate::GitError;
use std::path::Path;

/// Observed state of a local clone at inspection time.
///
/// Computed fresh for each layer during reconciliation and discarded
/// afterwards; never cached across layers or runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoState {
    pub revision: String,
    pub branch: String,
    pub remote_url: String,
}

impl Git {
    /// Report the current revision, branch, and `origin` URL of the clone at
    /// `path`. Read-only; all queries run silently.
    pub fn inspect(&self, path: &Path) -> Result<RepoState, GitError> {
        let revision = self.head_revision(path)?;
        let branch = self.current_branch(path)?;
        let remote_url = self.origin_url(path)?;
        Ok(RepoState {
            revision,
            branch,
            remote_url,
        })
    }

    fn head_revision(&self, path: &Path) -> Result<String, GitError> {
        let args = ["log", "--oneline", "--no-abbrev", "-1"];
        let result = self.run(Some(path), &args, true)?;
        if !result.success() {
            return Err(query_failed(&args, path, &result));
        }
        result
            .output
            .split_whitespace()
            .next()
            .map(ToOwned::to_owned)
            .ok_or_else(|| GitError::EmptyHistory(path.to_owned()))
    }

    fn current_branch(&self, path: &Path) -> Result<String, GitError> {
        let args = ["branch"];
        let result = self.run(Some(path), &args, true)?;
        if !result.success() {
            return Err(query_failed(&args, path, &result));
        }
        let current = result
            .output
            .lines()
            .find_map(|line| line.strip_prefix("* "))
            .ok_or_else(|| GitError::NoCurrentBranch(path.to_owned()))?;
        // A detached HEAD shows as "* (HEAD detached at <rev>)".
        if current.starts_with('(') {
            return Err(GitError::DetachedHead(path.to_owned()));
        }
        Ok(current.trim().to_owned())
    }

    fn origin_url(&self, path: &Path) -> Result<String, GitError> {
        let args = ["config", "remote.origin.url"];
        let result = self.run(Some(path), &args, true)?;
        if !result.success() {
            return Err(query_failed(&args, path, &result));
        }
        Ok(result.output.trim().to_owned())
    }
}

fn query_failed(args: &[&str], dir: &Path, result: &crate::RunResult) -> GitError {
    GitError::QueryFailed {
        args: args.join(" "),
        dir: dir.to_owned(),
        code: result.code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.invalid")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.invalid")
            .output()
            .expect("run git")
            .status;
        assert!(status.success(), "git {args:?} failed in {dir:?}");
    }

    fn init_repo(dir: &Path) {
        git_in(dir, &["init", "-b", "main"]);
        git_in(dir, &["config", "user.name", "test"]);
        git_in(dir, &["config", "user.email", "test@example.invalid"]);
        std::fs::write(dir.join("README"), "hello\n").unwrap();
        git_in(dir, &["add", "README"]);
        git_in(dir, &["commit", "-m", "initial"]);
        git_in(dir, &["remote", "add", "origin", "https://example.invalid/repo.git"]);
    }

    #[test]
    fn inspect_reports_branch_revision_and_remote() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());

        let state = Git::new().inspect(dir.path()).unwrap();
        assert_eq!(state.branch, "main");
        assert_eq!(state.remote_url, "https://example.invalid/repo.git");
        // Full (non-abbreviated) hex object id.
        assert_eq!(state.revision.len(), 40);
        assert!(state.revision.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn detached_head_is_an_error() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        git_in(dir.path(), &["checkout", "--detach", "HEAD"]);

        let err = Git::new().inspect(dir.path()).unwrap_err();
        assert!(matches!(err, GitError::DetachedHead(_)));
    }

    #[test]
    fn inspect_outside_a_repo_fails() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        assert!(Git::new().inspect(dir.path()).is_err());
    }
}
