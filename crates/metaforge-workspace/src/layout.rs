use crate::WorkspaceError;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout for a metaforge build workspace.
///
/// The sources tree holds one clone per declared layer; the build tree holds
/// configuration and build output. All build subdirectories are created
/// idempotently by [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
    sources: PathBuf,
    build: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        sources: impl Into<PathBuf>,
        build: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            sources: sources.into(),
            build: build.into(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn sources_dir(&self) -> &Path {
        &self.sources
    }

    #[inline]
    pub fn build_dir(&self) -> &Path {
        &self.build
    }

    #[inline]
    pub fn conf_dir(&self) -> PathBuf {
        self.build.join("conf")
    }

    #[inline]
    pub fn downloads_dir(&self) -> PathBuf {
        self.build.join("downloads")
    }

    #[inline]
    pub fn deploy_dir(&self) -> PathBuf {
        self.build.join("deploy")
    }

    #[inline]
    pub fn sstate_cache_dir(&self) -> PathBuf {
        self.build.join("sstate-cache")
    }

    #[inline]
    pub fn build_tmp_dir(&self, distro_dirname: &str) -> PathBuf {
        self.build.join(format!("tmp-{distro_dirname}"))
    }

    /// Local clone path for a declared layer.
    #[inline]
    pub fn layer_path(&self, name: &str) -> PathBuf {
        self.sources.join(name)
    }

    /// The sourceable environment script at the workspace root.
    #[inline]
    pub fn env_file(&self, distro_dirname: &str, machine: &str) -> PathBuf {
        self.root.join(format!("env-{distro_dirname}_{machine}"))
    }

    /// Lock file guarding the workspace against concurrent synchronization.
    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.build.join(".metaforge.lock")
    }

    /// Create the sources tree and the build subdirectories.
    pub fn initialize(&self) -> Result<(), WorkspaceError> {
        fs::create_dir_all(&self.sources)?;
        fs::create_dir_all(self.conf_dir())?;
        fs::create_dir_all(self.downloads_dir())?;
        fs::create_dir_all(self.deploy_dir())?;
        fs::create_dir_all(self.sstate_cache_dir())?;
        Ok(())
    }
}

/// Filesystem-safe directory name for a distribution identifier: every run of
/// non-alphanumeric characters collapses to a single underscore.
pub fn distro_dirname(distro: &str) -> String {
    let mut out = String::with_capacity(distro.len());
    let mut in_run = false;
    for c in distro.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
