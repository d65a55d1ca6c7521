use crate::concurrency::shutdown_requested;
use crate::plan::{plan_layer, Action};
use metaforge_git::{Git, GitError, RepoState, RunResult};
use metaforge_manifest::{LayerSpec, Manifest};
use metaforge_workspace::WorkspaceLayout;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Terminal state of one layer's reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    /// A fresh clone was created.
    Cloned,
    /// Corrective operations were applied to an existing clone.
    Updated,
    /// Pinned and already satisfied; no operations issued.
    UpToDate,
    /// At least one corrective step failed. Remaining steps and layers still
    /// ran.
    Failed,
    /// Not attempted because shutdown was requested earlier in the run.
    Skipped,
}

impl std::fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Cloned => "cloned",
            Self::Updated => "updated",
            Self::UpToDate => "up to date",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub name: String,
    pub status: LayerStatus,
    pub failed_steps: Vec<String>,
    pub stash_conflict: bool,
}

impl LayerReport {
    fn started(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: LayerStatus::UpToDate,
            failed_steps: Vec::new(),
            stash_conflict: false,
        }
    }

    fn skipped(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: LayerStatus::Skipped,
            failed_steps: Vec::new(),
            stash_conflict: false,
        }
    }
}

/// Result of synchronizing a whole manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub layers: Vec<LayerReport>,
    pub interrupted: bool,
}

impl SyncReport {
    pub fn failed_layers(&self) -> impl Iterator<Item = &LayerReport> {
        self.layers
            .iter()
            .filter(|l| l.status == LayerStatus::Failed)
    }

    /// True when every layer reached its declared state.
    pub fn converged(&self) -> bool {
        !self.interrupted
            && self
                .layers
                .iter()
                .all(|l| l.status != LayerStatus::Failed && l.status != LayerStatus::Skipped)
    }
}

/// Dry-run plan for one layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerPlan {
    pub name: String,
    pub actions: Vec<Action>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub layers: Vec<LayerPlan>,
}

/// Executes reconciliation plans against the workspace.
///
/// Each layer is reconciled independently and sequentially, in manifest
/// order. A failure inside one layer is recorded on its report and never
/// prevents the remaining layers from being processed.
pub struct Engine {
    git: Git,
    layout: WorkspaceLayout,
}

impl Engine {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self {
            git: Git::new(),
            layout,
        }
    }

    /// Use a preconfigured git wrapper (timeout, alternate executable).
    pub fn with_git(layout: WorkspaceLayout, git: Git) -> Self {
        Self { git, layout }
    }

    /// Bring every declared layer into conformance with the manifest.
    pub fn sync(&self, manifest: &Manifest) -> SyncReport {
        info!("processing sources repositories");

        let mut layers = Vec::with_capacity(manifest.len());
        let mut interrupted = false;
        for spec in manifest.layers() {
            if !interrupted && shutdown_requested() {
                warn!("shutdown requested; skipping remaining layers");
                interrupted = true;
            }
            if interrupted {
                layers.push(LayerReport::skipped(&spec.name));
            } else {
                layers.push(self.sync_layer(spec));
            }
        }

        let report = SyncReport {
            layers,
            interrupted,
        };
        for failed in report.failed_layers() {
            warn!(
                "layer {} failed at: {}",
                failed.name,
                failed.failed_steps.join(", ")
            );
        }
        report
    }

    /// Compute the per-layer action plans without executing anything.
    pub fn preview(&self, manifest: &Manifest) -> PlanReport {
        let layers = manifest
            .layers()
            .iter()
            .map(|spec| {
                let path = self.layout.layer_path(&spec.name);
                if !path.is_dir() {
                    return LayerPlan {
                        name: spec.name.clone(),
                        actions: plan_layer(spec, None),
                        error: None,
                    };
                }
                match self.git.inspect(&path) {
                    Ok(state) => LayerPlan {
                        name: spec.name.clone(),
                        actions: plan_layer(spec, Some(&state)),
                        error: None,
                    },
                    Err(err) => LayerPlan {
                        name: spec.name.clone(),
                        actions: Vec::new(),
                        error: Some(err.to_string()),
                    },
                }
            })
            .collect();
        PlanReport { layers }
    }

    fn sync_layer(&self, spec: &LayerSpec) -> LayerReport {
        let path = self.layout.layer_path(&spec.name);
        let mut report = LayerReport::started(&spec.name);

        let observed = if path.is_dir() {
            info!("checking repository {}", spec.name);
            match self.git.inspect(&path) {
                Ok(state) => Some(state),
                Err(err) => {
                    warn!("cannot inspect {}: {err}", spec.name);
                    report.status = LayerStatus::Failed;
                    report.failed_steps.push("inspect".to_owned());
                    return report;
                }
            }
        } else {
            None
        };

        let actions = plan_layer(spec, observed.as_ref());
        warn_drift(spec, observed.as_ref());

        for action in &actions {
            self.apply(spec, &path, action, &mut report);
        }

        report.status = if report.failed_steps.is_empty() {
            if actions.iter().any(|a| matches!(a, Action::Clone { .. })) {
                LayerStatus::Cloned
            } else if actions.iter().all(|a| *a == Action::Noop) {
                LayerStatus::UpToDate
            } else {
                LayerStatus::Updated
            }
        } else {
            LayerStatus::Failed
        };
        report
    }

    fn apply(&self, spec: &LayerSpec, path: &Path, action: &Action, report: &mut LayerReport) {
        match action {
            Action::Clone { url } => {
                info!("cloning repository {}", spec.name);
                self.step(report, "clone", self.git.clone_repo(url, path));
            }
            Action::SetRemote { url } => {
                self.step(report, "remote set-url", self.git.set_remote_url(path, url));
                self.step(report, "remote update", self.git.remote_update(path));
            }
            Action::Rebranch { branch, force } => {
                self.step(
                    report,
                    "checkout -b",
                    self.git.checkout_track(path, branch, *force),
                );
                if *force {
                    self.step(report, "checkout", self.git.checkout(path, branch, true));
                }
            }
            Action::AdvanceHead => {
                let stashed = self.set_aside(path, report);
                self.step(report, "pull --rebase", self.git.pull_rebase(path));
                if stashed {
                    self.restore(spec, path, report);
                }
                self.step(report, "gc", self.git.gc(path));
                self.step(report, "remote prune", self.git.remote_prune(path));
            }
            Action::PinRevision { revision, refresh } => {
                info!("updating {} to {revision}", spec.name);
                if *refresh {
                    self.step(report, "remote update", self.git.remote_update(path));
                    let stashed = self.set_aside(path, report);
                    self.step(report, "reset --hard", self.git.reset_hard(path, revision));
                    if stashed {
                        self.restore(spec, path, report);
                    }
                } else {
                    self.step(report, "reset --hard", self.git.reset_hard(path, revision));
                }
            }
            Action::Noop => {
                if let Some(revision) = spec.revision.pinned() {
                    info!("{} fixed to revision {revision}, skipping update", spec.name);
                }
            }
        }
    }

    /// Stash uncommitted modifications. Returns true only when the stash
    /// actually recorded something, so a pointless `stash pop` (and the false
    /// conflict warning it would raise) is avoided.
    fn set_aside(&self, path: &Path, report: &mut LayerReport) -> bool {
        let before = self.stash_tip(path);
        self.step(report, "stash", self.git.stash(path));
        let after = self.stash_tip(path);
        after.is_some() && after != before
    }

    fn restore(&self, spec: &LayerSpec, path: &Path, report: &mut LayerReport) {
        match self.git.stash_pop(path) {
            Ok(result) if result.success() => {}
            Ok(_) => {
                warn!(
                    "{}: set-aside local modifications could not be reapplied cleanly; \
                     they remain in the stash",
                    spec.name
                );
                report.stash_conflict = true;
            }
            Err(err) => {
                warn!("{}: stash pop failed: {err}", spec.name);
                report.failed_steps.push("stash pop".to_owned());
            }
        }
    }

    fn stash_tip(&self, path: &Path) -> Option<String> {
        self.git.stash_ref(path).ok().flatten()
    }

    fn step(
        &self,
        report: &mut LayerReport,
        name: &str,
        result: Result<RunResult, GitError>,
    ) -> bool {
        match result {
            Ok(r) if r.success() => true,
            Ok(r) if r.timed_out => {
                warn!("{}: git {name} timed out", report.name);
                report.failed_steps.push(name.to_owned());
                false
            }
            Ok(r) => {
                warn!(
                    "{}: git {name} exited with status {:?}",
                    report.name, r.code
                );
                report.failed_steps.push(name.to_owned());
                false
            }
            Err(err) => {
                warn!("{}: git {name} failed: {err}", report.name);
                report.failed_steps.push(name.to_owned());
                false
            }
        }
    }
}

fn warn_drift(spec: &LayerSpec, observed: Option<&RepoState>) {
    let Some(state) = observed else { return };
    if state.remote_url != spec.repository {
        warn!(
            "{} is using a different uri \"{}\" than declared \"{}\"",
            spec.name, state.remote_url, spec.repository
        );
        warn!("changing uri to \"{}\"", spec.repository);
    }
    if state.branch != spec.branch {
        warn!(
            "{} is using a different branch \"{}\" than declared \"{}\"",
            spec.name, state.branch, spec.branch
        );
        warn!("changing branch to \"{}\"", spec.branch);
    }
}
