//! Reconciliation engine for metaforge workspaces.
//!
//! This crate ties manifest declarations, git execution, and the workspace
//! layout together: the pure decision function in `plan` maps declared layer
//! state and observed clone state to a sequence of corrective actions, and the
//! `Engine` executes those actions with per-layer failure isolation. It also
//! provides workspace locking and the interrupt flag checked between layers.

pub mod concurrency;
pub mod engine;
pub mod plan;

pub use concurrency::{install_signal_handler, shutdown_requested, WorkspaceLock};
pub use engine::{Engine, LayerPlan, LayerReport, LayerStatus, PlanReport, SyncReport};
pub use plan::{plan_layer, Action, DEFAULT_CLONE_BRANCH};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] metaforge_manifest::ManifestError),
    #[error("git error: {0}")]
    Git(#[from] metaforge_git::GitError),
    #[error("workspace error: {0}")]
    Workspace(#[from] metaforge_workspace::WorkspaceError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
