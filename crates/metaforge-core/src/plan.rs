use metaforge_git::RepoState;
use metaforge_manifest::{LayerSpec, Revision};
use serde::Serialize;
use std::fmt;

/// Branch a fresh clone is assumed to check out. A declared branch equal to
/// this needs no follow-up after cloning; anything else gets a `Rebranch`,
/// which is a safe no-op if the remote's default happened to match anyway.
pub const DEFAULT_CLONE_BRANCH: &str = "master";

/// One corrective git operation, decided by [`plan_layer`] and executed by the
/// engine. Keeping the decision as data separates the reconciliation logic
/// from process execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Clone the declared repository into the layer path on the remote's
    /// default branch.
    Clone { url: String },
    /// Repoint `origin` at the declared URL and refresh remote-tracking refs.
    SetRemote { url: String },
    /// Create/switch to a local branch tracking `origin/{branch}`. With
    /// `force`, an existing branch is recreated and uncommitted changes are
    /// discarded.
    Rebranch { branch: String, force: bool },
    /// Pull the branch tip forward, rebasing over set-aside local state, then
    /// run housekeeping.
    AdvanceHead,
    /// Move the working tree to the pinned revision. `refresh` additionally
    /// updates remote-tracking refs and sets local modifications aside.
    PinRevision { revision: String, refresh: bool },
    /// Pinned and already satisfied.
    Noop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone { url } => write!(f, "clone {url}"),
            Self::SetRemote { url } => write!(f, "repoint origin at {url}"),
            Self::Rebranch { branch, force } => {
                if *force {
                    write!(f, "force-switch to branch {branch}")
                } else {
                    write!(f, "switch to branch {branch}")
                }
            }
            Self::AdvanceHead => f.write_str("pull branch tip forward"),
            Self::PinRevision { revision, .. } => write!(f, "pin to {revision}"),
            Self::Noop => f.write_str("up to date"),
        }
    }
}

/// Decide the corrective actions for one layer.
///
/// `observed` is the inspected state of the existing clone, or `None` when no
/// clone is present. The returned actions are ordered: remote drift must be
/// fixed before any operation that talks to `origin`, and branch drift before
/// the revision policy is applied.
pub fn plan_layer(spec: &LayerSpec, observed: Option<&RepoState>) -> Vec<Action> {
    match observed {
        None => bootstrap(spec),
        Some(state) => reconcile(spec, state),
    }
}

fn bootstrap(spec: &LayerSpec) -> Vec<Action> {
    let mut actions = vec![Action::Clone {
        url: spec.repository.clone(),
    }];
    if spec.branch != DEFAULT_CLONE_BRANCH {
        actions.push(Action::Rebranch {
            branch: spec.branch.clone(),
            force: false,
        });
    }
    if let Some(revision) = spec.revision.pinned() {
        actions.push(Action::PinRevision {
            revision: revision.to_owned(),
            refresh: false,
        });
    }
    actions
}

fn reconcile(spec: &LayerSpec, state: &RepoState) -> Vec<Action> {
    let mut actions = Vec::new();

    if state.remote_url != spec.repository {
        actions.push(Action::SetRemote {
            url: spec.repository.clone(),
        });
    }

    if state.branch != spec.branch {
        actions.push(Action::Rebranch {
            branch: spec.branch.clone(),
            force: true,
        });
    }

    match &spec.revision {
        Revision::Head => actions.push(Action::AdvanceHead),
        Revision::Pinned(revision) if *revision != state.revision => {
            actions.push(Action::PinRevision {
                revision: revision.clone(),
                refresh: true,
            });
        }
        Revision::Pinned(_) => actions.push(Action::Noop),
    }

    actions
}
