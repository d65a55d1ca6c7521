//! Workspace layout and build-configuration rendering for metaforge.
//!
//! `WorkspaceLayout` owns every path the tool touches: the sources tree the
//! layers are cloned into, the build directory with its `conf/`, `downloads/`,
//! `deploy/` and `sstate-cache/` subdirectories, and the environment script at
//! the workspace root. `render` turns the effective layer groups and scalar
//! build parameters into the fixed set of configuration files.

pub mod layout;
pub mod render;

pub use layout::{distro_dirname, WorkspaceLayout};
pub use render::{
    render_auto_conf, render_bblayers_conf, render_environment, render_local_conf,
    render_site_conf, write_unless_present, BuildParams,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}
