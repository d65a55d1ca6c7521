use crate::layout::{distro_dirname, WorkspaceLayout};
use crate::WorkspaceError;
use metaforge_manifest::LayerGroups;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Version stamp written into the environment script.
pub const SCRIPTS_BASE_VERSION: u32 = 0;

/// Host environment variables whitelisted through to BitBake.
const BB_ENV_WHITELIST: &[&str] = &[
    "MACHINE",
    "DISTRO",
    "TCLIBC",
    "TCMODE",
    "GIT_PROXY_COMMAND",
    "http_proxy",
    "ftp_proxy",
    "https_proxy",
    "all_proxy",
    "ALL_PROXY",
    "no_proxy",
    "SSH_AGENT_PID",
    "SSH_AUTH_SOCK",
    "BB_SRCREV_POLICY",
    "SDKMACHINE",
    "BB_NUMBER_THREADS",
];

/// Scalar build parameters every configuration file is rendered from.
#[derive(Debug, Clone)]
pub struct BuildParams {
    pub machine: String,
    pub distro: String,
}

impl BuildParams {
    pub fn new(machine: impl Into<String>, distro: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            distro: distro.into(),
        }
    }

    pub fn distro_dirname(&self) -> String {
        distro_dirname(&self.distro)
    }
}

/// The sourceable environment script placed at the workspace root.
///
/// `host_path` is the caller's current `PATH`; the OE-core scripts and
/// bitbake binaries from the sources tree are prepended to it.
pub fn render_environment(
    layout: &WorkspaceLayout,
    params: &BuildParams,
    layers_path: &Path,
    host_path: &str,
) -> String {
    let sources = layout.sources_dir();
    let build = layout.build_dir();
    let dirname = params.distro_dirname();

    let path = format!(
        "{}:{}:{host_path}",
        sources.join("openembedded-core").join("scripts").display(),
        sources.join("bitbake").join("bin").display(),
    );
    let bbpath = format!(
        "{}:{}",
        build.display(),
        sources.join("openembedded-core").join("meta").display(),
    );

    format!(
        r#"export SCRIPTS_BASE_VERSION={SCRIPTS_BASE_VERSION}
export BBFETCH2=True
export DISTRO="{distro}"
export DISTRO_DIRNAME="{dirname}"
export OE_BUILD_DIR="{build}"
export BUILDDIR="{build}"
export OE_BUILD_TMPDIR="{tmp}"
export OE_SOURCE_DIR="{sources}"
export OE_LAYERS_TXT="{layers}"
export OE_BASE="{build}"
export PATH="{path}"
export BB_ENV_EXTRAWHITE="{whitelist}"
export BBPATH="{bbpath}"
"#,
        distro = params.distro,
        build = build.display(),
        tmp = layout.build_tmp_dir(&dirname).display(),
        sources = sources.display(),
        layers = layers_path.display(),
        whitelist = BB_ENV_WHITELIST.join(" "),
    )
}

pub fn render_auto_conf(params: &BuildParams) -> String {
    format!("MACHINE ?= \"{}\"\n", params.machine)
}

/// `bblayers.conf`: the five layer-group sections rendered as absolute paths
/// under the sources tree, in group-table order.
pub fn render_bblayers_conf(layout: &WorkspaceLayout, groups: &LayerGroups) -> String {
    format!(
        r#"LCONF_VERSION = "5"

BBPATH = "{bbpath}"

BBFILES = ""

# These layers hold recipe metadata not found in OE-core, but lack any machine or distro content
BASELAYERS ?= " \
{base}"

# These layers hold machine specific content, aka Board Support Packages
BSPLAYERS ?= " \
{bsp}"

# Add your overlay location to EXTRALAYERS
# Make sure to have a conf/layers.conf in there
EXTRALAYERS ?= " \
{extra}"

OS_LAYERS ?= " \
{os}"

OE_CORE_LAYERS ?= " \
{oe_core}"

BBLAYERS = " \
  ${{OS_LAYERS}} \
  ${{BASELAYERS}} \
  ${{BSPLAYERS}} \
  ${{EXTRALAYERS}} \
  ${{OE_CORE_LAYERS}} \
"
"#,
        bbpath = layout.build_dir().display(),
        base = group_section(layout, &groups.base),
        bsp = group_section(layout, &groups.bsp),
        extra = group_section(layout, &groups.extra),
        os = group_section(layout, &groups.os),
        oe_core = group_section(layout, &groups.oe_core),
    )
}

fn group_section(layout: &WorkspaceLayout, table: &[(String, String)]) -> String {
    let mut out = String::new();
    for (_name, rel) in table {
        let _ = writeln!(out, "  {} \\", layout.sources_dir().join(rel).display());
    }
    out
}

pub fn render_local_conf(layout: &WorkspaceLayout, params: &BuildParams) -> String {
    format!(
        r#"CONF_VERSION = "1"

INHERIT += "rm_work"

BBMASK = ""

IMAGE_FSTYPES_append = " tar.xz"
IMAGE_FSTYPES_remove = "tar.gz"

NOISO = "1"

# Avoid dragging in core-image-minimal-initramfs, which drags in grub which in turn fails to build
INITRD_IMAGE = "small-image"

PARALLEL_MAKE     = "-j2"
BB_NUMBER_THREADS = "2"

DISTRO = "{distro}"

MACHINE ??= "{machine}"

DEPLOY_DIR = "{deploy}/${{TCLIBC}}"
# Don't generate the mirror tarball for SCM repos, the snapshot is enough
BB_GENERATE_MIRROR_TARBALLS = "0"

# Disable build time patch resolution. This would lauch a devshell
# and wait for manual intervention. We disable it.
PATCHRESOLVE = "noop"

# enable PR service on build machine itself
# its good for a case when this is the only builder
# generating the feeds
#
PRSERV_HOST = "localhost:0"
"#,
        distro = params.distro,
        machine = params.machine,
        deploy = layout.deploy_dir().display(),
    )
}

pub fn render_site_conf(layout: &WorkspaceLayout, params: &BuildParams) -> String {
    format!(
        r#"SCONF_VERSION = "1"

DL_DIR = "{downloads}"

SSTATE_DIR = "{sstate}"

BBFILES ?= "{bbfiles}"

TMPDIR = "{tmp}"
"#,
        downloads = layout.downloads_dir().display(),
        sstate = layout.sstate_cache_dir().display(),
        bbfiles = layout
            .sources_dir()
            .join("openembedded-core/meta/recipes-*/*/*.bb")
            .display(),
        tmp = layout.build_tmp_dir(&params.distro_dirname()).display(),
    )
}

/// Write `content` to `path` unless a file is already there; with `overwrite`
/// an existing file is removed first. Returns whether the file was written.
pub fn write_unless_present(
    path: &Path,
    content: &str,
    overwrite: bool,
) -> Result<bool, WorkspaceError> {
    if overwrite && path.is_file() {
        debug!("overwriting {}", path.display());
        fs::remove_file(path)?;
    }
    if path.exists() {
        debug!("keeping existing {}", path.display());
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}
