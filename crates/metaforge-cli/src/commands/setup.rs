use super::{absolutize, json_pretty, load_manifest, ManifestSources, EXIT_SUCCESS};
use metaforge_core::{Engine, SyncReport, WorkspaceLock};
use metaforge_git::Git;
use metaforge_manifest::LayerGroups;
use metaforge_workspace::{
    render_auto_conf, render_bblayers_conf, render_environment, render_local_conf,
    render_site_conf, write_unless_present, BuildParams, WorkspaceLayout,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub struct SetupArgs {
    pub machine: String,
    pub distro: String,
    pub sources: PathBuf,
    pub build: PathBuf,
    pub layers: Option<PathBuf>,
    pub bblayers: Option<PathBuf>,
    pub overwrite: bool,
    pub timeout: Option<u64>,
    pub json: bool,
}

pub fn run(args: &SetupArgs) -> Result<u8, String> {
    let root = std::env::current_dir().map_err(|e| format!("cannot determine cwd: {e}"))?;
    let sources_dir = absolutize(&args.sources)?;
    let build_dir = absolutize(&args.build)?;

    // Manifest problems abort before any repository or filesystem work.
    let inputs = load_manifest(&sources_dir, args.layers.as_deref(), args.bblayers.as_deref())?;
    for layer in inputs.manifest.layers() {
        tracing::debug!(
            "{}: {} {} {}",
            layer.name,
            layer.repository,
            layer.branch,
            layer.revision
        );
    }

    let layout = WorkspaceLayout::new(root, sources_dir, build_dir);
    layout.initialize().map_err(|e| e.to_string())?;

    let _lock = WorkspaceLock::acquire(&layout.lock_file())
        .map_err(|e| format!("workspace lock: {e}"))?;

    let git = Git::new().with_timeout(args.timeout.map(Duration::from_secs));
    let engine = Engine::with_git(layout.clone(), git);
    let report = engine.sync(&inputs.manifest);

    write_configuration(&layout, args, &inputs)?;

    info!("done");
    print_summary(&report, args.json)
}

fn write_configuration(
    layout: &WorkspaceLayout,
    args: &SetupArgs,
    inputs: &ManifestSources,
) -> Result<(), String> {
    let params = BuildParams::new(&args.machine, &args.distro);
    let dirname = params.distro_dirname();
    let groups = LayerGroups::resolve(&inputs.groups);

    info!("initializing environment");
    let layers_path = absolutize(&inputs.layers_path)?;
    let host_path = std::env::var("PATH").unwrap_or_default();
    let env_script = render_environment(layout, &params, &layers_path, &host_path);
    let written = write_unless_present(
        &layout.env_file(&dirname, &args.machine),
        &env_script,
        args.overwrite,
    )
    .map_err(|e| e.to_string())?;
    if written {
        info!("writing environment script");
    }

    info!("writing configuration");
    let conf = layout.conf_dir();
    let files = [
        ("auto.conf", render_auto_conf(&params)),
        ("bblayers.conf", render_bblayers_conf(layout, &groups)),
        ("local.conf", render_local_conf(layout, &params)),
        ("site.conf", render_site_conf(layout, &params)),
    ];
    for (name, content) in files {
        let written = write_unless_present(&conf.join(name), &content, args.overwrite)
            .map_err(|e| e.to_string())?;
        if written {
            info!("writing {name}");
        }
    }
    Ok(())
}

fn print_summary(report: &SyncReport, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(report)?);
    } else {
        for layer in &report.layers {
            println!("{}: {}", layer.name, layer.status);
        }
    }
    // Per-layer failures are isolated and already logged; only configuration
    // and manifest errors change the exit status.
    Ok(EXIT_SUCCESS)
}
