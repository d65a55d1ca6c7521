use super::{absolutize, json_pretty, load_manifest, EXIT_SUCCESS};
use metaforge_core::Engine;
use metaforge_workspace::WorkspaceLayout;
use std::path::Path;

pub fn run(
    sources: &Path,
    layers: Option<&Path>,
    bblayers: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let root = std::env::current_dir().map_err(|e| format!("cannot determine cwd: {e}"))?;
    let sources_dir = absolutize(sources)?;
    let inputs = load_manifest(&sources_dir, layers, bblayers)?;

    // The build directory is irrelevant to planning; only layer paths are
    // inspected, and nothing is created or executed.
    let layout = WorkspaceLayout::new(&root, &sources_dir, root.join("build"));
    let engine = Engine::new(layout);
    let report = engine.preview(&inputs.manifest);

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    if report.layers.is_empty() {
        println!("no layers declared");
        return Ok(EXIT_SUCCESS);
    }
    for layer in &report.layers {
        if let Some(error) = &layer.error {
            println!("{}: cannot inspect ({error})", layer.name);
            continue;
        }
        let actions: Vec<String> = layer.actions.iter().map(ToString::to_string).collect();
        println!("{}: {}", layer.name, actions.join(", "));
    }
    Ok(EXIT_SUCCESS)
}
