use super::{absolutize, EXIT_FAILURE, EXIT_SUCCESS};
use metaforge_core::WorkspaceLock;
use metaforge_git::Git;
use metaforge_workspace::WorkspaceLayout;
use std::path::Path;

pub fn run(sources: &Path, build: &Path, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    match Git::new().version() {
        Ok(result) if result.success() => {
            checks.push(Check::pass("git", result.output.trim()));
        }
        Ok(result) => {
            all_pass = false;
            checks.push(Check::fail(
                "git",
                &format!("git --version exited with status {:?}", result.code),
            ));
        }
        Err(err) => {
            all_pass = false;
            checks.push(Check::fail("git", &format!("git is not available: {err}")));
        }
    }

    let root = std::env::current_dir().map_err(|e| format!("cannot determine cwd: {e}"))?;
    let layout = WorkspaceLayout::new(root, absolutize(sources)?, absolutize(build)?);

    check_dir(&mut checks, &mut all_pass, "sources", layout.sources_dir());
    check_dir(&mut checks, &mut all_pass, "build", layout.build_dir());

    match WorkspaceLock::try_acquire(&layout.lock_file()) {
        Ok(Some(_)) => checks.push(Check::pass("lock", "Workspace lock is free")),
        Ok(None) => checks.push(Check::warn(
            "lock",
            "Workspace lock is held by another process",
        )),
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("lock", &format!("Cannot check lock: {e}")));
        }
    }

    let layers_txt = layout.sources_dir().join("layers.txt");
    if layers_txt.is_file() {
        match metaforge_manifest::parse_layers_file(&layers_txt) {
            Ok(manifest) => checks.push(Check::pass(
                "manifest",
                &format!("{} declares {} layers", layers_txt.display(), manifest.len()),
            )),
            Err(e) => {
                all_pass = false;
                checks.push(Check::fail("manifest", &format!("{e}")));
            }
        }
    } else {
        checks.push(Check::info(
            "manifest",
            "No layers.txt in the sources directory (pass --layers or --bblayers)",
        ));
    }

    print_results(&checks, all_pass, json_output)
}

fn check_dir(checks: &mut Vec<Check>, all_pass: &mut bool, name: &str, dir: &Path) {
    if dir.is_dir() {
        let probe = dir.join(".metaforge-doctor");
        match std::fs::write(&probe, b"") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                checks.push(Check::pass(name, &format!("{name} directory is writable")));
            }
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail(
                    name,
                    &format!("{name} directory is not writable: {e}"),
                ));
            }
        }
    } else {
        checks.push(Check::info(
            name,
            &format!("{name} directory does not exist yet (created on setup)"),
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Metaforge Doctor\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "pass".to_owned(),
            message: message.to_owned(),
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "fail".to_owned(),
            message: message.to_owned(),
        }
    }

    fn warn(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "warn".to_owned(),
            message: message.to_owned(),
        }
    }

    fn info(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "info".to_owned(),
            message: message.to_owned(),
        }
    }
}
