pub mod completions;
pub mod doctor;
pub mod man_pages;
pub mod plan;
pub mod setup;

use metaforge_manifest::{
    authoritative_layers, parse_document_file, parse_layers_file, GroupOverrides, Manifest,
};
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_MANIFEST_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// The fully resolved manifest inputs of one run.
#[derive(Debug)]
pub struct ManifestSources {
    pub manifest: Manifest,
    pub groups: GroupOverrides,
    /// The flat manifest path recorded in the environment script.
    pub layers_path: PathBuf,
}

/// Load and resolve the manifest sources.
///
/// An explicitly given flat manifest must exist; the default
/// `<sources>/layers.txt` is used when present. With neither a flat manifest
/// nor a structured document available, the run cannot proceed. Parse errors
/// abort before any repository work.
pub fn load_manifest(
    sources_dir: &Path,
    layers: Option<&Path>,
    bblayers: Option<&Path>,
) -> Result<ManifestSources, String> {
    let layers_path =
        layers.map_or_else(|| sources_dir.join("layers.txt"), Path::to_path_buf);

    if layers.is_some() && !layers_path.is_file() {
        return Err(format!(
            "configuration error: manifest {} does not exist",
            layers_path.display()
        ));
    }
    let flat = if layers_path.is_file() {
        info!("parsing {}", layers_path.display());
        Some(parse_layers_file(&layers_path).map_err(|e| format!("manifest error: {e}"))?)
    } else {
        None
    };

    let doc = match bblayers {
        Some(path) => {
            info!("parsing {}", path.display());
            Some(parse_document_file(path).map_err(|e| format!("manifest error: {e}"))?)
        }
        None => None,
    };

    if flat.is_none() && doc.is_none() {
        return Err(format!(
            "configuration error: no manifest source; create {} or pass --layers/--bblayers",
            layers_path.display()
        ));
    }

    let groups = match &doc {
        Some(d) => d.groups.clone(),
        None => GroupOverrides::default(),
    };
    let manifest = authoritative_layers(flat, doc.as_ref());

    Ok(ManifestSources {
        manifest,
        groups,
        layers_path,
    })
}

/// Anchor a possibly relative CLI path at the current working directory.
pub fn absolutize(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| format!("cannot determine cwd: {e}"))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
        assert_ne!(EXIT_CONFIG_ERROR, EXIT_MANIFEST_ERROR);
    }

    #[test]
    fn json_pretty_serializes() {
        let val = serde_json::json!({"key": "value"});
        let out = json_pretty(&val).unwrap();
        assert!(out.contains("\"key\""));
    }

    #[test]
    fn missing_manifest_source_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path(), None, None).unwrap_err();
        assert!(err.starts_with("configuration error:"));
    }

    #[test]
    fn default_layers_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("layers.txt")).unwrap();
        writeln!(file, "meta-oe,https://example/meta-oe.git,master,HEAD").unwrap();

        let sources = load_manifest(dir.path(), None, None).unwrap();
        assert_eq!(sources.manifest.len(), 1);
        assert_eq!(sources.layers_path, dir.path().join("layers.txt"));
    }

    #[test]
    fn malformed_flat_manifest_is_a_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.txt");
        std::fs::write(&path, "not a manifest line\n").unwrap();

        let err = load_manifest(dir.path(), Some(&path), None).unwrap_err();
        assert!(err.starts_with("manifest error:"));
    }

    #[test]
    fn flat_manifest_wins_over_document_repositories() {
        let dir = tempfile::tempdir().unwrap();
        let flat = dir.path().join("layers.txt");
        std::fs::write(&flat, "meta-flat,https://example/flat.git,master,HEAD\n").unwrap();
        let doc = dir.path().join("bblayers.json");
        std::fs::write(
            &doc,
            r#"{"repositories": {"meta-doc": ["https://example/doc.git", "master", "HEAD"]}}"#,
        )
        .unwrap();

        let sources = load_manifest(dir.path(), Some(&flat), Some(&doc)).unwrap();
        assert_eq!(sources.manifest.len(), 1);
        assert_eq!(sources.manifest.layers()[0].name, "meta-flat");
    }

    #[test]
    fn document_alone_supplies_layers_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("bblayers.json");
        std::fs::write(
            &doc,
            r#"{
                "repositories": {"meta-doc": ["https://example/doc.git", "master", "HEAD"]},
                "layers": {"base": {"meta-doc": "meta-doc"}}
            }"#,
        )
        .unwrap();

        let sources = load_manifest(dir.path(), None, Some(&doc)).unwrap();
        assert_eq!(sources.manifest.layers()[0].name, "meta-doc");
        assert!(sources.groups.base.is_some());
    }
}
