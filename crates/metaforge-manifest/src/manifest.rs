use crate::groups::GroupOverrides;
use crate::layer::{LayerSpec, Revision};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest document: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("malformed manifest line {line}: expected 'name,repository,branch,revision', got '{text}'")]
    MalformedLine { line: usize, text: String },
    #[error("manifest line {line}: {field} must not be empty")]
    EmptyField { line: usize, field: &'static str },
    #[error("duplicate layer '{0}' in manifest")]
    DuplicateLayer(String),
    #[error("manifest document: {0}")]
    Document(String),
}

/// The authoritative, ordered layer declaration list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    layers: Vec<LayerSpec>,
}

impl Manifest {
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self { layers }
    }

    /// Layers in declaration order.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn get(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// The structured manifest document: an optional `repositories` mapping plus
/// optional layer-group overrides for configuration rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDoc {
    pub repositories: Option<Manifest>,
    pub groups: GroupOverrides,
}

/// Parse the flat manifest form: one `name,repository,branch,revision` line
/// per layer, surrounding whitespace trimmed, blank lines ignored.
pub fn parse_layers_str(input: &str) -> Result<Manifest, ManifestError> {
    let mut layers = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let [name, repository, branch, revision] = fields.as_slice() else {
            return Err(ManifestError::MalformedLine {
                line,
                text: text.to_owned(),
            });
        };

        for (field, value) in [
            ("name", name),
            ("repository", repository),
            ("branch", branch),
            ("revision", revision),
        ] {
            if value.is_empty() {
                return Err(ManifestError::EmptyField { line, field });
            }
        }
        if !seen.insert((*name).to_owned()) {
            return Err(ManifestError::DuplicateLayer((*name).to_owned()));
        }

        layers.push(LayerSpec::new(
            *name,
            *repository,
            *branch,
            Revision::parse(revision),
        ));
    }

    Ok(Manifest::new(layers))
}

pub fn parse_layers_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_layers_str(&content)
}

/// Parse the structured JSON document form.
///
/// `repositories` maps layer name to a `[repository, branch, revision]`
/// array; `layers` may override any of the five configuration group tables.
/// Key order in both mappings is preserved.
pub fn parse_document_str(input: &str) -> Result<ManifestDoc, ManifestError> {
    let value: Value = serde_json::from_str(input)?;
    let root = value
        .as_object()
        .ok_or_else(|| ManifestError::Document("top level must be an object".to_owned()))?;

    let repositories = root.get("repositories").map(parse_repositories).transpose()?;

    let groups = match root.get("layers") {
        Some(layers) => parse_group_overrides(layers)?,
        None => GroupOverrides::default(),
    };

    Ok(ManifestDoc {
        repositories,
        groups,
    })
}

pub fn parse_document_file(path: impl AsRef<Path>) -> Result<ManifestDoc, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_document_str(&content)
}

/// Resolve manifest-source precedence: a supplied flat manifest is
/// authoritative; the document's `repositories` section is consulted only
/// when no flat manifest was given. The two are never merged.
pub fn authoritative_layers(flat: Option<Manifest>, doc: Option<&ManifestDoc>) -> Manifest {
    if let Some(manifest) = flat {
        return manifest;
    }
    doc.and_then(|d| d.repositories.clone()).unwrap_or_default()
}

fn parse_repositories(value: &Value) -> Result<Manifest, ManifestError> {
    let map = value
        .as_object()
        .ok_or_else(|| ManifestError::Document("'repositories' must be an object".to_owned()))?;

    let mut layers = Vec::with_capacity(map.len());
    for (name, entry) in map {
        if name.is_empty() {
            return Err(ManifestError::Document(
                "repository name must not be empty".to_owned(),
            ));
        }
        let fields = entry.as_array().ok_or_else(|| {
            ManifestError::Document(format!(
                "repository '{name}' must be a [repository, branch, revision] array"
            ))
        })?;
        let [repository, branch, revision] = fields.as_slice() else {
            return Err(ManifestError::Document(format!(
                "repository '{name}' must have exactly three entries"
            )));
        };
        let repository = string_entry(name, "repository", repository)?;
        let branch = string_entry(name, "branch", branch)?;
        let revision = string_entry(name, "revision", revision)?;

        if layers.iter().any(|l: &LayerSpec| l.name == *name) {
            return Err(ManifestError::DuplicateLayer(name.clone()));
        }
        layers.push(LayerSpec::new(
            name.clone(),
            repository,
            branch,
            Revision::parse(&revision),
        ));
    }

    Ok(Manifest::new(layers))
}

fn string_entry(layer: &str, field: &str, value: &Value) -> Result<String, ManifestError> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ManifestError::Document(format!(
                "repository '{layer}' {field} must be a non-empty string"
            ))
        })
}

fn parse_group_overrides(value: &Value) -> Result<GroupOverrides, ManifestError> {
    let map = value
        .as_object()
        .ok_or_else(|| ManifestError::Document("'layers' must be an object".to_owned()))?;

    let mut overrides = GroupOverrides::default();
    for (key, table) in map {
        let parsed = parse_group_table(key, table)?;
        match key.as_str() {
            "base" => overrides.base = Some(parsed),
            "bsp" => overrides.bsp = Some(parsed),
            "extra" => overrides.extra = Some(parsed),
            "os" => overrides.os = Some(parsed),
            "oe_core" => overrides.oe_core = Some(parsed),
            other => {
                return Err(ManifestError::Document(format!(
                    "unknown layer group '{other}' (expected base, bsp, extra, os, or oe_core)"
                )));
            }
        }
    }
    Ok(overrides)
}

fn parse_group_table(group: &str, value: &Value) -> Result<Vec<(String, String)>, ManifestError> {
    let map = value
        .as_object()
        .ok_or_else(|| ManifestError::Document(format!("layer group '{group}' must be an object")))?;

    let mut table = Vec::with_capacity(map.len());
    for (name, path) in map {
        let path = path.as_str().filter(|s| !s.is_empty()).ok_or_else(|| {
            ManifestError::Document(format!(
                "layer group '{group}' entry '{name}' must be a non-empty path string"
            ))
        })?;
        table.push((name.clone(), path.to_owned()));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_flat_manifest_in_order() {
        let input = "\
meta-oe,https://example/meta-openembedded.git,master,HEAD
meta-ti,https://example/meta-ti.git,master,abc123
";
        let manifest = parse_layers_str(input).expect("should parse");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.layers()[0].name, "meta-oe");
        assert_eq!(manifest.layers()[1].name, "meta-ti");
        assert!(manifest.layers()[0].revision.is_head());
        assert_eq!(manifest.layers()[1].revision.pinned(), Some("abc123"));
    }

    #[test]
    fn trims_surrounding_whitespace_and_skips_blank_lines() {
        let input = "  meta-oe , https://example/repo.git , master , HEAD  \n\n\n";
        let manifest = parse_layers_str(input).unwrap();
        assert_eq!(manifest.len(), 1);
        let layer = &manifest.layers()[0];
        assert_eq!(layer.name, "meta-oe");
        assert_eq!(layer.repository, "https://example/repo.git");
        assert_eq!(layer.branch, "master");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_layers_str("meta-oe,https://example/repo.git,master").unwrap_err();
        assert!(matches!(err, ManifestError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn rejects_empty_fields() {
        let err = parse_layers_str("meta-oe,,master,HEAD").unwrap_err();
        assert!(matches!(
            err,
            ManifestError::EmptyField {
                field: "repository",
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_layer_names() {
        let input = "\
meta-oe,https://example/a.git,master,HEAD
meta-oe,https://example/b.git,master,HEAD
";
        let err = parse_layers_str(input).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateLayer(name) if name == "meta-oe"));
    }

    #[test]
    fn parses_layers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "meta-oe,https://example/repo.git,master,HEAD").unwrap();
        let manifest = parse_layers_file(file.path()).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn parses_document_repositories_in_order() {
        let input = r#"{
            "repositories": {
                "meta-zzz": ["https://example/zzz.git", "master", "HEAD"],
                "meta-aaa": ["https://example/aaa.git", "dev", "abc123"]
            }
        }"#;
        let doc = parse_document_str(input).unwrap();
        let repos = doc.repositories.expect("repositories present");
        // Document order, not lexicographic order.
        assert_eq!(repos.layers()[0].name, "meta-zzz");
        assert_eq!(repos.layers()[1].name, "meta-aaa");
        assert_eq!(repos.layers()[1].branch, "dev");
    }

    #[test]
    fn parses_document_group_overrides() {
        let input = r#"{
            "layers": {
                "base": {"meta-custom": "meta-custom"},
                "oe_core": {"meta": "openembedded-core/meta"}
            }
        }"#;
        let doc = parse_document_str(input).unwrap();
        assert_eq!(
            doc.groups.base.as_deref(),
            Some(&[("meta-custom".to_owned(), "meta-custom".to_owned())][..])
        );
        assert!(doc.groups.bsp.is_none());
        assert!(doc.repositories.is_none());
    }

    #[test]
    fn rejects_unknown_group_key() {
        let input = r#"{"layers": {"bogus": {}}}"#;
        let err = parse_document_str(input).unwrap_err();
        assert!(matches!(err, ManifestError::Document(msg) if msg.contains("bogus")));
    }

    #[test]
    fn rejects_malformed_repository_entry() {
        let input = r#"{"repositories": {"meta-oe": ["https://example/repo.git", "master"]}}"#;
        assert!(parse_document_str(input).is_err());
    }

    #[test]
    fn flat_manifest_takes_precedence_over_document() {
        let flat = parse_layers_str("meta-flat,https://example/flat.git,master,HEAD").unwrap();
        let doc = parse_document_str(
            r#"{"repositories": {"meta-doc": ["https://example/doc.git", "master", "HEAD"]}}"#,
        )
        .unwrap();

        let layers = authoritative_layers(Some(flat), Some(&doc));
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.layers()[0].name, "meta-flat");
    }

    #[test]
    fn document_repositories_used_without_flat_manifest() {
        let doc = parse_document_str(
            r#"{"repositories": {"meta-doc": ["https://example/doc.git", "master", "HEAD"]}}"#,
        )
        .unwrap();
        let layers = authoritative_layers(None, Some(&doc));
        assert_eq!(layers.layers()[0].name, "meta-doc");
    }

    #[test]
    fn no_source_yields_empty_manifest() {
        assert!(authoritative_layers(None, None).is_empty());
    }
}
