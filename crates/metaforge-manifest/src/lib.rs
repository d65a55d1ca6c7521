//! Layer manifest parsing and layer-group tables for metaforge.
//!
//! This crate defines the declaration side of workspace synchronization: the
//! `LayerSpec` data model with its revision policy (`Revision`), parsers for
//! the flat `layers.txt` manifest and the structured JSON document
//! (`ManifestDoc`), source-precedence resolution (`authoritative_layers`),
//! and the built-in configuration layer-group tables (`LayerGroups`).

pub mod groups;
pub mod layer;
pub mod manifest;

pub use groups::{GroupOverrides, GroupTable, LayerGroups};
pub use layer::{LayerSpec, Revision};
pub use manifest::{
    authoritative_layers, parse_document_file, parse_document_str, parse_layers_file,
    parse_layers_str, Manifest, ManifestDoc, ManifestError,
};
