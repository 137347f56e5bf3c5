//! Plugin-file JSON loading and directory scanning (spec §1 "out of
//! scope" for the core crates - the narrow interface they consume is
//! just a `PluginFile`; actually reading it off disk is wiring).

use anyhow::{Context, Result};
use gatekeeper_protocol::tool::{PluginFile, ToolDescriptor};
use std::path::Path;

/// Loads `path` as either a single plugin JSON file, or a directory of
/// `*.json` plugin files whose `tools` arrays are concatenated. Entries
/// are read in sorted filename order so a multi-file catalog's shape is
/// deterministic across runs.
pub fn load(path: &Path) -> Result<PluginFile> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

fn load_file(path: &Path) -> Result<PluginFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading plugin file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing plugin file {}", path.display()))
}

fn load_dir(dir: &Path) -> Result<PluginFile> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("scanning plugin directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    let mut tools: Vec<ToolDescriptor> = Vec::new();
    for entry in entries {
        tools.extend(load_file(&entry)?.tools);
    }
    Ok(PluginFile { tools })
}
