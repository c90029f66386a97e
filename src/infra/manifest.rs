// ============================================================
// Layer 6 — Validation Manifest
// ============================================================
// The validation split of a run as a JSON array of
// [mixture, instrumental] path pairs:
//
//   [["mix/a.wav", "inst/a.wav"], ["mix/b.wav", "inst/b.wav"]]
//
// Written as val_<timestamp>.json at the start of every run and
// accepted back through --val_filelist, so later runs can be
// evaluated on exactly the same tracks.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::file_pair::FilePair;

/// Read a manifest. A missing path is an error, an empty array is not.
pub fn read_manifest(path: &Path) -> Result<Vec<FilePair>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read validation file list '{}'", path.display()))?;
    let pairs: Vec<FilePair> = serde_json::from_str(&json)
        .with_context(|| format!("Malformed validation file list '{}'", path.display()))?;

    tracing::info!("Read {} validation pairs from '{}'", pairs.len(), path.display());
    Ok(pairs)
}

/// Write `pairs` as `val_<timestamp>.json` in `dir`.
pub fn write_manifest(dir: &Path, timestamp: &str, pairs: &[FilePair]) -> Result<PathBuf> {
    let path = dir.join(format!("val_{timestamp}.json"));
    let json = serde_json::to_string(pairs)?;

    fs::write(&path, json)
        .with_context(|| format!("Cannot write validation file list '{}'", path.display()))?;

    tracing::debug!("Wrote validation file list '{}'", path.display());
    Ok(path)
}
