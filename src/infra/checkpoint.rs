// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores mask-estimator weights with Burn's
// CompactRecorder, and writes the run configuration next to
// them.
//
// Layout under the output directory:
//   models/
//     model_iter0.mpk      ← best weights seen during epoch 0
//     model_iter3.mpk      ← ... during epoch 3
//   config_<timestamp>.json ← the TrainConfig of the run
//
// A checkpoint is written only when validation loss improves,
// and every improvement within an epoch overwrites that epoch's
// file, so each model_iter{epoch} holds the best weights found
// in that epoch.
//
// CompactRecorder appends its own extension ("mpk"); paths
// handed to it are given without one.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder},
};

use crate::application::train_use_case::TrainConfig;

/// Manages the model directory of one output directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    out_dir:    PathBuf,
    models_dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager and the `models/` directory under `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir    = out_dir.into();
        let models_dir = out_dir.join("models");
        fs::create_dir_all(&models_dir)
            .with_context(|| format!("Cannot create '{}'", models_dir.display()))?;
        Ok(Self { out_dir, models_dir })
    }

    /// Record path for `epoch`, without the recorder's extension.
    pub fn model_path(&self, epoch: usize) -> PathBuf {
        self.models_dir.join(format!("model_iter{epoch}"))
    }

    /// Persist the weights of `model` as the checkpoint of `epoch`.
    /// Returns the file written, extension included.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<PathBuf> {
        let path = self.model_path(epoch);
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let file = path.with_extension(record_extension::<B>());
        tracing::debug!("Saved checkpoint '{}'", file.display());
        Ok(file)
    }

    /// Load weights from a checkpoint written by an earlier run.
    ///
    /// `path` may name the file with or without its `.mpk` extension.
    /// The architecture of `model` must match the one that was saved.
    pub fn load_pretrained<B: Backend, M: Module<B>>(
        model:  M,
        path:   &Path,
        device: &B::Device,
    ) -> Result<M> {
        let stripped = strip_record_extension::<B>(path);
        let loaded   = model
            .load_file(stripped.clone(), &CompactRecorder::new(), device)
            .with_context(|| format!("Cannot load pretrained model '{}'", path.display()))?;

        tracing::info!("Loaded pretrained weights from '{}'", stripped.display());
        Ok(loaded)
    }

    /// Write the run configuration as `config_<timestamp>.json`.
    pub fn save_config(&self, cfg: &TrainConfig, timestamp: &str) -> Result<PathBuf> {
        let path = self.out_dir.join(format!("config_{timestamp}.json"));
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }
}

/// The extension CompactRecorder gives its files, without the dot.
pub fn record_extension<B: Backend>() -> &'static str {
    <CompactRecorder as FileRecorder<B>>::file_extension()
}

fn strip_record_extension<B: Backend>(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == record_extension::<B>() => path.with_extension(""),
        _                                          => path.to_path_buf(),
    }
}
