// ============================================================
// Layer 2 — SplitUseCase
// ============================================================
// Fixes a validation split ahead of training:
//
//   Step 1: Pair mixture and instrumental files   (Layer 4 - data)
//   Step 2: Shuffle and split                     (Layer 4 - data)
//   Step 3: Write val_<timestamp>.json            (Layer 6 - infra)
//
// The written file can be handed to `train --val_filelist`.
// resolve_split is shared with the training workflow.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{
    corpus::build_corpus,
    splitter::{split_corpus, Split},
};
use crate::domain::{error::DataError, file_pair::FilePair};
use crate::infra::manifest::write_manifest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub mixture_dataset:      PathBuf,
    pub instrumental_dataset: PathBuf,
    pub validation_rate:      f64,
    pub seed:                 u64,
    pub out_dir:              PathBuf,
}

/// Pair the two corpus directories and split them; both halves must be
/// non-empty.
pub fn resolve_split(
    mixture_dir:      &Path,
    instrumental_dir: &Path,
    validation_rate:  f64,
    manifest:         &[FilePair],
    rng:              &mut StdRng,
) -> Result<Split> {
    let corpus = build_corpus(mixture_dir, instrumental_dir)?;
    tracing::info!("Found {} mixture/instrumental pairs", corpus.len());

    let split = split_corpus(corpus, validation_rate, manifest, rng);
    if split.train.is_empty() {
        return Err(DataError::EmptySplit("training").into());
    }
    if split.val.is_empty() {
        return Err(DataError::EmptySplit("validation").into());
    }

    tracing::info!("{} training pairs, {} validation pairs", split.train.len(), split.val.len());
    Ok(split)
}

pub struct SplitUseCase {
    config: SplitConfig,
}

impl SplitUseCase {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Returns the path of the manifest written.
    pub fn execute(&self, timestamp: &str) -> Result<PathBuf> {
        let cfg = &self.config;
        if !(0.0..1.0).contains(&cfg.validation_rate) {
            anyhow::bail!("validation rate {} outside [0, 1)", cfg.validation_rate);
        }

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let split   = resolve_split(
            &cfg.mixture_dataset,
            &cfg.instrumental_dataset,
            cfg.validation_rate,
            &[],
            &mut rng,
        )?;

        fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.out_dir.display()))?;
        write_manifest(&cfg.out_dir, timestamp, &split.val)
    }
}
