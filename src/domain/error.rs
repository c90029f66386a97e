// ============================================================
// Layer 3 — Typed Errors
// ============================================================
// Failures the pipeline can name precisely. Everything above
// the domain layer wraps these in anyhow with extra context.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the corpus, the audio files or the patches built from them.
#[derive(Error, Debug)]
pub enum DataError {
    #[error(
        "mixture/instrumental listings differ in length ({mixtures} mixtures, \
         {instrumentals} instrumentals); files are paired by position"
    )]
    MismatchedCorpusLength { mixtures: usize, instrumentals: usize },

    #[error("unsupported audio format '{}' (only WAV is decoded)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("'{}' is sampled at {found} Hz, expected {expected} Hz", path.display())]
    SampleRate {
        path:     PathBuf,
        found:    u32,
        expected: u32,
    },

    #[error("'{}' contains no samples", .0.display())]
    EmptyAudio(PathBuf),

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("{0} file list is empty")]
    EmptySplit(&'static str),
}

/// Problems detected while the training loop is running.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("non-finite {phase} loss ({value}) at epoch {epoch}, inner epoch {inner_epoch}")]
    NonFiniteLoss {
        phase:       &'static str,
        value:       f64,
        epoch:       usize,
        inner_epoch: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
