// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run writes to (or reads back from) disk:
//
//   checkpoint.rs — model weights via Burn's CompactRecorder,
//                   pretrained loading, run config JSON
//
//   metrics.rs    — the per-inner-epoch loss log (.npy)
//
//   manifest.rs   — the validation file list (.json)
//
// Every write failure is returned to the caller; a run that
// cannot persist its results stops.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Loss history as .npy
pub mod metrics;

/// Validation file list as JSON
pub mod manifest;
