// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the training
// pipeline works with:
//
//   file_pair.rs      — a (mixture, instrumental) audio file pair
//   patch_set.rs      — paired spectrogram patches for one epoch
//   training_state.rs — best loss, plateau counter, learning rate
//                       and the loss log, with the checkpoint and
//                       learning-rate decay decisions
//   traits.rs         — the patch builder seam
//   error.rs          — typed data / training failures
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//
// Keeping the checkpoint / decay policy here means it can be
// unit tested with synthetic loss sequences, no model needed.

pub mod error;

pub mod file_pair;

pub mod patch_set;

pub mod training_state;

pub mod traits;
