// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between two directories of audio files and the
// device tensors of one training step.
//
//   mixture/ + instrumental/
//       │
//       ▼
//   corpus      → positional (mixture, instrumental) pairs
//       │
//       ▼
//   splitter    → train / validation file lists
//       │
//       ▼
//   loader      → WAV → magnitude spectrogram (cached as .npy)
//       │
//       ▼
//   patches     → random training crops, sliding validation windows
//       │
//       ▼
//   mixup       → optional in-place blending
//   oracle      → hard-example replay from the previous epoch
//       │
//       ▼
//   batcher     → device tensors for one step

/// Lists the two audio directories and pairs files by position
pub mod corpus;

/// Shuffles and splits pairs into train/validation lists
pub mod splitter;

/// Short-time Fourier transform (magnitude)
pub mod spectrogram;

/// WAV decoding and the spectrogram cache
pub mod loader;

/// Training / validation patch builders
pub mod patches;

/// Beta-distributed mixup
pub mod mixup;

/// Loss-ranked hard-example selection and injection
pub mod oracle;

/// Host patches → device tensor batches
pub mod batcher;
