// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The orchestrator never touches audio files directly. It asks
// a PatchSource for patches, so the spectrogram pipeline can be
// replaced (or faked in tests) without touching the loop.
//
// Implementations:
//   - SpectrogramPatchSource → WAV files → magnitude STFT patches
//   - test fakes             → deterministic synthetic patches

use anyhow::Result;
use rand::rngs::StdRng;

use crate::domain::{file_pair::FilePair, patch_set::PatchSet};

// ─── PatchSource ──────────────────────────────────────────────────────────────
/// Anything that can turn a file list into paired spectrogram patches.
pub trait PatchSource {
    /// `patches` randomly positioned crops of `cropsize` frames per file pair.
    /// Called once per epoch, so crop positions differ between epochs.
    fn training_set(
        &self,
        files:    &[FilePair],
        cropsize: usize,
        patches:  usize,
        rng:      &mut StdRng,
    ) -> Result<PatchSet>;

    /// Deterministic windows of `cropsize` frames covering every file pair,
    /// padded by the model's border `offset` so the cropped mask still
    /// covers the whole track.
    fn validation_set(
        &self,
        files:    &[FilePair],
        cropsize: usize,
        offset:   usize,
    ) -> Result<PatchSet>;
}
