// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// All tensor code lives here; the data layer hands over host
// arrays and gets scalar losses back.
//
//   crop.rs         — centre crop of a tensor to a mask's extent
//   model.rs        — MaskEstimator trait and the U-Net
//   trainer.rs      — one training / validation pass
//   orchestrator.rs — epochs, inner epochs, checkpoints, decay,
//                     oracle resampling
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Ronneberger et al. (2015) U-Net

/// Crop-and-concat helper
pub mod crop;

/// Mask estimator interface and U-Net architecture
pub mod model;

/// Inner-epoch training and validation passes
pub mod trainer;

/// Outer training loop
pub mod orchestrator;
