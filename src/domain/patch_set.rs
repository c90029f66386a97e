// ============================================================
// Layer 3 — PatchSet Domain Type
// ============================================================
// Two parallel arrays of spectrogram patches, shaped
// [N, channels, bins, frames]. Patch i of `mixture` is the
// input for which patch i of `instrumental` is the target.
//
// Patches live on the host; the batcher copies only the
// selected rows to the device for each step.

use ndarray::{Array4, Axis};

use crate::domain::error::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet {
    pub mixture:      Array4<f32>,
    pub instrumental: Array4<f32>,
}

impl PatchSet {
    /// Pair two patch arrays, rejecting arrays of different shapes.
    pub fn new(mixture: Array4<f32>, instrumental: Array4<f32>) -> Result<Self, DataError> {
        if mixture.shape() != instrumental.shape() {
            return Err(DataError::ShapeMismatch {
                expected: mixture.shape().to_vec(),
                got:      instrumental.shape().to_vec(),
            });
        }
        Ok(Self { mixture, instrumental })
    }

    /// An empty set with the given per-patch shape.
    pub fn empty(patch_shape: [usize; 3]) -> Self {
        let [c, h, w] = patch_shape;
        Self {
            mixture:      Array4::zeros((0, c, h, w)),
            instrumental: Array4::zeros((0, c, h, w)),
        }
    }

    pub fn len(&self) -> usize {
        self.mixture.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [channels, bins, frames] of a single patch.
    pub fn patch_shape(&self) -> [usize; 3] {
        let s = self.mixture.shape();
        [s[1], s[2], s[3]]
    }

    /// Copy out the patches at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> PatchSet {
        PatchSet {
            mixture:      self.mixture.select(Axis(0), indices),
            instrumental: self.instrumental.select(Axis(0), indices),
        }
    }

    /// Overwrite the patches at `positions` with the patches of `replacement`,
    /// position k receiving replacement patch k.
    pub fn overwrite(&mut self, positions: &[usize], replacement: &PatchSet) -> Result<(), DataError> {
        if replacement.patch_shape() != self.patch_shape() || positions.len() != replacement.len() {
            return Err(DataError::ShapeMismatch {
                expected: vec![positions.len(), self.patch_shape()[0], self.patch_shape()[1], self.patch_shape()[2]],
                got:      replacement.mixture.shape().to_vec(),
            });
        }
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.len()) {
            return Err(DataError::ShapeMismatch {
                expected: vec![self.len()],
                got:      vec![bad],
            });
        }

        for (k, &pos) in positions.iter().enumerate() {
            self.mixture
                .index_axis_mut(Axis(0), pos)
                .assign(&replacement.mixture.index_axis(Axis(0), k));
            self.instrumental
                .index_axis_mut(Axis(0), pos)
                .assign(&replacement.instrumental.index_axis(Axis(0), k));
        }
        Ok(())
    }
}
