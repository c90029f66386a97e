// ============================================================
// Layer 4 — Patch Batcher
// ============================================================
// Copies a chunk of host-side patches to the device as a pair of
// 4-D tensors.
//
//   Input:  PatchSet [N, C, F, T] and a list of row indices
//   Output: SpecBatch with tensors of shape [len(indices), C, F, T]
//
// Rows are gathered in the order given, so the trainer can pass
// a slice of its shuffled permutation and still know which
// original patch each row came from.
//
// B is the Burn Backend: training batches go to the autodiff
// backend, validation batches to its inner backend.

use burn::{prelude::*, tensor::TensorData};

use crate::domain::patch_set::PatchSet;

/// Mixture and instrumental patches of one step, aligned by row.
#[derive(Debug, Clone)]
pub struct SpecBatch<B: Backend> {
    /// [batch, channels, bins, frames]
    pub mixture: Tensor<B, 4>,

    /// [batch, channels, bins, frames]
    pub instrumental: Tensor<B, 4>,
}

impl<B: Backend> SpecBatch<B> {
    pub fn len(&self) -> usize {
        self.mixture.dims()[0]
    }
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct PatchBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PatchBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Gather the rows at `indices` into a device batch.
    pub fn batch(&self, patches: &PatchSet, indices: &[usize]) -> SpecBatch<B> {
        let [c, f, t] = patches.patch_shape();
        let shape     = [indices.len(), c, f, t];
        let rows      = patches.select(indices);

        let mixture_flat: Vec<f32>      = rows.mixture.iter().copied().collect();
        let instrumental_flat: Vec<f32> = rows.instrumental.iter().copied().collect();

        let mixture = Tensor::<B, 4>::from_data(
            TensorData::new(mixture_flat, shape),
            &self.device,
        );
        let instrumental = Tensor::<B, 4>::from_data(
            TensorData::new(instrumental_flat, shape),
            &self.device,
        );

        SpecBatch { mixture, instrumental }
    }
}
