// ============================================================
// Layer 5 — Inner-Epoch Training and Validation
// ============================================================
// One pass over a patch set, in two flavours:
//
//   train_inner_epoch — shuffled mini-batches, Adam step per
//                       batch, per-patch loss accumulated into
//                       the caller's instance_loss buffer
//   valid_inner_epoch — fixed order, inference mode, no grads
//
// Loss for a batch, with M = model(X):
//
//   X', Y' = centre-crop X, Y to the extent of M
//   L      = mean |X' * M - Y'|
//
// Both passes return the batch losses averaged with weight
// len(batch), i.e. the exact mean over patches even when the
// last batch is short.
//
// Key Burn 0.20 insight:
//   - Training runs on the autodiff backend
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation batcher must be built for the inner backend too

use anyhow::{anyhow, ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::data::batcher::{PatchBatcher, SpecBatch};
use crate::domain::patch_set::PatchSet;
use crate::ml::{crop::crop_center, model::MaskEstimator};

/// Element-wise |X' * mask - Y'| for one batch, shape of the mask.
pub fn masked_abs_error<B: Backend, M: MaskEstimator<B>>(
    model: &M,
    batch: &SpecBatch<B>,
) -> Result<Tensor<B, 4>> {
    let mask         = model.forward(batch.mixture.clone());
    let [_, _, h, w] = mask.dims();
    let mixture      = crop_center(batch.mixture.clone(), [h, w])?;
    let instrumental = crop_center(batch.instrumental.clone(), [h, w])?;
    Ok((mixture * mask - instrumental).abs())
}

/// Train for one pass over `patches` and return the mean training loss.
///
/// `instance_loss[i]` gains patch i's mean absolute error from this pass,
/// so after several inner epochs it holds their sum; the caller divides.
#[allow(clippy::too_many_arguments)]
pub fn train_inner_epoch<B, M, O>(
    patches:       &PatchSet,
    mut model:     M,
    optim:         &mut O,
    learning_rate: f64,
    batch_size:    usize,
    instance_loss: &mut [f32],
    batcher:       &PatchBatcher<B>,
    rng:           &mut StdRng,
) -> Result<(M, f64)>
where
    B: AutodiffBackend,
    M: MaskEstimator<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    ensure!(batch_size > 0, "batch size must be positive");
    ensure!(!patches.is_empty(), "training set is empty");
    ensure!(
        instance_loss.len() == patches.len(),
        "instance loss buffer holds {} entries for {} patches",
        instance_loss.len(),
        patches.len()
    );

    let mut perm: Vec<usize> = (0..patches.len()).collect();
    perm.shuffle(rng);

    let mut sum_loss = 0.0f64;
    for local_perm in perm.chunks(batch_size) {
        let batch    = batcher.batch(patches, local_perm);
        let abs_diff = masked_abs_error(&model, &batch)?;

        // [b, c, f, t] → [b, c*f*t] → [b, 1]
        let per_instance: Vec<f32> = abs_diff
            .clone()
            .detach()
            .flatten::<2>(1, 3)
            .mean_dim(1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read per-patch losses: {e:?}"))?;

        let loss            = abs_diff.mean();
        let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model     = optim.step(learning_rate, model, grads);

        for (&idx, &value) in local_perm.iter().zip(&per_instance) {
            instance_loss[idx] += value;
        }
        sum_loss += loss_value * batch.len() as f64;
    }

    Ok((model, sum_loss / patches.len() as f64))
}

/// Mean validation loss over `patches`, evaluated in stored order.
pub fn valid_inner_epoch<B: Backend, M: MaskEstimator<B>>(
    patches:    &PatchSet,
    model:      &M,
    batch_size: usize,
    batcher:    &PatchBatcher<B>,
) -> Result<f64> {
    ensure!(batch_size > 0, "validation batch size must be positive");
    ensure!(!patches.is_empty(), "validation set is empty");

    let indices: Vec<usize> = (0..patches.len()).collect();
    let mut sum_loss        = 0.0f64;

    for chunk in indices.chunks(batch_size) {
        let batch      = batcher.batch(patches, chunk);
        let loss: f64  = masked_abs_error(model, &batch)?.mean().into_scalar().elem::<f64>();
        sum_loss      += loss * batch.len() as f64;
    }

    Ok(sum_loss / patches.len() as f64)
}
