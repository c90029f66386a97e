// ============================================================
// Layer 4 — Oracle Resampler
// ============================================================
// Hard-example mining between epochs.
//
// After an epoch, every training patch has a mean loss over the
// epoch's inner epochs. The highest-loss patches are copied out
// and written over random positions of the NEXT epoch's freshly
// built training set, so the model sees them again.
//
// Selection:
//   1. rank patches by loss, highest first (ties keep the lower
//      index first; NaN sorts above every number)
//   2. keep the top k = floor(oracle_rate * N) as candidates
//   3. drop floor(k * drop_rate) random candidates, so the same
//      hard examples are not replayed every single epoch
//
// An oracle_rate of 0 disables the mechanism; the orchestrator
// does not call in here at all.

use std::cmp::Ordering;

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, seq::index::sample, seq::SliceRandom};

use crate::domain::patch_set::PatchSet;

/// Patches chosen for replay, with the indices they were taken from.
#[derive(Debug, Clone)]
pub struct OracleSet {
    pub patches: PatchSet,
    pub indices: Vec<usize>,
}

impl OracleSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Mean loss of the selected patches, NaN when nothing was selected.
    pub fn mean_loss(&self, instance_loss: &[f32]) -> f64 {
        if self.indices.is_empty() {
            return f64::NAN;
        }
        let sum: f64 = self.indices.iter().map(|&i| instance_loss[i] as f64).sum();
        sum / self.indices.len() as f64
    }
}

/// Patch indices ordered from highest to lowest loss.
pub fn rank_by_loss(instance_loss: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..instance_loss.len()).collect();
    // sort_by is stable, so equal losses keep ascending index order
    order.sort_by(|&a, &b| descending(instance_loss[a], instance_loss[b]));
    order
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Candidate and keep counts for a set of `n` patches.
pub fn oracle_counts(n: usize, oracle_rate: f64, drop_rate: f64) -> (usize, usize) {
    let candidates = ((n as f64) * oracle_rate).floor() as usize;
    let candidates = candidates.min(n);
    let dropped    = ((candidates as f64) * drop_rate).floor() as usize;
    (candidates, candidates - dropped.min(candidates))
}

/// Select the hardest patches of the epoch that just finished.
pub fn select_oracle(
    patches:       &PatchSet,
    instance_loss: &[f32],
    oracle_rate:   f64,
    drop_rate:     f64,
    rng:           &mut StdRng,
) -> Result<OracleSet> {
    ensure!(
        instance_loss.len() == patches.len(),
        "instance loss has {} entries for {} patches",
        instance_loss.len(),
        patches.len()
    );
    ensure!((0.0..=1.0).contains(&oracle_rate), "oracle rate {oracle_rate} outside [0, 1]");
    ensure!((0.0..=1.0).contains(&drop_rate), "oracle drop rate {drop_rate} outside [0, 1]");

    let (candidates, keep) = oracle_counts(patches.len(), oracle_rate, drop_rate);
    let ranked             = rank_by_loss(instance_loss);

    // Keep a random subset of the candidate prefix, preserving rank order
    let mut kept: Vec<usize> = sample(rng, candidates, keep).into_vec();
    kept.sort_unstable();
    let indices: Vec<usize> = kept.into_iter().map(|r| ranked[r]).collect();

    Ok(OracleSet {
        patches: patches.select(&indices),
        indices,
    })
}

/// Overwrite random distinct positions of `training_set` with the oracle
/// patches. Returns the positions written, position k holding oracle patch k.
pub fn inject_oracle(
    training_set: &mut PatchSet,
    oracle:       &OracleSet,
    rng:          &mut StdRng,
) -> Result<Vec<usize>> {
    let n     = training_set.len();
    let count = oracle.len().min(n);

    let mut positions: Vec<usize> = sample(rng, n, count).into_vec();
    positions.shuffle(rng);

    let replacement = if count == oracle.len() {
        oracle.patches.clone()
    } else {
        tracing::warn!("Oracle set of {} exceeds training set of {}, truncating", oracle.len(), n);
        oracle.patches.select(&(0..count).collect::<Vec<_>>())
    };

    training_set.overwrite(&positions, &replacement)?;
    Ok(positions)
}
