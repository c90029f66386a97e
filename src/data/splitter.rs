// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the corpus and splits it into a training list and a
// validation list.
//
// Two modes:
//   1. Manifest mode: a non-empty list of pairs (usually the
//      val_*.json of an earlier run) is the validation set
//      verbatim; training gets every shuffled pair that is not
//      in it.
//   2. Fractional mode: the LAST floor(len * val_rate) pairs of
//      the shuffled list become the validation set.
//
// The shuffle uses the run's seeded RNG so a given seed and
// corpus always produce the same split.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

use crate::domain::file_pair::FilePair;

/// The two file lists of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<FilePair>,
    pub val:   Vec<FilePair>,
}

/// Shuffle `samples` and move the last `floor(len * val_rate)` of them into
/// the validation half.
///
/// # Returns
/// A tuple (train_samples, val_samples)
pub fn split_train_val<T, R: Rng + ?Sized>(
    mut samples: Vec<T>,
    val_rate:    f64,
    rng:         &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total    = samples.len();
    let val_size = ((total as f64) * val_rate).floor() as usize;
    let val_size = val_size.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let val = samples.split_off(total - val_size);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

/// Split a corpus, honouring `manifest` when it is non-empty.
pub fn split_corpus<R: Rng + ?Sized>(
    corpus:   Vec<FilePair>,
    val_rate: f64,
    manifest: &[FilePair],
    rng:      &mut R,
) -> Split {
    if manifest.is_empty() {
        let (train, val) = split_train_val(corpus, val_rate, rng);
        return Split { train, val };
    }

    let mut shuffled = corpus;
    shuffled.shuffle(rng);

    let held_out: HashSet<&FilePair> = manifest.iter().collect();
    let known: HashSet<&FilePair>    = shuffled.iter().collect();
    for pair in manifest.iter().filter(|p| !known.contains(p)) {
        tracing::warn!(
            "Validation pair ('{}', '{}') is not part of the corpus",
            pair.mixture().display(),
            pair.instrumental().display()
        );
    }

    let train = shuffled
        .iter()
        .filter(|p| !held_out.contains(p))
        .cloned()
        .collect();

    Split { train, val: manifest.to_vec() }
}
