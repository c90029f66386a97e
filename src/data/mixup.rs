// ============================================================
// Layer 4 — Mixup Augmentation
// ============================================================
// Blends pairs of training patches in place:
//
//   X[a] = λ X[a] + (1 - λ) X[b]
//   Y[a] = λ Y[a] + (1 - λ) Y[b]      λ ~ Beta(alpha, alpha)
//
// Only half of the set takes part: the first N / 2 entries of a
// random permutation, each blended with its successor in that
// permutation. Mixture and target share λ, so the blended target
// is still the instrumental of the blended mixture.

use anyhow::{anyhow, Result};
use ndarray::Axis;
use rand::{rngs::StdRng, seq::SliceRandom};
use rand_distr::{Beta, Distribution};

use crate::domain::patch_set::PatchSet;

/// Apply mixup to `patches` in place. Returns the indices that were blended.
pub fn mixup(patches: &mut PatchSet, alpha: f64, rng: &mut StdRng) -> Result<Vec<usize>> {
    let beta = Beta::new(alpha, alpha)
        .map_err(|e| anyhow!("invalid mixup alpha {alpha}: {e}"))?;

    let mut perm: Vec<usize> = (0..patches.len()).collect();
    perm.shuffle(rng);
    perm.truncate(patches.len() / 2);

    let mut blended = Vec::with_capacity(perm.len().saturating_sub(1));
    for w in perm.windows(2) {
        let (a, b) = (w[0], w[1]);
        let lam    = beta.sample(rng) as f32;

        let x_b = patches.mixture.index_axis(Axis(0), b).to_owned();
        let y_b = patches.instrumental.index_axis(Axis(0), b).to_owned();

        let mut x_a = patches.mixture.index_axis_mut(Axis(0), a);
        x_a.zip_mut_with(&x_b, |va, &vb| *va = lam * *va + (1.0 - lam) * vb);

        let mut y_a = patches.instrumental.index_axis_mut(Axis(0), a);
        y_a.zip_mut_with(&y_b, |va, &vb| *va = lam * *va + (1.0 - lam) * vb);

        blended.push(a);
    }

    tracing::debug!("Mixup blended {} of {} patches", blended.len(), patches.len());
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use rand::SeedableRng;

    /// Patch i is constant i (mixture) and 2i (instrumental).
    fn numbered(n: usize) -> PatchSet {
        PatchSet::new(
            Array4::from_shape_fn((n, 1, 2, 2), |(i, _, _, _)| i as f32),
            Array4::from_shape_fn((n, 1, 2, 2), |(i, _, _, _)| 2.0 * i as f32),
        )
        .unwrap()
    }

    #[test]
    fn test_blends_half_minus_one() {
        let mut set = numbered(10);
        let mut rng = StdRng::seed_from_u64(5);
        let blended = mixup(&mut set, 1.0, &mut rng).unwrap();
        assert_eq!(blended.len(), 4);
    }

    #[test]
    fn test_untouched_patches_unchanged_and_pairs_consistent() {
        let original = numbered(12);
        let mut set  = original.clone();
        let mut rng  = StdRng::seed_from_u64(11);
        let blended  = mixup(&mut set, 0.4, &mut rng).unwrap();

        for i in 0..set.len() {
            let x = set.mixture[[i, 0, 0, 0]];
            let y = set.instrumental[[i, 0, 0, 0]];
            if !blended.contains(&i) {
                assert_eq!(x, i as f32);
            }
            // y = 2x holds for any convex blend of numbered patches
            assert!((y - 2.0 * x).abs() < 1e-4);
            // Every value stays inside the original range
            assert!((0.0..=11.0).contains(&x));
        }
    }

    #[test]
    fn test_invalid_alpha() {
        let mut set = numbered(4);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(mixup(&mut set, 0.0, &mut rng).is_err());
        assert!(mixup(&mut set, -1.0, &mut rng).is_err());
    }

    #[test]
    fn test_tiny_sets() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in 0..4 {
            let mut set = numbered(n);
            assert!(mixup(&mut set, 1.0, &mut rng).unwrap().len() <= 1);
        }
    }
}
