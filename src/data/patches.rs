// ============================================================
// Layer 4 — Patch Builders
// ============================================================
// Cuts spectrogram pairs into fixed-size patches.
//
// Training set (rebuilt every epoch):
//   pad the time axis on the right to a whole number of crops,
//   then take `patches` random crops of `cropsize` frames per
//   pair. Patch i * patches + j is crop j of pair i.
//
// Validation set (built once):
//   pad `offset` frames on the left and enough on the right,
//   then slide a `cropsize` window with stride
//   roi = cropsize - 2 * offset. After the model trims `offset`
//   frames from each border, the windows tile the whole track
//   exactly once.
//
// Both spectrograms of a pair are divided by the larger of their
// two peak magnitudes first, so the target keeps its level
// relative to the mixture.

use anyhow::{Context, Result};
use ndarray::{s, stack, Array3, Array4, ArrayView3, Axis};
use rand::{rngs::StdRng, Rng};

use crate::data::loader::{SpectrogramLoader, CHANNELS};
use crate::domain::{
    error::DataError, file_pair::FilePair, patch_set::PatchSet, traits::PatchSource,
};

/// (left, right, roi) padding for a track of `width` frames.
pub fn make_padding(width: usize, cropsize: usize, offset: usize) -> Result<(usize, usize, usize)> {
    let left = offset;
    let roi  = cropsize.checked_sub(2 * offset).ok_or_else(|| {
        anyhow::anyhow!("crop size {cropsize} is smaller than twice the model offset {offset}")
    })?;
    let roi   = if roi == 0 { cropsize } else { roi };
    let right = roi - width % roi + left;
    Ok((left, right, roi))
}

/// Zero-pad the last (time) axis.
fn pad_time(x: &Array3<f32>, left: usize, right: usize) -> Array3<f32> {
    let (c, h, w) = x.dim();
    let mut out   = Array3::<f32>::zeros((c, h, left + w + right));
    out.slice_mut(s![.., .., left..left + w]).assign(x);
    out
}

/// Divide both spectrograms by their common peak magnitude.
pub fn normalize_pair(x: &mut Array3<f32>, y: &mut Array3<f32>) {
    let peak = x
        .iter()
        .chain(y.iter())
        .fold(0.0f32, |m, v| m.max(v.abs()));
    if peak > 0.0 {
        x.mapv_inplace(|v| v / peak);
        y.mapv_inplace(|v| v / peak);
    }
}

/// Random training crops of one spectrogram pair.
pub fn random_crops(
    x:        &Array3<f32>,
    y:        &Array3<f32>,
    cropsize: usize,
    patches:  usize,
    rng:      &mut StdRng,
) -> Result<(Vec<Array3<f32>>, Vec<Array3<f32>>)> {
    let (_, right, _) = make_padding(x.len_of(Axis(2)), cropsize, 0)?;
    let x_pad         = pad_time(x, 0, right);
    let y_pad         = pad_time(y, 0, right);
    let max_start     = x_pad.len_of(Axis(2)) - cropsize;

    let mut xs = Vec::with_capacity(patches);
    let mut ys = Vec::with_capacity(patches);
    for _ in 0..patches {
        let start = if max_start == 0 { 0 } else { rng.gen_range(0..max_start) };
        xs.push(x_pad.slice(s![.., .., start..start + cropsize]).to_owned());
        ys.push(y_pad.slice(s![.., .., start..start + cropsize]).to_owned());
    }
    Ok((xs, ys))
}

/// Sliding validation windows of one spectrogram pair.
pub fn sliding_windows(
    x:        &Array3<f32>,
    y:        &Array3<f32>,
    cropsize: usize,
    offset:   usize,
) -> Result<(Vec<Array3<f32>>, Vec<Array3<f32>>)> {
    let width              = x.len_of(Axis(2));
    let (left, right, roi) = make_padding(width, cropsize, offset)?;
    let x_pad              = pad_time(x, left, right);
    let y_pad              = pad_time(y, left, right);
    let windows            = width.div_ceil(roi);

    let mut xs = Vec::with_capacity(windows);
    let mut ys = Vec::with_capacity(windows);
    for j in 0..windows {
        let start = j * roi;
        xs.push(x_pad.slice(s![.., .., start..start + cropsize]).to_owned());
        ys.push(y_pad.slice(s![.., .., start..start + cropsize]).to_owned());
    }
    Ok((xs, ys))
}

/// Stack per-patch arrays into a PatchSet.
fn stack_patches(
    xs:          Vec<Array3<f32>>,
    ys:          Vec<Array3<f32>>,
    patch_shape: [usize; 3],
) -> Result<PatchSet> {
    if xs.is_empty() {
        return Ok(PatchSet::empty(patch_shape));
    }
    let x_views: Vec<ArrayView3<f32>> = xs.iter().map(|a| a.view()).collect();
    let y_views: Vec<ArrayView3<f32>> = ys.iter().map(|a| a.view()).collect();
    let mixture: Array4<f32>      = stack(Axis(0), &x_views).context("Patches differ in shape")?;
    let instrumental: Array4<f32> = stack(Axis(0), &y_views).context("Patches differ in shape")?;
    Ok(PatchSet::new(mixture, instrumental)?)
}

/// PatchSource backed by WAV files and the spectrogram cache.
pub struct SpectrogramPatchSource {
    loader: SpectrogramLoader,
}

impl SpectrogramPatchSource {
    pub fn new(loader: SpectrogramLoader) -> Self {
        Self { loader }
    }

    fn load_normalized(&self, pair: &FilePair) -> Result<(Array3<f32>, Array3<f32>)> {
        let (mut x, mut y) = self
            .loader
            .load_pair(pair)
            .with_context(|| format!("Cannot load pair '{}'", pair.mixture().display()))?;
        normalize_pair(&mut x, &mut y);
        Ok((x, y))
    }
}

impl PatchSource for SpectrogramPatchSource {
    fn training_set(
        &self,
        files:    &[FilePair],
        cropsize: usize,
        patches:  usize,
        rng:      &mut StdRng,
    ) -> Result<PatchSet> {
        if files.is_empty() {
            return Err(DataError::EmptySplit("training").into());
        }

        let mut xs = Vec::with_capacity(files.len() * patches);
        let mut ys = Vec::with_capacity(files.len() * patches);
        for pair in files {
            let (x, y)   = self.load_normalized(pair)?;
            let (cx, cy) = random_crops(&x, &y, cropsize, patches, rng)?;
            xs.extend(cx);
            ys.extend(cy);
        }

        stack_patches(xs, ys, [CHANNELS, self.loader.bins(), cropsize])
    }

    fn validation_set(
        &self,
        files:    &[FilePair],
        cropsize: usize,
        offset:   usize,
    ) -> Result<PatchSet> {
        if files.is_empty() {
            return Err(DataError::EmptySplit("validation").into());
        }

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for pair in files {
            let (x, y)   = self.load_normalized(pair)?;
            let (cx, cy) = sliding_windows(&x, &y, cropsize, offset)?;
            xs.extend(cx);
            ys.extend(cy);
        }

        stack_patches(xs, ys, [CHANNELS, self.loader.bins(), cropsize])
    }
}
