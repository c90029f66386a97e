// ============================================================
// Layer 5 — Crop-and-Concat Helper
// ============================================================
// The mask is narrower than the input by the model's border
// offset, so the input and target are cut down to the mask's
// extent before the loss. Only the larger tensor is ever
// cropped; nothing is padded.

use burn::prelude::*;

use crate::domain::error::DataError;

/// Centre-crop the last two axes of `x` to `[height, width]`.
pub fn crop_center<B: Backend>(x: Tensor<B, 4>, target: [usize; 2]) -> Result<Tensor<B, 4>, DataError> {
    let [b, c, h, w] = x.dims();
    let [th, tw]     = target;

    if th > h || tw > w {
        return Err(DataError::ShapeMismatch {
            expected: vec![b, c, th, tw],
            got:      vec![b, c, h, w],
        });
    }
    if th == h && tw == w {
        return Ok(x);
    }

    let top  = (h - th) / 2;
    let left = (w - tw) / 2;
    Ok(x.slice([0..b, 0..c, top..top + th, left..left + tw]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn ramp(w: usize) -> Tensor<TestBackend, 4> {
        let data: Vec<f32> = (0..w).map(|v| v as f32).collect();
        Tensor::from_data(TensorData::new(data, [1, 1, 1, w]), &Default::default())
    }

    #[test]
    fn test_crops_time_axis_centred() {
        let cropped = crop_center(ramp(10), [1, 6]).unwrap();
        let values: Vec<f32> = cropped.into_data().to_vec().unwrap();
        assert_eq!(values, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_odd_difference_rounds_left() {
        let cropped = crop_center(ramp(5), [1, 2]).unwrap();
        let values: Vec<f32> = cropped.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_never_grows() {
        assert!(crop_center(ramp(4), [1, 5]).is_err());
        assert_eq!(crop_center(ramp(4), [1, 4]).unwrap().dims(), [1, 1, 1, 4]);
    }
}
