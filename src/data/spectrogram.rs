// ============================================================
// Layer 4 — Magnitude Spectrogram
// ============================================================
// Short-time Fourier transform of a multi-channel waveform.
//
//   wave [channels, samples]  →  magnitude [channels, bins, frames]
//
//   bins   = n_fft / 2 + 1
//   frames = samples / hop_length + 1
//
// Frames are centred: the signal is zero padded by n_fft / 2 on
// both sides, so frame t is centred on sample t * hop_length.
// A periodic Hann window is applied before each FFT.

use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView1, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Cached FFT plan and window for one (n_fft, hop_length) setting.
pub struct Stft {
    fft:        Arc<dyn Fft<f32>>,
    window:     Vec<f32>,
    n_fft:      usize,
    hop_length: usize,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft         = planner.plan_fft_forward(n_fft);

        let window = (0..n_fft)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n_fft as f32).cos())
            .collect();

        Self { fft, window, n_fft, hop_length }
    }

    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn frames(&self, n_samples: usize) -> usize {
        n_samples / self.hop_length + 1
    }

    /// Magnitude STFT of a single channel → [bins, frames].
    pub fn magnitude(&self, samples: ArrayView1<f32>) -> Array2<f32> {
        let pad     = self.n_fft / 2;
        let frames  = self.frames(samples.len());
        let bins    = self.bins();
        let mut out = Array2::<f32>::zeros((bins, frames));
        let mut buf = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for t in 0..frames {
            // Position of the frame's first sample in the unpadded signal
            let start = (t * self.hop_length) as isize - pad as isize;
            for (k, slot) in buf.iter_mut().enumerate() {
                let idx    = start + k as isize;
                let sample = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[k], 0.0);
            }

            self.fft.process(&mut buf);

            for (f, c) in buf.iter().take(bins).enumerate() {
                out[[f, t]] = c.norm();
            }
        }

        out
    }

    /// Magnitude STFT of every channel → [channels, bins, frames].
    pub fn magnitude_multi(&self, wave: &Array2<f32>) -> Array3<f32> {
        let channels = wave.len_of(Axis(0));
        let frames   = self.frames(wave.len_of(Axis(1)));
        let mut out  = Array3::<f32>::zeros((channels, self.bins(), frames));

        for (c, channel) in wave.axis_iter(Axis(0)).enumerate() {
            out.index_axis_mut(Axis(0), c).assign(&self.magnitude(channel));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_output_shape() {
        let stft = Stft::new(16, 4);
        let wave = Array2::<f32>::zeros((2, 37));
        let spec = stft.magnitude_multi(&wave);
        assert_eq!(spec.shape(), &[2, 9, 37 / 4 + 1]);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let n_fft = 64;
        let stft  = Stft::new(n_fft, 16);
        // Exactly 8 cycles per n_fft samples → energy in bin 8
        let wave: Array1<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / n_fft as f32).sin())
            .collect();
        let spec = stft.magnitude(wave.view());

        // Pick a frame away from the zero-padded edges
        let frame = spec.column(10);
        let peak  = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
    }

    #[test]
    fn test_silence_is_zero() {
        let stft = Stft::new(32, 8);
        let spec = stft.magnitude(Array1::<f32>::zeros(100).view());
        assert!(spec.iter().all(|&v| v == 0.0));
    }
}
