// ============================================================
// Layer 4 — Audio Loader and Spectrogram Cache
// ============================================================
// Turns a FilePair into a pair of magnitude spectrograms.
//
// Decoding:
//   Only WAV is decoded (hound). Integer PCM is scaled to
//   [-1, 1]; float WAV is read as is. Mono is duplicated to two
//   channels, extra channels beyond two are dropped. There is
//   no resampler: a file at the wrong rate is an error.
//
// Cache:
//   Computing an STFT for every file on every epoch is the slow
//   part of building a training set, so each spectrogram is
//   stored next to its audio file as
//
//     <stem>_sr{sr}_hop{hop}_fft{n_fft}.npy
//
//   and reused when both files of a pair have one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::{s, Array2, Array3, Axis};
use ndarray_npy::{read_npy, write_npy};

use crate::data::spectrogram::Stft;
use crate::domain::{error::DataError, file_pair::FilePair};

/// Number of channels every spectrogram is normalised to.
pub const CHANNELS: usize = 2;

/// Decode a WAV file into a [2, samples] array.
pub fn load_wav(path: &Path, expected_sr: u32) -> Result<Array2<f32>> {
    if path.extension().and_then(|e| e.to_str()) != Some("wav") {
        return Err(DataError::UnsupportedFormat(path.to_path_buf()).into());
    }

    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let spec = reader.spec();

    if spec.sample_rate != expected_sr {
        return Err(DataError::SampleRate {
            path:     path.to_path_buf(),
            found:    spec.sample_rate,
            expected: expected_sr,
        }
        .into());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<f32>, hound::Error>>()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<f32>, hound::Error>>(),
    }
    .with_context(|| format!("Corrupt sample data in '{}'", path.display()))?;

    let channels = spec.channels as usize;
    let frames   = interleaved.len() / channels.max(1);
    if frames == 0 {
        return Err(DataError::EmptyAudio(path.to_path_buf()).into());
    }

    let mut wave = Array2::<f32>::zeros((CHANNELS, frames));
    for (t, frame) in interleaved.chunks_exact(channels).enumerate() {
        wave[[0, t]] = frame[0];
        wave[[1, t]] = if channels > 1 { frame[1] } else { frame[0] };
    }

    tracing::debug!("Decoded '{}': {} frames, {} channels", path.display(), frames, channels);
    Ok(wave)
}

/// Loads spectrogram pairs, through the on-disk cache when enabled.
pub struct SpectrogramLoader {
    stft:        Stft,
    sample_rate: u32,
    hop_length:  usize,
    n_fft:       usize,
    use_cache:   bool,
}

impl SpectrogramLoader {
    pub fn new(sample_rate: u32, hop_length: usize, n_fft: usize) -> Self {
        Self {
            stft: Stft::new(n_fft, hop_length),
            sample_rate,
            hop_length,
            n_fft,
            use_cache: true,
        }
    }

    #[cfg(test)]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn bins(&self) -> usize {
        self.stft.bins()
    }

    /// Where the cached spectrogram of `audio` lives.
    pub fn cache_path(&self, audio: &Path) -> PathBuf {
        let stem = audio
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        audio.with_file_name(format!(
            "{stem}_sr{}_hop{}_fft{}.npy",
            self.sample_rate, self.hop_length, self.n_fft
        ))
    }

    /// Magnitude spectrograms (mixture, instrumental), each [2, bins, frames]
    /// with the same number of frames.
    pub fn load_pair(&self, pair: &FilePair) -> Result<(Array3<f32>, Array3<f32>)> {
        let x_cache = self.cache_path(pair.mixture());
        let y_cache = self.cache_path(pair.instrumental());

        if self.use_cache && x_cache.exists() && y_cache.exists() {
            let x: Array3<f32> = read_npy(&x_cache)
                .with_context(|| format!("Corrupt cache '{}'", x_cache.display()))?;
            let y: Array3<f32> = read_npy(&y_cache)
                .with_context(|| format!("Corrupt cache '{}'", y_cache.display()))?;
            if x.shape() == y.shape() {
                return Ok((x, y));
            }
            tracing::warn!("Cached spectrograms of '{}' disagree in shape, recomputing", x_cache.display());
        }

        let x_wave = load_wav(pair.mixture(), self.sample_rate)?;
        let y_wave = load_wav(pair.instrumental(), self.sample_rate)?;

        // Align the two recordings on their common length
        let len    = x_wave.len_of(Axis(1)).min(y_wave.len_of(Axis(1)));
        let x_wave = x_wave.slice(s![.., ..len]).to_owned();
        let y_wave = y_wave.slice(s![.., ..len]).to_owned();

        let x = self.stft.magnitude_multi(&x_wave);
        let y = self.stft.magnitude_multi(&y_wave);

        if self.use_cache {
            write_npy(&x_cache, &x)
                .with_context(|| format!("Cannot write cache '{}'", x_cache.display()))?;
            write_npy(&y_cache, &y)
                .with_context(|| format!("Cannot write cache '{}'", y_cache.display()))?;
        }

        Ok((x, y))
    }
}

#[cfg(test)]
pub(crate) mod test_audio {
    use std::path::Path;

    /// Write a stereo 16-bit WAV whose left channel is a sine at `freq` Hz.
    pub fn write_sine(path: &Path, sr: u32, seconds: f32, freq: f32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate:     sr,
            bits_per_sample: 16,
            sample_format:   hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n          = (sr as f32 * seconds) as usize;
        for i in 0..n {
            let v = (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin();
            for c in 0..channels {
                let amp = if c == 0 { 0.5 } else { 0.25 };
                writer.write_sample((v * amp * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_audio::write_sine;
    use super::*;
    use crate::data::corpus::test_dirs::fresh_dir;

    #[test]
    fn test_mono_is_duplicated() {
        let dir  = fresh_dir("mono");
        let path = dir.join("a.wav");
        write_sine(&path, 8000, 0.1, 440.0, 1);

        let wave = load_wav(&path, 8000).unwrap();
        assert_eq!(wave.shape(), &[2, 800]);
        assert_eq!(wave.row(0), wave.row(1));
        assert!(wave.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let dir  = fresh_dir("rate");
        let path = dir.join("a.wav");
        write_sine(&path, 8000, 0.1, 440.0, 2);

        let err = load_wav(&path, 44100).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::SampleRate { found: 8000, expected: 44100, .. })
        ));
    }

    #[test]
    fn test_non_wav_rejected() {
        let err = load_wav(Path::new("song.mp3"), 44100).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_pair_is_cached_and_reused() {
        let dir = fresh_dir("cache");
        let mix = dir.join("mix.wav");
        let ins = dir.join("inst.wav");
        write_sine(&mix, 8000, 0.2, 440.0, 2);
        write_sine(&ins, 8000, 0.1, 220.0, 2);

        let loader = SpectrogramLoader::new(8000, 64, 256);
        let pair   = FilePair::new(&mix, &ins);
        let (x, y) = loader.load_pair(&pair).unwrap();

        // Trimmed to the shorter recording: 800 samples → 800 / 64 + 1 frames
        assert_eq!(x.shape(), &[2, 129, 13]);
        assert_eq!(x.shape(), y.shape());
        assert!(loader.cache_path(&mix).exists());
        assert_eq!(loader.cache_path(&mix), dir.join("mix_sr8000_hop64_fft256.npy"));

        // Remove the audio: the second load must come from the cache
        std::fs::remove_file(&mix).unwrap();
        std::fs::remove_file(&ins).unwrap();
        let (x2, y2) = loader.load_pair(&pair).unwrap();
        assert_eq!(x, x2);
        assert_eq!(y, y2);
    }
}
