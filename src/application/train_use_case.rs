// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Sets up a training run and hands it to the orchestrator:
//
//   Step 1: Validate the configuration
//   Step 2: Pick the backend and device        (--gpu)
//   Step 3: Seed Burn and the run RNG          (--seed)
//   Step 4: Build the U-Net, load pretrained   (Layer 5 - ml)
//   Step 5: Pair and split the corpus          (Layer 4 - data)
//   Step 6: Write val_<ts>.json, config_<ts>   (Layer 6 - infra)
//   Step 7: Build the validation set           (Layer 4 - data)
//   Step 8: Run the orchestrator               (Layer 5 - ml)
//
// Backends:
//   --gpu < 0  → Autodiff<NdArray> on the CPU
//   --gpu >= 0 → Autodiff<Wgpu> on that discrete adapter
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::split_use_case::resolve_split;
use crate::data::{loader::SpectrogramLoader, patches::SpectrogramPatchSource};
use crate::domain::{
    error::TrainError,
    training_state::{DecayPolicy, TrainingState},
    traits::PatchSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    manifest::{read_manifest, write_manifest},
    metrics::LossLog,
};
use crate::ml::{
    model::{MaskEstimator, UNet, UNetConfig},
    orchestrator::{Orchestrator, OrchestratorConfig},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. Saved as config_<timestamp>.json so a run
// can be reproduced (and its U-Net rebuilt) later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub gpu:                  i32,
    pub seed:                 u64,
    pub sr:                   u32,
    pub hop_length:           usize,
    pub n_fft:                usize,
    pub mixture_dataset:      PathBuf,
    pub instrumental_dataset: PathBuf,
    pub validation_rate:      f64,
    pub learning_rate:        f64,
    pub lr_min:               f64,
    pub lr_decay:             f64,
    pub lr_decay_interval:    usize,
    pub batchsize:            usize,
    pub val_batchsize:        usize,
    pub val_filelist:         Option<PathBuf>,
    pub cropsize:             usize,
    pub val_cropsize:         usize,
    pub patches:              usize,
    pub epoch:                usize,
    pub inner_epoch:          usize,
    pub oracle_rate:          f64,
    pub oracle_drop_rate:     f64,
    pub mixup:                bool,
    pub mixup_alpha:          f64,
    pub pretrained_model:     Option<PathBuf>,
    pub out_dir:              PathBuf,
    pub base_channels:        usize,
    pub depth:                usize,
    pub offset:               usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            gpu:                  -1,
            seed:                 2019,
            sr:                   44100,
            hop_length:           1024,
            n_fft:                2048,
            mixture_dataset:      PathBuf::new(),
            instrumental_dataset: PathBuf::new(),
            validation_rate:      0.1,
            learning_rate:        0.001,
            lr_min:               0.0001,
            lr_decay:             0.9,
            lr_decay_interval:    6,
            batchsize:            8,
            val_batchsize:        8,
            val_filelist:         None,
            cropsize:             448,
            val_cropsize:         896,
            patches:              16,
            epoch:                100,
            inner_epoch:          4,
            oracle_rate:          0.0,
            oracle_drop_rate:     0.5,
            mixup:                false,
            mixup_alpha:          1.0,
            pretrained_model:     None,
            out_dir:              PathBuf::from("."),
            base_channels:        16,
            depth:                4,
            offset:               32,
        }
    }
}

impl TrainConfig {
    /// Reject settings the run could only fail on later.
    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |msg: String| Err(TrainError::InvalidConfig(msg));

        if !(0.0..1.0).contains(&self.validation_rate) {
            return invalid(format!("validation rate {} outside [0, 1)", self.validation_rate));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return invalid(format!("learning rate {} must be positive", self.learning_rate));
        }
        if !(0.0..=self.learning_rate).contains(&self.lr_min) {
            return invalid(format!("lr_min {} outside [0, learning_rate]", self.lr_min));
        }
        if self.lr_decay.is_nan() || self.lr_decay <= 0.0 || self.lr_decay > 1.0 {
            return invalid(format!("lr_decay {} outside (0, 1]", self.lr_decay));
        }
        if self.batchsize == 0 || self.val_batchsize == 0 {
            return invalid("batch sizes must be positive".to_string());
        }
        if self.patches == 0 || self.inner_epoch == 0 {
            return invalid("patches and inner_epoch must be positive".to_string());
        }
        if self.hop_length == 0 || self.n_fft == 0 || self.depth == 0 || self.base_channels == 0 {
            return invalid("hop_length, n_fft, depth and base_channels must be positive".to_string());
        }
        if self.cropsize <= 2 * self.offset || self.val_cropsize <= 2 * self.offset {
            return invalid(format!(
                "crop sizes ({}, {}) must exceed twice the model offset {}",
                self.cropsize, self.val_cropsize, self.offset
            ));
        }
        if !(0.0..=1.0).contains(&self.oracle_rate) {
            return invalid(format!("oracle rate {} outside [0, 1]", self.oracle_rate));
        }
        if !(0.0..=1.0).contains(&self.oracle_drop_rate) {
            return invalid(format!("oracle drop rate {} outside [0, 1]", self.oracle_drop_rate));
        }
        if self.mixup && (!self.mixup_alpha.is_finite() || self.mixup_alpha <= 0.0) {
            return invalid(format!("mixup alpha {} must be positive and finite", self.mixup_alpha));
        }
        Ok(())
    }

    pub fn unet(&self) -> UNetConfig {
        UNetConfig::new()
            .with_base_channels(self.base_channels)
            .with_depth(self.depth)
            .with_offset(self.offset)
    }
}

impl From<&TrainConfig> for OrchestratorConfig {
    fn from(cfg: &TrainConfig) -> Self {
        OrchestratorConfig {
            epochs:           cfg.epoch,
            inner_epochs:     cfg.inner_epoch,
            batch_size:       cfg.batchsize,
            val_batch_size:   cfg.val_batchsize,
            cropsize:         cfg.cropsize,
            patches:          cfg.patches,
            oracle_rate:      cfg.oracle_rate,
            oracle_drop_rate: cfg.oracle_drop_rate,
            mixup_alpha:      cfg.mixup.then_some(cfg.mixup_alpha),
            decay: DecayPolicy {
                lr_decay: cfg.lr_decay,
                lr_min:   cfg.lr_min,
                interval: cfg.lr_decay_interval,
            },
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the whole training pipeline; output files carry `timestamp`.
    pub fn execute(&self, timestamp: &str) -> Result<TrainingState> {
        self.config.validate()?;

        if self.config.gpu < 0 {
            tracing::info!("Using NdArray CPU backend");
            self.run::<Autodiff<NdArray>>(NdArrayDevice::Cpu, timestamp)
        } else {
            let device = WgpuDevice::DiscreteGpu(self.config.gpu as usize);
            tracing::info!("Using WGPU device: {:?}", device);
            self.run::<Autodiff<Wgpu>>(device, timestamp)
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device, timestamp: &str) -> Result<TrainingState> {
        let cfg = &self.config;

        // ── Seeding ───────────────────────────────────────────────────────────
        B::seed(&device, cfg.seed);
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.out_dir.display()))?;
        let checkpoints = CheckpointManager::new(&cfg.out_dir)?;

        // ── Model and optimiser ───────────────────────────────────────────────
        let mut model: UNet<B> = cfg.unet().init(&device);
        if let Some(path) = &cfg.pretrained_model {
            model = CheckpointManager::load_pretrained(model, path, &device)?;
        }
        tracing::info!(
            "U-Net ready: depth={}, base_channels={}, offset={}",
            cfg.depth, cfg.base_channels, cfg.offset
        );

        // Adam with the usual β1 = 0.9, β2 = 0.999
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        // ── Corpus split ──────────────────────────────────────────────────────
        let manifest = match &cfg.val_filelist {
            Some(path) => read_manifest(path)?,
            None       => Vec::new(),
        };
        let split = resolve_split(
            &cfg.mixture_dataset,
            &cfg.instrumental_dataset,
            cfg.validation_rate,
            &manifest,
            &mut rng,
        )?;

        write_manifest(&cfg.out_dir, timestamp, &split.val)?;
        for (i, pair) in split.val.iter().enumerate() {
            tracing::info!("{} {} {}", i + 1, file_name(pair.mixture()), file_name(pair.instrumental()));
        }
        checkpoints.save_config(cfg, timestamp)?;

        // ── Validation set (built once) ───────────────────────────────────────
        let loader = SpectrogramLoader::new(cfg.sr, cfg.hop_length, cfg.n_fft);
        let source = SpectrogramPatchSource::new(loader);
        let valid  = source.validation_set(&split.val, cfg.val_cropsize, model.offset())?;
        tracing::info!("Validation set: {} patches", valid.len());

        // ── Train ─────────────────────────────────────────────────────────────
        let log          = LossLog::new(&cfg.out_dir, timestamp);
        tracing::info!("Logging losses to '{}'", log.path().display());
        let mut state    = TrainingState::new(cfg.learning_rate);
        let orchestrator = Orchestrator::new(cfg.into(), &source, &checkpoints, &log);

        orchestrator.run::<B, _, _>(model, &mut optim, &mut state, &split.train, &valid, &device, &mut rng)?;

        tracing::info!(
            "Training complete: best validation loss = {:.6}",
            state.best_loss * 1000.0
        );
        Ok(state)
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use ndarray_npy::read_npy;

    use crate::data::corpus::test_dirs::fresh_dir;
    use crate::data::loader::test_audio::write_sine;
    use crate::domain::error::DataError;

    #[test]
    fn test_default_is_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let bad = [
            TrainConfig { validation_rate: 1.0, ..Default::default() },
            TrainConfig { batchsize: 0, ..Default::default() },
            TrainConfig { cropsize: 64, ..Default::default() },
            TrainConfig { oracle_drop_rate: 1.5, ..Default::default() },
            TrainConfig { mixup: true, mixup_alpha: 0.0, ..Default::default() },
            TrainConfig { lr_min: 0.01, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn test_full_oracle_drop_is_valid() {
        TrainConfig { oracle_rate: 0.5, oracle_drop_rate: 1.0, ..Default::default() }.validate().unwrap();
    }

    #[test]
    fn test_mixup_flag_maps_to_alpha() {
        let off: OrchestratorConfig = (&TrainConfig::default()).into();
        assert_eq!(off.mixup_alpha, None);

        let on: OrchestratorConfig = (&TrainConfig { mixup: true, mixup_alpha: 0.4, ..Default::default() }).into();
        assert_eq!(on.mixup_alpha, Some(0.4));
        assert_eq!(on.decay.interval, 6);
    }

    fn tiny_run(tag: &str, pairs: usize) -> (TrainConfig, PathBuf) {
        let root = fresh_dir(tag);
        let mix  = root.join("mix");
        let inst = root.join("inst");
        fs::create_dir_all(&mix).unwrap();
        fs::create_dir_all(&inst).unwrap();
        for i in 0..pairs {
            let freq = 220.0 * (i + 1) as f32;
            write_sine(&mix.join(format!("{i}.wav")), 8000, 0.25, freq, 2);
            write_sine(&inst.join(format!("{i}.wav")), 8000, 0.25, freq, 1);
        }

        let cfg = TrainConfig {
            sr:                   8000,
            hop_length:           16,
            n_fft:                32,
            mixture_dataset:      mix,
            instrumental_dataset: inst,
            validation_rate:      0.25,
            batchsize:            2,
            val_batchsize:        4,
            cropsize:             24,
            val_cropsize:         24,
            patches:              2,
            epoch:                2,
            inner_epoch:          2,
            oracle_rate:          0.5,
            out_dir:              root.join("out"),
            base_channels:        2,
            depth:                2,
            offset:               4,
            ..Default::default()
        };
        (cfg, root)
    }

    #[test]
    fn test_end_to_end_on_cpu() {
        let (cfg, root) = tiny_run("train_e2e", 4);
        let out   = cfg.out_dir.clone();
        let state = TrainUseCase::new(cfg).execute("20240101000000").unwrap();

        assert_eq!(state.log.len(), 4);
        assert!(out.join("val_20240101000000.json").is_file());
        assert!(out.join("config_20240101000000.json").is_file());
        assert!(out.join("models").join("model_iter0.mpk").is_file());

        let log: Array2<f64> = read_npy(out.join("log_20240101000000.npy")).unwrap();
        assert_eq!(log.dim(), (4, 2));
        assert!(root.join("mix").join("0_sr8000_hop16_fft32.npy").is_file());
    }

    #[test]
    fn test_resume_from_manifest_and_pretrained() {
        let (cfg, _) = tiny_run("train_resume", 4);
        let first    = TrainUseCase::new(TrainConfig { epoch: 1, inner_epoch: 1, ..cfg.clone() });
        first.execute("20240101000000").unwrap();

        let out    = cfg.out_dir.clone();
        let second = TrainUseCase::new(TrainConfig {
            epoch:            1,
            inner_epoch:      1,
            val_filelist:     Some(out.join("val_20240101000000.json")),
            pretrained_model: Some(out.join("models").join("model_iter0.mpk")),
            ..cfg
        });
        second.execute("20240101000001").unwrap();

        let a = fs::read_to_string(out.join("val_20240101000000.json")).unwrap();
        let b = fs::read_to_string(out.join("val_20240101000001.json")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_pairs_for_a_validation_split() {
        let (cfg, _) = tiny_run("train_small", 2);
        let err = TrainUseCase::new(cfg).execute("20240101000000").unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::EmptySplit("validation"))));
    }
}
