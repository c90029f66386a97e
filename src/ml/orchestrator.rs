// ============================================================
// Layer 5 — Training Orchestrator
// ============================================================
// The outer loop of a run:
//
//   for epoch in 0..epochs
//     build a fresh training set     (PatchSource)
//     mixup                          (optional)
//     overwrite random positions with last epoch's oracle set
//     for inner in 0..inner_epochs
//       train one pass               (instance loss accumulates)
//       validate                     (inference mode)
//       record + rewrite the log
//       checkpoint on strict improvement
//       decay the learning rate on a plateau (epoch >= 2)
//     select this epoch's oracle set (oracle_rate > 0)
//
// The decisions themselves live on TrainingState; this file only
// sequences them and performs the side effects they ask for.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::PatchBatcher,
    mixup::mixup,
    oracle::{inject_oracle, select_oracle, OracleSet},
};
use crate::domain::{
    error::TrainError,
    file_pair::FilePair,
    patch_set::PatchSet,
    training_state::{DecayPolicy, TrainingState},
    traits::PatchSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::LossLog};
use crate::ml::{
    model::MaskEstimator,
    trainer::{train_inner_epoch, valid_inner_epoch},
};

/// Loop-shaping settings of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub epochs:           usize,
    pub inner_epochs:     usize,
    pub batch_size:       usize,
    pub val_batch_size:   usize,
    pub cropsize:         usize,
    pub patches:          usize,
    pub oracle_rate:      f64,
    pub oracle_drop_rate: f64,
    /// Beta parameter for mixup; `None` disables it.
    pub mixup_alpha:      Option<f64>,
    pub decay:            DecayPolicy,
}

pub struct Orchestrator<'a, S: PatchSource> {
    config:      OrchestratorConfig,
    source:      &'a S,
    checkpoints: &'a CheckpointManager,
    log:         &'a LossLog,
}

impl<'a, S: PatchSource> Orchestrator<'a, S> {
    pub fn new(
        config:      OrchestratorConfig,
        source:      &'a S,
        checkpoints: &'a CheckpointManager,
        log:         &'a LossLog,
    ) -> Self {
        Self { config, source, checkpoints, log }
    }

    /// Run every epoch and return the final model.
    ///
    /// The checkpoint files, not the returned model, hold the best weights.
    #[allow(clippy::too_many_arguments)]
    pub fn run<B, M, O>(
        &self,
        mut model:   M,
        optim:       &mut O,
        state:       &mut TrainingState,
        train_files: &[FilePair],
        valid:       &PatchSet,
        device:      &B::Device,
        rng:         &mut StdRng,
    ) -> Result<M>
    where
        B: AutodiffBackend,
        M: MaskEstimator<B> + AutodiffModule<B>,
        M::InnerModule: MaskEstimator<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        let cfg           = &self.config;
        let train_batcher = PatchBatcher::<B>::new(device.clone());
        let valid_batcher = PatchBatcher::<B::InnerBackend>::new(device.clone());

        let mut oracle: Option<OracleSet> = None;

        for epoch in 0..cfg.epochs {
            let mut train_set = self.source.training_set(train_files, cfg.cropsize, cfg.patches, rng)?;

            if let Some(alpha) = cfg.mixup_alpha {
                mixup(&mut train_set, alpha, rng)?;
            }

            if let Some(hard) = oracle.take().filter(|h| !h.is_empty()) {
                let positions = inject_oracle(&mut train_set, &hard, rng)?;
                tracing::debug!("Injected {} oracle patches", positions.len());
            }

            tracing::info!("# epoch {}", epoch);
            let mut instance_loss = vec![0.0f32; train_set.len()];

            for inner_epoch in 0..cfg.inner_epochs {
                tracing::info!("  * inner epoch {}", inner_epoch);

                let (trained, train_loss) = train_inner_epoch(
                    &train_set,
                    model,
                    optim,
                    state.learning_rate,
                    cfg.batch_size,
                    &mut instance_loss,
                    &train_batcher,
                    rng,
                )?;
                model = trained;

                let valid_loss = valid_inner_epoch(valid, &model.valid(), cfg.val_batch_size, &valid_batcher)?;

                ensure_finite("training", train_loss, epoch, inner_epoch)?;
                ensure_finite("validation", valid_loss, epoch, inner_epoch)?;

                tracing::info!(
                    "    * training loss = {:.6}, validation loss = {:.6}",
                    train_loss * 1000.0,
                    valid_loss * 1000.0,
                );

                state.record(train_loss, valid_loss);
                self.log.write(&state.log)?;

                if state.checkpoint_decision(valid_loss) {
                    tracing::info!("    * best validation loss");
                    self.checkpoints.save_model::<B, M>(&model, epoch)?;
                }

                if let Some(lr) = state.lr_decay_decision(epoch, &cfg.decay) {
                    tracing::info!("    * learning rate decay: {:.6}", lr);
                }
            }

            if cfg.oracle_rate > 0.0 && cfg.inner_epochs > 0 {
                let inner = cfg.inner_epochs as f32;
                instance_loss.iter_mut().for_each(|l| *l /= inner);

                let hard = select_oracle(&train_set, &instance_loss, cfg.oracle_rate, cfg.oracle_drop_rate, rng)?;
                tracing::info!("  * oracle loss = {:.6}", hard.mean_loss(&instance_loss));
                oracle = Some(hard);
            }
        }

        Ok(model)
    }
}

fn ensure_finite(phase: &'static str, value: f64, epoch: usize, inner_epoch: usize) -> Result<(), TrainError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrainError::NonFiniteLoss { phase, value, epoch, inner_epoch })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;
    use ndarray::{s, Array2, Array4};
    use ndarray_npy::read_npy;
    use rand::{Rng, SeedableRng};

    use crate::data::corpus::test_dirs::fresh_dir;
    use crate::ml::model::UNetConfig;

    type TestBackend = Autodiff<NdArray>;

    const BINS: usize = 8;

    /// Synthetic patches: the target is a fixed fraction of the mixture.
    struct FakeSource {
        poison: bool,
    }

    impl FakeSource {
        fn build(&self, n: usize, width: usize, rng: Option<&mut StdRng>) -> PatchSet {
            let mixture = match rng {
                Some(rng) => Array4::from_shape_fn((n, 2, BINS, width), |_| rng.gen_range(0.0..1.0f32)),
                None      => Array4::from_shape_fn((n, 2, BINS, width), |(i, c, f, t)| ((i + c + f + t) % 9) as f32 / 9.0),
            };
            let mut instrumental = mixture.mapv(|v| 0.6 * v);
            if self.poison {
                // Mid-patch frame: survives the model's border crop
                let mid = width / 2;
                instrumental.slice_mut(s![.., .., .., mid]).fill(f32::NAN);
            }
            PatchSet::new(mixture, instrumental).unwrap()
        }
    }

    impl PatchSource for FakeSource {
        fn training_set(&self, files: &[FilePair], cropsize: usize, patches: usize, rng: &mut StdRng) -> Result<PatchSet> {
            Ok(self.build(files.len() * patches, cropsize, Some(rng)))
        }

        fn validation_set(&self, files: &[FilePair], cropsize: usize, _offset: usize) -> Result<PatchSet> {
            Ok(self.build(files.len(), cropsize, None))
        }
    }

    fn files(n: usize) -> Vec<FilePair> {
        (0..n).map(|i| FilePair::new(format!("m/{i}.wav"), format!("i/{i}.wav"))).collect()
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            epochs:           3,
            inner_epochs:     2,
            batch_size:       2,
            val_batch_size:   3,
            cropsize:         12,
            patches:          2,
            oracle_rate:      0.0,
            oracle_drop_rate: 0.5,
            mixup_alpha:      None,
            decay:            DecayPolicy { lr_decay: 0.9, lr_min: 1e-4, interval: 1 },
        }
    }

    fn run_with(cfg: OrchestratorConfig, source: FakeSource, tag: &str) -> (Result<()>, TrainingState, std::path::PathBuf) {
        let dir     = fresh_dir(tag);
        let ckpt    = CheckpointManager::new(&dir).unwrap();
        let log     = LossLog::new(&dir, "ts");
        let device  = Default::default();
        let mut rng = StdRng::seed_from_u64(2019);

        let model     = UNetConfig::new().with_base_channels(2).with_depth(2).with_offset(2).init::<TestBackend>(&device);
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
        let mut state = TrainingState::new(1e-3);
        let valid     = source.validation_set(&files(3), 16, 2).unwrap();

        let orchestrator = Orchestrator::new(cfg, &source, &ckpt, &log);
        let result = orchestrator
            .run::<TestBackend, _, _>(model, &mut optim, &mut state, &files(3), &valid, &device, &mut rng)
            .map(|_| ());
        (result, state, dir)
    }

    #[test]
    fn test_one_log_row_per_inner_epoch() {
        let (result, state, dir) = run_with(config(), FakeSource { poison: false }, "orch_log");
        result.unwrap();

        assert_eq!(state.log.len(), 6);
        let on_disk: Array2<f64> = read_npy(dir.join("log_ts.npy")).unwrap();
        assert_eq!(on_disk.dim(), (6, 2));
        assert_eq!(on_disk[[5, 1]], state.log[5][1]);

        // The very first validation always improves on +inf
        assert!(dir.join("models").join("model_iter0.mpk").is_file());
        assert!(state.learning_rate >= 1e-4 && state.learning_rate <= 1e-3);
    }

    #[test]
    fn test_oracle_and_mixup_run() {
        let cfg = OrchestratorConfig { oracle_rate: 0.5, mixup_alpha: Some(1.0), ..config() };
        let (result, state, _) = run_with(cfg, FakeSource { poison: false }, "orch_oracle");
        result.unwrap();
        assert_eq!(state.log.len(), 6);
        assert!(state.best_loss.is_finite());
    }

    #[test]
    fn test_non_finite_loss_aborts_before_logging() {
        let (result, state, dir) = run_with(config(), FakeSource { poison: true }, "orch_nan");
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::NonFiniteLoss { phase: "training", epoch: 0, inner_epoch: 0, .. })
        ));
        assert!(state.log.is_empty());
        assert!(!dir.join("log_ts.npy").exists());
    }

    #[test]
    fn test_zero_epochs_is_a_no_op() {
        let cfg = OrchestratorConfig { epochs: 0, ..config() };
        let (result, state, _) = run_with(cfg, FakeSource { poison: false }, "orch_zero");
        result.unwrap();
        assert!(state.log.is_empty());
        assert!(state.best_loss.is_infinite());
    }
}
