// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands, `train` and `split`. Long flags keep their
// snake_case spelling (--hop_length, --val_filelist, ...) and the
// usual one-letter aliases, so existing training scripts carry
// over unchanged.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{split_use_case::SplitConfig, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the U-Net mask estimator
    Train(TrainArgs),

    /// Split the corpus and write the validation file list only
    Split(SplitArgs),
}

/// Where the paired audio lives and how much of it to hold out.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Directory of mixture tracks
    #[arg(long = "mixture_dataset", short = 'm')]
    pub mixture_dataset: PathBuf,

    /// Directory of instrumental tracks, paired with mixtures by sorted position
    #[arg(long = "instrumental_dataset", short = 'i')]
    pub instrumental_dataset: PathBuf,

    /// Fraction of pairs held out for validation
    #[arg(long = "validation_rate", short = 'v', default_value_t = 0.1)]
    pub validation_rate: f64,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// GPU adapter index; negative runs on the CPU
    #[arg(long, short = 'g', default_value_t = -1, allow_negative_numbers = true)]
    pub gpu: i32,

    #[arg(long, short = 's', default_value_t = 2019)]
    pub seed: u64,

    /// Sample rate every file must have
    #[arg(long, short = 'r', default_value_t = 44100)]
    pub sr: u32,

    #[arg(long = "hop_length", short = 'l', default_value_t = 1024)]
    pub hop_length: usize,

    #[arg(long = "n_fft", default_value_t = 2048)]
    pub n_fft: usize,

    #[arg(long = "learning_rate", default_value_t = 0.001)]
    pub learning_rate: f64,

    #[arg(long = "lr_min", default_value_t = 0.0001)]
    pub lr_min: f64,

    #[arg(long = "lr_decay", default_value_t = 0.9)]
    pub lr_decay: f64,

    /// Inner epochs without improvement before the learning rate decays
    #[arg(long = "lr_decay_interval", default_value_t = 6)]
    pub lr_decay_interval: usize,

    #[arg(long = "batchsize", short = 'B', default_value_t = 8)]
    pub batchsize: usize,

    #[arg(long = "val_batchsize", short = 'b', default_value_t = 8)]
    pub val_batchsize: usize,

    /// JSON list of [mixture, instrumental] pairs to validate on
    #[arg(long = "val_filelist", short = 'V')]
    pub val_filelist: Option<PathBuf>,

    /// Frames per training patch
    #[arg(long, short = 'c', default_value_t = 448)]
    pub cropsize: usize,

    /// Frames per validation window
    #[arg(long = "val_cropsize", short = 'C', default_value_t = 896)]
    pub val_cropsize: usize,

    /// Random patches cut from each training pair per epoch
    #[arg(long, short = 'p', default_value_t = 16)]
    pub patches: usize,

    #[arg(long, short = 'E', default_value_t = 100)]
    pub epoch: usize,

    /// Passes over each epoch's patches
    #[arg(long = "inner_epoch", short = 'e', default_value_t = 4)]
    pub inner_epoch: usize,

    /// Fraction of hardest patches replayed in the next epoch; 0 disables
    #[arg(long = "oracle_rate", short = 'O', default_value_t = 0.0)]
    pub oracle_rate: f64,

    /// Fraction of the hardest patches randomly left out of the replay
    #[arg(long = "oracle_drop_rate", short = 'o', default_value_t = 0.5)]
    pub oracle_drop_rate: f64,

    #[arg(long, short = 'M')]
    pub mixup: bool,

    #[arg(long = "mixup_alpha", short = 'a', default_value_t = 1.0)]
    pub mixup_alpha: f64,

    /// Checkpoint to start from (models/model_iter*.mpk)
    #[arg(long = "pretrained_model", short = 'P')]
    pub pretrained_model: Option<PathBuf>,

    /// Directory for logs, manifests and models/
    #[arg(long = "out_dir", default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long = "base_channels", default_value_t = 16)]
    pub base_channels: usize,

    /// Encoder levels of the U-Net
    #[arg(long, default_value_t = 4)]
    pub depth: usize,

    /// Frames the mask drops at each time border
    #[arg(long, default_value_t = 32)]
    pub offset: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            gpu:                  a.gpu,
            seed:                 a.seed,
            sr:                   a.sr,
            hop_length:           a.hop_length,
            n_fft:                a.n_fft,
            mixture_dataset:      a.corpus.mixture_dataset,
            instrumental_dataset: a.corpus.instrumental_dataset,
            validation_rate:      a.corpus.validation_rate,
            learning_rate:        a.learning_rate,
            lr_min:               a.lr_min,
            lr_decay:             a.lr_decay,
            lr_decay_interval:    a.lr_decay_interval,
            batchsize:            a.batchsize,
            val_batchsize:        a.val_batchsize,
            val_filelist:         a.val_filelist,
            cropsize:             a.cropsize,
            val_cropsize:         a.val_cropsize,
            patches:              a.patches,
            epoch:                a.epoch,
            inner_epoch:          a.inner_epoch,
            oracle_rate:          a.oracle_rate,
            oracle_drop_rate:     a.oracle_drop_rate,
            mixup:                a.mixup,
            mixup_alpha:          a.mixup_alpha,
            pretrained_model:     a.pretrained_model,
            out_dir:              a.out_dir,
            base_channels:        a.base_channels,
            depth:                a.depth,
            offset:               a.offset,
        }
    }
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long, short = 's', default_value_t = 2019)]
    pub seed: u64,

    #[arg(long = "out_dir", default_value = ".")]
    pub out_dir: PathBuf,
}

impl From<SplitArgs> for SplitConfig {
    fn from(a: SplitArgs) -> Self {
        SplitConfig {
            mixture_dataset:      a.corpus.mixture_dataset,
            instrumental_dataset: a.corpus.instrumental_dataset,
            validation_rate:      a.corpus.validation_rate,
            seed:                 a.seed,
            out_dir:              a.out_dir,
        }
    }
}
