// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2.
//
//   1. `train` — a full training run
//   2. `split` — write a validation manifest for later runs
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SplitArgs, TrainArgs};

use crate::application::run_timestamp;

#[derive(Parser, Debug)]
#[command(
    name = "vocal-remover",
    version = "0.1.0",
    about = "Train a U-Net that masks vocals out of mixture spectrograms."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Split(args) => run_split(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!(
        "Training on '{}' / '{}'",
        args.corpus.mixture_dataset.display(),
        args.corpus.instrumental_dataset.display()
    );

    TrainUseCase::new(args.into()).execute(&run_timestamp())?;
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<()> {
    use crate::application::split_use_case::SplitUseCase;

    let path = SplitUseCase::new(args.into()).execute(&run_timestamp())?;
    println!("Validation file list written to '{}'", path.display());
    Ok(())
}
