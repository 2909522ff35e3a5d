// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with `clap` and routes each subcommand to a
// Layer 2 use case. Printing results happens here and only here.
//
//   1. `generate` — sample an architecture, write the artifact folder
//   2. `summary`  — load a folder and print the model structure
//   3. `predict`  — load a folder and classify random images
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, PredictArgs, SummaryArgs};

#[derive(Parser, Debug)]
#[command(
    name = "enas-vision",
    version,
    about = "Rebuild ENAS macro-search image classifiers from stored architectures."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => Self::run_generate(args),
            Commands::Summary(args)  => Self::run_summary(args),
            Commands::Predict(args)  => Self::run_predict(args),
        }
    }

    fn run_generate(args: GenerateArgs) -> Result<()> {
        use crate::application::generate_use_case::GenerateUseCase;

        tracing::info!("Generating architecture into: {}", args.folder_path);

        let report = GenerateUseCase::new(args.into()).execute()?;

        println!("Wrote {}", report.folder_path);
        println!("  layers:      {}", report.num_layers);
        println!("  pool layers: {:?}", report.pool_layers);
        println!("  parameters:  {}", report.num_params);
        Ok(())
    }

    fn run_summary(args: SummaryArgs) -> Result<()> {
        use crate::application::inspect_use_case::InspectUseCase;

        let use_case = InspectUseCase::new(args.model.into_config()?)?;
        println!("{}", use_case.summary());
        Ok(())
    }

    fn run_predict(args: PredictArgs) -> Result<()> {
        use crate::application::inspect_use_case::InspectUseCase;

        let use_case    = InspectUseCase::new(args.model.into_config()?)?;
        let predictions = use_case.predict(args.batch_size, args.height, args.width, args.seed)?;

        println!();
        for (i, p) in predictions.iter().enumerate() {
            println!("image {:>3}: class {:>4}  (p = {:.4})", i, p.class, p.confidence);
        }
        Ok(())
    }
}
