#![allow(dead_code)]
#![recursion_limit = "256"]
// ============================================================
// enas-vision — entry point
// ============================================================
// Layers, outermost first:
//   1. cli          — argument parsing, printing
//   2. application  — use cases
//   3. domain       — architecture types, errors, traits
//   5. ml           — burn modules and the model factory
//   6. infra        — artifact folder I/O

mod cli;
mod application;
mod domain;
mod ml;
mod infra;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG wins; otherwise our own crate logs at info.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("enas_vision=info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    cli.run()
}
