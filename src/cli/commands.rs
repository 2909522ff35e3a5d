// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//   generate — write a random ENAS macro architecture + weights
//   summary  — load an artifact folder and describe the model
//   predict  — load it and classify a random batch
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::model_config::ModelConfig;
use crate::domain::sampler::SamplerConfig;
use crate::ml::model::ImageModelOptions;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample an architecture and write it as an artifact folder
    Generate(GenerateArgs),

    /// Print the structure of a stored model
    Summary(SummaryArgs),

    /// Run a stored model on a batch of random images
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Folder to write enas_macro.json and its weights into
    #[arg(long, default_value = "data/enas")]
    pub folder_path: String,

    /// Number of searched layers
    #[arg(long, default_value_t = 12)]
    pub num_layers: usize,

    /// Channel width of every layer (even, for factorized reduction)
    #[arg(long, default_value_t = 24)]
    pub out_filters: usize,

    /// Channels of the input images
    #[arg(long, default_value_t = 3)]
    pub in_channels: usize,

    #[arg(long, default_value_t = 10)]
    pub num_classes: usize,

    /// Dropout probability in front of the dense layer
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Seed for a reproducible architecture
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            folder_path: a.folder_path,
            sampler: SamplerConfig {
                num_layers:  a.num_layers,
                in_channels: a.in_channels,
                out_filters: a.out_filters,
                num_classes: a.num_classes,
                dropout:     a.dropout,
            },
            seed: a.seed,
        }
    }
}

/// Model selection shared by `summary` and `predict`.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// JSON model config; flags below override its fields
    #[arg(long)]
    pub config: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// Folder holding enas_macro.json
    #[arg(long)]
    pub folder_path: Option<String>,

    /// Expected number of classes
    #[arg(long)]
    pub num_classes: Option<usize>,

    /// Per-channel mean, comma separated
    #[arg(long, value_delimiter = ',')]
    pub norm_mean: Option<Vec<f32>>,

    /// Per-channel standard deviation, comma separated
    #[arg(long, value_delimiter = ',')]
    pub norm_std: Option<Vec<f32>>,

    /// Ignore stored weights and start from random parameters
    #[arg(long)]
    pub no_weights: bool,
}

impl ModelArgs {
    /// Start from the config file (or defaults) and apply the flags.
    pub fn into_config(self) -> Result<ModelConfig> {
        let mut cfg = match &self.config {
            Some(path) => ModelConfig::load(path)?,
            None       => ModelConfig::default(),
        };
        if let Some(name) = self.model {
            cfg.name = name;
        }
        if self.folder_path.is_some() {
            cfg.folder_path = self.folder_path;
        }
        let ImageModelOptions { num_classes, norm_mean, norm_std, .. } = &mut cfg.options;
        if self.num_classes.is_some() {
            *num_classes = self.num_classes;
        }
        if self.norm_mean.is_some() {
            *norm_mean = self.norm_mean;
        }
        if self.norm_std.is_some() {
            *norm_std = self.norm_std;
        }
        if self.no_weights {
            cfg.options.load_weights = false;
        }
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 32)]
    pub height: usize,

    #[arg(long, default_value_t = 32)]
    pub width: usize,

    /// Seed for the random input batch
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "enas-vision", "predict",
            "--folder-path", "runs/x",
            "--norm-mean", "0.5,0.5,0.5",
            "--norm-std", "0.2,0.2,0.2",
            "--no-weights",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.batch_size, 4);

        let cfg = args.model.into_config().unwrap();
        assert_eq!(cfg.name, "enas");
        assert_eq!(cfg.folder_path.as_deref(), Some("runs/x"));
        assert_eq!(cfg.options.norm_mean, Some(vec![0.5, 0.5, 0.5]));
        assert!(!cfg.options.load_weights);
    }

    #[test]
    fn test_config_file_then_flags() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model_config.json");
        std::fs::write(&path, r#"{ "folder_path": "runs/a", "num_classes": 10 }"#).unwrap();

        let args = ModelArgs {
            config:      Some(path.display().to_string()),
            model:       None,
            folder_path: None,
            num_classes: Some(100),
            norm_mean:   None,
            norm_std:    None,
            no_weights:  false,
        };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.folder_path.as_deref(), Some("runs/a"));
        assert_eq!(cfg.options.num_classes, Some(100));
        assert!(cfg.options.load_weights);
    }

    #[test]
    fn test_generate_args_into_config() {
        let cli = Cli::try_parse_from(["enas-vision", "generate", "--num-layers", "6", "--seed", "9"])
            .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let cfg: GenerateConfig = args.into();
        assert_eq!(cfg.sampler.num_layers, 6);
        assert_eq!(cfg.sampler.out_filters, 24);
        assert_eq!(cfg.seed, Some(9));
    }
}
