use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ReportConfig;
use crate::data::normalize::NormalizationMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config JSON
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Base directory for input files (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory to write charts to (overrides config)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// How percentage-scale metric columns are rescaled (overrides config)
    #[arg(long, value_enum)]
    pub normalize: Option<NormalizationMode>,

    /// Open the chart viewer after rendering
    #[arg(long, default_value_t = false)]
    pub show: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// RGB-composite grid of accuracy, NMI and ARI
    Rgb,
    /// Grid of single-row heatmaps, one per dataset and algorithm
    Heatmaps,
    /// Bivariate KDE of accuracy against NMI
    Kde,
    /// Original vs PCA bar charts
    Compare {
        /// Comparison CSV (defaults to the configured file)
        file: Option<PathBuf>,
    },
    /// Every chart
    All,
    /// Browse PNG charts in a directory
    View {
        dir: Option<PathBuf>,
    },
}

impl Args {
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::All)
    }

    /// Fold command-line overrides into `cfg`.
    pub fn apply(&self, cfg: &mut ReportConfig) {
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            cfg.output_dir = Some(dir.clone());
        }
        if let Some(mode) = self.normalize {
            cfg.normalization = mode;
        }
        if self.show {
            cfg.show = true;
        }
    }
}
