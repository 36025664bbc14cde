mod app;
mod cli;
mod color;
mod config;
mod data;
mod error;
mod pipeline;
mod render;
mod state;
mod ui;

use std::process::ExitCode;

use clap::Parser;

use cli::{Args, Command};
use config::ReportConfig;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = ReportConfig::load_or_default(&args.config);
    args.apply(&mut cfg);
    log::debug!("Effective config: {cfg:?}");

    let command = args.resolved_command();
    let (charts, failed) = match &command {
        Command::View { dir } => {
            let dir = dir.clone().unwrap_or_else(|| {
                cfg.output_dir
                    .clone()
                    .unwrap_or_else(|| cfg.data_dir.join("charts"))
            });
            match pipeline::scan_charts(&dir) {
                Ok(charts) => (charts, false),
                Err(e) => {
                    log::error!("{e:#}");
                    return ExitCode::FAILURE;
                }
            }
        }
        _ => {
            let report = pipeline::run(&command, &cfg);
            (report.artifacts, report.failed)
        }
    };

    if cfg.show || matches!(command, Command::View { .. }) {
        if let Err(e) = app::run_viewer(charts, cfg) {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
