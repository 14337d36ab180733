//! # Experiment summaries
//! Summarizes every experiment matching a pattern (`2018101?.*`) into one
//! text file, one line per experiment.

use std::path::PathBuf;

use abes_summary::{batch::compute_summaries, cli::CommonArgs, diagnostics::DiagnosticHook};
use clap::Parser;

#[cfg(target_family = "unix")]
use tikv_jemallocator::Jemalloc;
#[cfg(target_family = "unix")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Arg {
    /// Experiment ID pattern, `*` and `?` wildcards
    pub pattern: String,
    #[clap(flatten)]
    pub common: CommonArgs,
    /// Output file, lines are appended
    #[clap(long)]
    pub output: Option<PathBuf>,
    /// Pause after each experiment, seconds
    #[clap(long)]
    pub pace: Option<f64>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Arg::parse();
    let mut config = args.common.config()?;
    if let Some(output) = args.output {
        config.output_file = output;
    }
    if let Some(pace) = args.pace {
        config.pace_secs = pace;
    }

    let source = args.common.source(&config)?;
    let mut diagnostics = args.common.diagnostics();

    let records = compute_summaries(
        source.as_ref(),
        &args.pattern,
        &config,
        diagnostics
            .as_mut()
            .map(|hook| &mut **hook as &mut dyn DiagnosticHook),
    )
    .await?;
    log::info!(
        "{} summaries written to {}",
        records.len(),
        config.output_file.display()
    );

    Ok(())
}
