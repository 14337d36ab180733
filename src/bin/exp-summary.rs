//! # Experiment summary
//! Prints the one-line summary of a single experiment.

use abes_summary::{cli::CommonArgs, diagnostics::DiagnosticHook, summary::compute_summary};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Arg {
    /// Experiment ID, YYYYMMDD.nnn
    pub exp_id: String,
    #[clap(flatten)]
    pub common: CommonArgs,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Arg::parse();
    let config = args.common.config()?;
    let source = args.common.source(&config)?;
    let mut diagnostics = args.common.diagnostics();

    let record = compute_summary(
        source.as_ref(),
        &args.exp_id,
        &config,
        diagnostics
            .as_mut()
            .map(|hook| &mut **hook as &mut dyn DiagnosticHook),
    )
    .await;
    println!("{record}");

    Ok(())
}
