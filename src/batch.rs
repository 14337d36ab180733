use std::{fs::OpenOptions, io::Write};

use indicatif::ProgressStyle;

use crate::{
    config::SummaryConfig,
    diagnostics::DiagnosticHook,
    error::SummaryError,
    get_experiments_by_pattern,
    source::DataSource,
    summary::{compute_summary, SummaryRecord},
};

/// Summarizes every experiment matching `pattern` under the configured data
/// path, appending one line per experiment to the output file.
///
/// Each line is flushed as soon as it is written, so an interrupted batch
/// leaves every finished experiment in the file. Failed summaries are lines
/// like any other; only setup and output errors stop the batch.
pub async fn compute_summaries(
    source: &dyn DataSource,
    pattern: &str,
    config: &SummaryConfig,
    mut diagnostics: Option<&mut dyn DiagnosticHook>,
) -> Result<Vec<SummaryRecord>, SummaryError> {
    let data_path = config.data_path()?;
    let pace = config.pace()?;
    let experiments = get_experiments_by_pattern(data_path, pattern)?;
    log::info!(
        "{} experiments match '{pattern}' in {}",
        experiments.len(),
        data_path.display()
    );

    let output = &config.output_file;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .map_err(|err| SummaryError::io(output, err))?;

    let pb = indicatif::ProgressBar::new(experiments.len() as u64);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar} {pos:>7}/{len:7} {msg}")
    {
        pb.set_style(style);
    }

    let mut records = Vec::with_capacity(experiments.len());

    for exp_id in experiments {
        pb.set_message(exp_id.clone());

        let hook = diagnostics
            .as_mut()
            .map(|hook| &mut **hook as &mut dyn DiagnosticHook);
        let record = compute_summary(source, &exp_id, config, hook).await;
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }

        writeln!(file, "{record}")
            .and_then(|_| file.flush())
            .map_err(|err| SummaryError::io(output, err))?;

        records.push(record);
        pb.inc(1);
    }
    pb.finish();

    Ok(records)
}
