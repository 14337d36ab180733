use std::{path::PathBuf, sync::Arc};

use clap::Args;

use crate::{
    cache::CachedSource,
    config::SummaryConfig,
    diagnostics::{DiagnosticHook, PlotlyDiagnostics},
    directory::DirectorySource,
    error::SummaryError,
    source::{DataSource, TimeRange},
};

/// Options shared by `exp-summary` and `exp-summaries`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the config file in yaml format
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Directory holding one folder per experiment
    #[clap(long)]
    pub data_path: Option<PathBuf>,
    /// Processing time range in seconds, START,END
    #[clap(long)]
    pub time_range: Option<TimeRange>,
    /// Channel numbers, comma separated
    #[clap(long, value_delimiter = ',')]
    pub channels: Option<Vec<u16>>,
    /// Experiment whose chopper timing defines beam on/off
    #[clap(long)]
    pub chopper_reference: Option<String>,
    /// Keep retrieved data in this directory
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,
    /// Write a plot of every channel into this directory
    #[clap(long)]
    pub diagnostics: Option<PathBuf>,
}

impl CommonArgs {
    /// Config file (or defaults) with command line values on top.
    pub fn config(&self) -> Result<SummaryConfig, SummaryError> {
        let mut config = match &self.config {
            Some(path) => SummaryConfig::load(path)?,
            None => SummaryConfig::default(),
        };
        if let Some(data_path) = &self.data_path {
            config.data_path = Some(data_path.clone());
        }
        if let Some(time_range) = self.time_range {
            config.time_range = Some(time_range);
        }
        if let Some(channels) = &self.channels {
            config.channels = channels.clone();
        }
        if let Some(reference) = &self.chopper_reference {
            config.chopper_reference = Some(reference.clone());
        }
        Ok(config)
    }

    pub fn source(&self, config: &SummaryConfig) -> Result<Arc<dyn DataSource>, SummaryError> {
        let data_path = config.data_path()?;
        let directory = DirectorySource::new(data_path);
        Ok(match &self.cache_dir {
            Some(cache_dir) => Arc::new(CachedSource::new(
                directory,
                cache_dir.clone(),
                data_path.display(),
            )),
            None => Arc::new(directory),
        })
    }

    pub fn diagnostics(&self) -> Option<Box<dyn DiagnosticHook>> {
        self.diagnostics
            .clone()
            .map(|dir| Box::new(PlotlyDiagnostics::new(dir)) as Box<dyn DiagnosticHook>)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[clap(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn flags_override_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_file = tmp.path().join("summary.yaml");
        std::fs::write(
            &config_file,
            "data_path: /from/file\nchannels: [1, 2]\npace_secs: 0.5\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "exp-summary",
            "--config",
            config_file.to_str().unwrap(),
            "--channels",
            "12,13,14",
            "--time-range",
            "0.5,2.0",
        ]);
        let config = cli.common.config().unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("/from/file")));
        assert_eq!(config.channels, vec![12, 13, 14]);
        assert_eq!(config.time_range, Some(TimeRange { start: 0.5, end: 2.0 }));
        assert_eq!(config.pace_secs, 0.5);
        assert!(cli.common.diagnostics().is_none());
    }

    #[test]
    fn source_needs_data_path() {
        let cli = Cli::parse_from(["exp-summary"]);
        let config = cli.common.config().unwrap();
        assert!(matches!(cli.common.source(&config), Err(SummaryError::MissingDataPath)));
    }
}
