// Defaults of every tunable in one place.
// Loaded from yaml, then overridden from the command line (see cli.rs).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    error::SummaryError,
    source::{SignalOptions, TimeRange},
};

pub const DEFAULT_OUTPUT_FILE: &str = "exp_summaries.txt";
pub const DEFAULT_CHANNEL_PREFIX: &str = "ABES-";

pub fn default_channels() -> Vec<u16> {
    (10..=25).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Root holding one directory per experiment
    pub data_path: Option<PathBuf>,
    pub time_range: Option<TimeRange>,
    pub channels: Vec<u16>,
    pub channel_prefix: String,
    /// Experiment whose chopper timing defines the beam states.
    /// `None` uses the summarized experiment itself.
    pub chopper_reference: Option<String>,
    /// Beam deflection setting whose chopper timing is used
    pub chopper_deflection: u8,
    pub chopper_start_us: f64,
    pub chopper_end_us: f64,
    pub signal: SignalOptions,
    pub threshold_fraction: f64,
    /// Delay after each experiment of a batch, seconds
    pub pace_secs: f64,
    pub output_file: PathBuf,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            time_range: None,
            channels: default_channels(),
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_owned(),
            chopper_reference: None,
            chopper_deflection: 0,
            chopper_start_us: 1000.0,
            chopper_end_us: -1000.0,
            signal: SignalOptions::default(),
            threshold_fraction: 0.1,
            pace_secs: 2.0,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl SummaryConfig {
    pub fn load(path: &Path) -> Result<Self, SummaryError> {
        let file = std::fs::File::open(path).map_err(|err| SummaryError::io(path, err))?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|ch| format!("{}{ch}", self.channel_prefix))
            .collect()
    }

    pub fn data_path(&self) -> Result<&Path, SummaryError> {
        self.data_path
            .as_deref()
            .ok_or(SummaryError::MissingDataPath)
    }

    /// Pause between batch experiments. Negative and NaN mean no pause.
    pub fn pace(&self) -> Result<Duration, SummaryError> {
        Duration::try_from_secs_f64(self.pace_secs.max(0.0)).map_err(|err| {
            SummaryError::InvalidPace {
                secs: self.pace_secs,
                reason: err.to_string(),
            }
        })
    }
}
