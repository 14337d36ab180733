use std::path::PathBuf;

use thiserror::Error;

use crate::source::BeamState;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("no data path configured")]
    MissingDataPath,
    #[error("invalid experiment pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("{}:{line}: {reason}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("invalid pace {secs} s: {reason}")]
    InvalidPace { secs: f64, reason: String },
    #[error("invalid time range: {0}")]
    TimeRange(String),
    #[error("no {state} intervals for {exp_id}")]
    NoIntervals { exp_id: String, state: BeamState },
    #[error("no data for {channel} in {exp_id}")]
    ChannelNotFound { exp_id: String, channel: String },
    #[error("{channel} has no samples in the requested time range")]
    EmptySignal { channel: String },
    #[error("no finite differential samples")]
    EmptyDifferential,
    #[error("combined signal never exceeds {fraction} of its maximum")]
    NoActiveWindow { fraction: f64 },
    #[error("unsupported signal option: {0}")]
    Unsupported(String),
    #[error("cache: {0}")]
    Cache(String),
    #[error("diagnostics: {0}")]
    Diagnostics(String),
}

impl SummaryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummaryError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<cacache::Error> for SummaryError {
    fn from(value: cacache::Error) -> Self {
        SummaryError::Cache(value.to_string())
    }
}

impl From<bincode::Error> for SummaryError {
    fn from(value: bincode::Error) -> Self {
        SummaryError::Cache(value.to_string())
    }
}
