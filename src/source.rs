//! Data access seam: what the summary needs from the acquisition layer.

use std::{fmt::Display, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

/// Closed time window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self, SummaryError> {
        if !(start.is_finite() && end.is_finite()) || start > end {
            return Err(SummaryError::TimeRange(format!("{start}..{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, time: f64) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

/// Parses `START,END` as given on the command line.
impl FromStr for TimeRange {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(',')
            .ok_or_else(|| SummaryError::TimeRange(format!("expected START,END, got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|err| SummaryError::TimeRange(format!("'{v}': {err}")))
        };
        TimeRange::new(parse(start)?, parse(end)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Part of the interval inside `range`, `None` when they do not overlap.
    pub fn clip(&self, range: &TimeRange) -> Option<Interval> {
        let start = self.start.max(range.start);
        let end = self.end.min(range.end);
        (start <= end).then_some(Interval { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BeamState {
    On,
    Off,
}

impl Display for BeamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BeamState::On => write!(f, "beam-on"),
            BeamState::Off => write!(f, "beam-off"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChopperRequest {
    pub exp_id: String,
    pub state: BeamState,
    /// Beam deflection setting the chopper timing belongs to.
    pub deflection: u8,
    /// Shift of every interval start, microseconds.
    pub start_offset_us: f64,
    /// Shift of every interval end, microseconds.
    pub end_offset_us: f64,
}

/// Intervals of one beam state, tagged with the chopper mode they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChopperIntervals {
    pub mode: String,
    pub intervals: Vec<Interval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaling {
    Volt,
    Digit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalOptions {
    pub resample_hz: Option<f64>,
    pub scaling: Scaling,
    pub amplitude_calibration: bool,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            resample_hz: Some(1e4),
            scaling: Scaling::Volt,
            amplitude_calibration: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequest {
    pub exp_id: String,
    pub channel: String,
    pub time_range: Option<TimeRange>,
    pub options: SignalOptions,
}

/// Samples of one channel, `time` ascending.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Self {
        debug_assert_eq!(time.len(), values.len());
        Self { time, values }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Values whose sample time lies inside `interval`.
    pub fn values_in(&self, interval: &Interval) -> &[f64] {
        let first = self.time.partition_point(|t| *t < interval.start);
        let last = self.time.partition_point(|t| *t <= interval.end);
        &self.values[first..last.max(first)]
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn chopper_intervals(
        &self,
        request: &ChopperRequest,
    ) -> Result<ChopperIntervals, SummaryError>;

    async fn channel_signal(&self, request: &SignalRequest) -> Result<TimeSeries, SummaryError>;
}
