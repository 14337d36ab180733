//! Plain-file data source.
//!
//! Layout under the data path:
//!
//! ```text
//! <data_path>/<exp_id>/chopper.yaml     chopper mode, deflection and interval lists
//! <data_path>/<exp_id>/<channel>.tsv    time<TAB>value, one sample per line
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::SummaryError,
    processing::{resample, restrict},
    source::{
        BeamState, ChopperIntervals, ChopperRequest, DataSource, Interval, Scaling, SignalRequest,
        TimeSeries,
    },
};

pub const CHOPPER_FILE: &str = "chopper.yaml";

#[derive(Deserialize, Debug)]
struct ChopperFile {
    mode: String,
    #[serde(default)]
    deflection: u8,
    beam_on: Vec<(f64, f64)>,
    beam_off: Vec<(f64, f64)>,
}

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dir(&self, exp_id: &str) -> PathBuf {
        self.root.join(exp_id)
    }
}

#[async_trait]
impl DataSource for DirectorySource {
    async fn chopper_intervals(
        &self,
        request: &ChopperRequest,
    ) -> Result<ChopperIntervals, SummaryError> {
        let path = self.experiment_dir(&request.exp_id).join(CHOPPER_FILE);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| SummaryError::io(&path, err))?;
        let file: ChopperFile = serde_yaml::from_slice(&bytes)?;
        if file.deflection != request.deflection {
            log::debug!(
                "{}: chopper recorded at deflection {}, {} requested",
                request.exp_id,
                file.deflection,
                request.deflection
            );
            return Err(SummaryError::NoIntervals {
                exp_id: request.exp_id.clone(),
                state: request.state,
            });
        }

        let raw = match request.state {
            BeamState::On => file.beam_on,
            BeamState::Off => file.beam_off,
        };
        let intervals = raw
            .into_iter()
            .map(|(start, end)| Interval {
                start: start + request.start_offset_us * 1e-6,
                end: end + request.end_offset_us * 1e-6,
            })
            .filter(|interval| interval.start < interval.end)
            .collect::<Vec<_>>();

        if intervals.is_empty() {
            return Err(SummaryError::NoIntervals {
                exp_id: request.exp_id.clone(),
                state: request.state,
            });
        }
        Ok(ChopperIntervals {
            mode: file.mode,
            intervals,
        })
    }

    async fn channel_signal(&self, request: &SignalRequest) -> Result<TimeSeries, SummaryError> {
        let options = &request.options;
        if options.scaling != Scaling::Volt {
            return Err(SummaryError::Unsupported(format!(
                "{:?} scaling",
                options.scaling
            )));
        }
        if options.amplitude_calibration {
            return Err(SummaryError::Unsupported(
                "amplitude calibration".to_owned(),
            ));
        }

        let path = self
            .experiment_dir(&request.exp_id)
            .join(format!("{}.tsv", request.channel));
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SummaryError::ChannelNotFound {
                    exp_id: request.exp_id.clone(),
                    channel: request.channel.clone(),
                })
            }
            Err(err) => return Err(SummaryError::io(&path, err)),
        };

        let mut series = parse_tsv(&path, &text)?;
        if let Some(range) = &request.time_range {
            series = restrict(&series, range);
        }
        if let Some(rate) = options.resample_hz {
            if !(rate > 0.0) {
                return Err(SummaryError::Unsupported(format!("resample rate {rate}")));
            }
            series = resample(&series, rate);
        }
        if series.is_empty() {
            return Err(SummaryError::EmptySignal {
                channel: request.channel.clone(),
            });
        }
        Ok(series)
    }
}

fn parse_tsv(path: &Path, text: &str) -> Result<TimeSeries, SummaryError> {
    let mut time = vec![];
    let mut values = vec![];

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("time") {
            continue;
        }
        let format_err = |reason: String| SummaryError::Format {
            path: path.to_owned(),
            line: idx + 1,
            reason,
        };

        let mut fields = line.split_whitespace();
        let (Some(t), Some(v)) = (fields.next(), fields.next()) else {
            return Err(format_err("expected time and value".to_owned()));
        };
        let t = t
            .parse::<f64>()
            .map_err(|err| format_err(format!("time '{t}': {err}")))?;
        let v = v
            .parse::<f64>()
            .map_err(|err| format_err(format!("value '{v}': {err}")))?;

        if time.last().is_some_and(|last| *last > t) {
            return Err(format_err("time is not ascending".to_owned()));
        }
        time.push(t);
        values.push(v);
    }

    Ok(TimeSeries::new(time, values))
}
