//! One-line summary of a single experiment.

use std::fmt::Display;

use crate::{
    config::SummaryConfig,
    diagnostics::DiagnosticHook,
    error::SummaryError,
    processing::{interpolate, interval_means, summarize, ChannelDifferential, SignalSummary},
    source::{BeamState, ChopperRequest, DataSource, Interval, SignalRequest},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Summary { mode: String, signal: SignalSummary },
    ChopperUnavailable(String),
    ChannelProcessingFailed { mode: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub exp_id: String,
    pub outcome: Outcome,
}

impl Display for SummaryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let exp_id = &self.exp_id;
        match &self.outcome {
            Outcome::Summary { mode, signal } => {
                let (start, end) = signal.window;
                write!(
                    f,
                    "{exp_id} ... Chopper:{mode:<6} ... Max:{:4.0}[mV]  ... Time range:({start:6.2}-{end:6.2})[s]",
                    signal.peak * 1000.0
                )
            }
            Outcome::ChopperUnavailable(message) => {
                write!(f, "{exp_id} --- chopper unavailable: {message} ---")
            }
            Outcome::ChannelProcessingFailed { mode, message } => {
                write!(f, "{exp_id} ... Chopper:{mode:<6} --- {message} ---")
            }
        }
    }
}

/// Beam-on and beam-off intervals of one experiment, sorted by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChopperTiming {
    pub mode: String,
    pub beam_on: Vec<Interval>,
    pub beam_off: Vec<Interval>,
}

impl ChopperTiming {
    /// Restricts both interval sets to the configured time range.
    fn clipped(self, config: &SummaryConfig) -> Self {
        let Some(range) = config.time_range else {
            return self;
        };
        let clip = |intervals: Vec<Interval>| {
            intervals
                .iter()
                .filter_map(|interval| interval.clip(&range))
                .collect::<Vec<_>>()
        };
        Self {
            mode: self.mode,
            beam_on: clip(self.beam_on),
            beam_off: clip(self.beam_off),
        }
    }
}

pub async fn fetch_chopper(
    source: &dyn DataSource,
    exp_id: &str,
    config: &SummaryConfig,
) -> Result<ChopperTiming, SummaryError> {
    let reference = config.chopper_reference.as_deref().unwrap_or(exp_id);

    let fetch = |state| {
        let request = ChopperRequest {
            exp_id: reference.to_owned(),
            state,
            deflection: config.chopper_deflection,
            start_offset_us: config.chopper_start_us,
            end_offset_us: config.chopper_end_us,
        };
        async move {
            let mut chopper = source.chopper_intervals(&request).await?;
            if chopper.intervals.is_empty() {
                return Err(SummaryError::NoIntervals {
                    exp_id: request.exp_id,
                    state,
                });
            }
            chopper
                .intervals
                .sort_by(|a, b| a.start.total_cmp(&b.start));
            Ok::<_, SummaryError>(chopper)
        }
    };

    let on = fetch(BeamState::On).await?;
    let off = fetch(BeamState::Off).await?;

    Ok(ChopperTiming {
        mode: on.mode,
        beam_on: on.intervals,
        beam_off: off.intervals,
    })
}

async fn process_channels(
    source: &dyn DataSource,
    exp_id: &str,
    config: &SummaryConfig,
    chopper: &ChopperTiming,
    mut diagnostics: Option<&mut dyn DiagnosticHook>,
) -> Result<SignalSummary, SummaryError> {
    let on_times = chopper
        .beam_on
        .iter()
        .map(Interval::midpoint)
        .collect::<Vec<_>>();
    let off_times = chopper
        .beam_off
        .iter()
        .map(Interval::midpoint)
        .collect::<Vec<_>>();

    let mut differentials = Vec::with_capacity(config.channels.len());
    for channel in config.channel_names() {
        log::debug!("  Processing {channel}");
        let series = source
            .channel_signal(&SignalRequest {
                exp_id: exp_id.to_owned(),
                channel: channel.clone(),
                time_range: config.time_range,
                options: config.signal,
            })
            .await?;

        let on = interval_means(&series, &chopper.beam_on);
        let off = interpolate(&off_times, &interval_means(&series, &chopper.beam_off), &on_times);

        if let Some(hook) = diagnostics.as_deref_mut() {
            hook.inspect_channel(exp_id, &channel, &series, &chopper.beam_on)?;
        }

        differentials.push(ChannelDifferential::new(&channel, &on, &off));
    }

    summarize(&on_times, &differentials, config.threshold_fraction)
}

/// Never fails: every error ends up in the returned record.
pub async fn compute_summary(
    source: &dyn DataSource,
    exp_id: &str,
    config: &SummaryConfig,
    diagnostics: Option<&mut dyn DiagnosticHook>,
) -> SummaryRecord {
    log::info!("Processing {exp_id}");

    let outcome = match fetch_chopper(source, exp_id, config).await {
        Err(err) => Outcome::ChopperUnavailable(err.to_string()),
        Ok(chopper) => {
            log::info!("Chopper mode: {}", chopper.mode);
            let chopper = chopper.clipped(config);
            match process_channels(source, exp_id, config, &chopper, diagnostics).await {
                Ok(signal) => Outcome::Summary {
                    mode: chopper.mode,
                    signal,
                },
                Err(err) => Outcome::ChannelProcessingFailed {
                    mode: chopper.mode,
                    message: err.to_string(),
                },
            }
        }
    };

    let record = SummaryRecord {
        exp_id: exp_id.to_owned(),
        outcome,
    };
    if !matches!(record.outcome, Outcome::Summary { .. }) {
        log::warn!("{record}");
    }
    record
}
