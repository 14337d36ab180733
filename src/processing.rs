//! Array operations behind the beam-on/beam-off differential.

use std::collections::BTreeMap;

use itertools::Itertools;
use statrs::statistics::Statistics;

use crate::{
    error::SummaryError,
    source::{Interval, TimeRange, TimeSeries},
};

/// Samples of `series` inside `range`.
pub fn restrict(series: &TimeSeries, range: &TimeRange) -> TimeSeries {
    let (time, values) = series
        .time
        .iter()
        .zip(&series.values)
        .filter(|(t, _)| range.contains(**t))
        .map(|(t, v)| (*t, *v))
        .unzip();
    TimeSeries::new(time, values)
}

/// Averages samples into consecutive bins of `1 / rate_hz` seconds, starting
/// at the first sample. Time and value of a bin are the means of its samples.
pub fn resample(series: &TimeSeries, rate_hz: f64) -> TimeSeries {
    let Some(&t0) = series.time.first() else {
        return TimeSeries::default();
    };
    let width = 1.0 / rate_hz;

    let mut bins: BTreeMap<u64, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for (t, v) in series.time.iter().zip(&series.values) {
        let bin = ((t - t0) / width).floor() as u64;
        let entry = bins.entry(bin).or_default();
        entry.0.push(*t);
        entry.1.push(*v);
    }

    let (time, values) = bins
        .into_values()
        .map(|(t, v)| (t.mean(), v.mean()))
        .unzip();
    TimeSeries::new(time, values)
}

/// Mean of the series inside each interval, NaN for intervals without samples.
pub fn interval_means(series: &TimeSeries, intervals: &[Interval]) -> Vec<f64> {
    intervals
        .iter()
        .map(|interval| series.values_in(interval).mean())
        .collect()
}

/// Linear interpolation of `(x, y)` at `at`; `x` must be ascending.
/// Points outside `x` are NaN, as are points next to a non-finite `y`.
pub fn interpolate(x: &[f64], y: &[f64], at: &[f64]) -> Vec<f64> {
    at.iter()
        .map(|&t| {
            let (Some(&first), Some(&last)) = (x.first(), x.last()) else {
                return f64::NAN;
            };
            if !(first..=last).contains(&t) {
                return f64::NAN;
            }
            let idx = x.partition_point(|v| *v < t);
            if x[idx] == t {
                return y[idx];
            }
            let (x0, x1, y0, y1) = (x[idx - 1], x[idx], y[idx - 1], y[idx]);
            y0 + (y1 - y0) * (t - x0) / (x1 - x0)
        })
        .collect()
}

/// On minus off of one channel, kept only where both are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDifferential {
    pub channel: String,
    /// `(event index, on - off)`
    pub samples: Vec<(usize, f64)>,
}

impl ChannelDifferential {
    pub fn new(channel: &str, on: &[f64], off: &[f64]) -> Self {
        let samples = itertools::zip_eq(on, off)
            .enumerate()
            .filter(|(_, (on, off))| on.is_finite() && off.is_finite())
            .map(|(idx, (on, off))| (idx, on - off))
            .collect();
        Self {
            channel: channel.to_owned(),
            samples,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSummary {
    /// Largest differential over all channels, volts.
    pub peak: f64,
    pub window: (f64, f64),
}

/// Sum across channels, only on events every channel has a value for.
pub fn combine(channels: &[ChannelDifferential]) -> BTreeMap<usize, f64> {
    let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for channel in channels {
        for &(idx, value) in &channel.samples {
            let entry = sums.entry(idx).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .filter(|(_, (_, count))| *count == channels.len())
        .map(|(idx, (sum, _))| (idx, sum))
        .collect()
}

/// Peak amplitude and the span of event times where the combined signal is
/// above `fraction` of its own maximum.
pub fn summarize(
    times: &[f64],
    channels: &[ChannelDifferential],
    fraction: f64,
) -> Result<SignalSummary, SummaryError> {
    let peak = channels
        .iter()
        .flat_map(|channel| channel.samples.iter().map(|(_, v)| *v))
        .reduce(f64::max)
        .ok_or(SummaryError::EmptyDifferential)?;

    let combined = combine(channels);
    let max = combined
        .values()
        .copied()
        .reduce(f64::max)
        .ok_or(SummaryError::EmptyDifferential)?;
    let threshold = max * fraction;

    let active = combined
        .iter()
        .filter(|(_, v)| **v > threshold)
        .map(|(idx, _)| times[*idx])
        .collect::<Vec<_>>();
    let window = active
        .iter()
        .copied()
        .minmax()
        .into_option()
        .ok_or(SummaryError::NoActiveWindow { fraction })?;

    Ok(SignalSummary { peak, window })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_averages_bins() {
        let series = TimeSeries::new(
            vec![0.0, 0.5, 1.0, 1.5, 2.0],
            vec![1.0, 3.0, 5.0, 7.0, 9.0],
        );
        let resampled = resample(&series, 1.0);
        assert_eq!(resampled.time, vec![0.25, 1.25, 2.0]);
        assert_eq!(resampled.values, vec![2.0, 6.0, 9.0]);
    }

    #[test]
    fn interval_means_mark_empty_intervals() {
        let series = TimeSeries::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0, 4.0]);
        let means = interval_means(
            &series,
            &[
                Interval { start: 0.0, end: 1.0 },
                Interval { start: 10.0, end: 11.0 },
            ],
        );
        assert_eq!(means[0], 1.5);
        assert!(means[1].is_nan());
    }

    #[test]
    fn interpolate_is_nan_outside_support() {
        let values = interpolate(
            &[0.0, 2.0, 4.0],
            &[0.0, 2.0, f64::NAN],
            &[-1.0, 1.0, 2.0, 3.0, 5.0],
        );
        assert!(values[0].is_nan());
        assert_eq!(values[1], 1.0);
        assert_eq!(values[2], 2.0);
        assert!(values[3].is_nan());
        assert!(values[4].is_nan());
    }

    #[test]
    fn differential_keeps_only_finite_pairs() {
        let diff =
            ChannelDifferential::new("ABES-10", &[3.0, f64::NAN, 5.0], &[1.0, 1.0, f64::NAN]);
        assert_eq!(diff.samples, vec![(0, 2.0)]);
    }

    #[test]
    fn combine_uses_only_shared_events() {
        let a = ChannelDifferential {
            channel: "a".into(),
            samples: vec![(0, 1.0), (1, 2.0)],
        };
        let b = ChannelDifferential {
            channel: "b".into(),
            samples: vec![(1, 3.0), (2, 4.0)],
        };
        let combined = combine(&[a, b]);
        assert_eq!(combined.into_iter().collect::<Vec<_>>(), vec![(1, 5.0)]);
    }

    #[test]
    fn summarize_finds_window_above_tenth_of_max() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let a = ChannelDifferential {
            channel: "a".into(),
            samples: vec![(0, 0.0), (1, 0.5), (2, 1.0), (3, 0.2), (4, 0.05)],
        };
        let summary = summarize(&times, &[a], 0.1).unwrap();
        assert_eq!(summary.peak, 1.0);
        assert_eq!(summary.window, (1.0, 3.0));
    }

    #[test]
    fn summarize_excludes_events_exactly_at_threshold() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let a = ChannelDifferential {
            channel: "a".into(),
            samples: vec![(0, 0.1), (1, 1.0), (2, 0.1), (3, 0.5)],
        };
        let summary = summarize(&times, &[a], 0.1).unwrap();
        assert_eq!(summary.window, (1.0, 3.0));
    }

    #[test]
    fn summarize_has_no_window_without_positive_signal() {
        let times = [0.0, 1.0];
        for samples in [vec![(0, -1.0), (1, -0.5)], vec![(0, 0.0), (1, 0.0)]] {
            let a = ChannelDifferential {
                channel: "a".into(),
                samples,
            };
            assert!(matches!(
                summarize(&times, &[a], 0.1),
                Err(SummaryError::NoActiveWindow { .. })
            ));
        }
    }

    #[test]
    fn summarize_rejects_empty_differential() {
        let a = ChannelDifferential {
            channel: "a".into(),
            samples: vec![],
        };
        assert!(matches!(
            summarize(&[], &[a], 0.1),
            Err(SummaryError::EmptyDifferential)
        ));
    }
}
