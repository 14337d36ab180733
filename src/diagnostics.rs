//! Optional per-channel inspection while a summary is computed.

use std::path::PathBuf;

use plotly::{
    common::{Mode, Title},
    layout::Axis,
    Layout, Plot, Scatter,
};

use crate::{
    error::SummaryError,
    source::{Interval, TimeSeries},
};

pub trait DiagnosticHook: Send {
    /// Called once per channel with the raw series, before the differential.
    fn inspect_channel(
        &mut self,
        exp_id: &str,
        channel: &str,
        series: &TimeSeries,
        beam_on: &[Interval],
    ) -> Result<(), SummaryError>;
}

/// Writes `<dir>/<exp_id>_<channel>.html` with the raw signal and the beam-on starts.
pub struct PlotlyDiagnostics {
    dir: PathBuf,
}

impl PlotlyDiagnostics {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DiagnosticHook for PlotlyDiagnostics {
    fn inspect_channel(
        &mut self,
        exp_id: &str,
        channel: &str,
        series: &TimeSeries,
        beam_on: &[Interval],
    ) -> Result<(), SummaryError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| SummaryError::Diagnostics(format!("{}: {err}", self.dir.display())))?;

        let mut plot = Plot::new();
        plot.add_trace(
            Scatter::new(series.time.clone(), series.values.clone())
                .mode(Mode::Lines)
                .name(channel),
        );
        let starts = beam_on.iter().map(|i| i.start).collect::<Vec<_>>();
        let zeros = vec![0.0; starts.len()];
        plot.add_trace(
            Scatter::new(starts, zeros)
                .mode(Mode::Markers)
                .name("beam on"),
        );

        let layout = Layout::new()
            .title(Title::new(format!("{exp_id} {channel}").as_str()))
            .x_axis(Axis::new().title(Title::new("Time [s]")))
            .y_axis(Axis::new().title(Title::new("Signal [V]")))
            .height(1000);
        plot.set_layout(layout);

        let path = self.dir.join(format!("{exp_id}_{channel}.html"));
        log::info!("writing diagnostic plot {}", path.display());
        plot.write_html(path);
        Ok(())
    }
}
