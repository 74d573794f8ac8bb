//! # Visualization
//!
//! $$
//! \{(f_j,P_j)\}_{j<n_g}\ \cup\ \{P_\alpha : \mathrm{FAP}(P_\alpha)=\alpha\}\mapsto\text{chart}
//! $$
//!
use std::path::Path;

use plotly::common::DashType;
use plotly::common::Line;
use plotly::common::Mode;
use plotly::layout::Axis;
use plotly::layout::AxisType;
use plotly::layout::Margin;
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;

use crate::error::Result;
use crate::periodogram::Periodogram;
use crate::traits::FloatExt;

/// Builder for a power-versus-frequency chart.
pub struct PeriodogramPlotter {
  title: String,
  log_power: bool,
  line_width: f64,
  fap_levels: Vec<f64>,
}

impl Default for PeriodogramPlotter {
  fn default() -> Self {
    Self::new()
  }
}

impl PeriodogramPlotter {
  pub fn new() -> Self {
    Self {
      title: "Lomb-Scargle periodogram".to_string(),
      log_power: false,
      line_width: 1.0,
      fap_levels: Vec::new(),
    }
  }

  pub fn title(mut self, title: &str) -> Self {
    self.title = title.into();
    self
  }

  pub fn log_power(mut self, log: bool) -> Self {
    self.log_power = log;
    self
  }

  pub fn line_width(mut self, w: f64) -> Self {
    self.line_width = w;
    self
  }

  /// Adds a dashed horizontal line at the power of each false-alarm level.
  pub fn fap_levels(mut self, levels: &[f64]) -> Self {
    self.fap_levels = levels.to_vec();
    self
  }

  pub fn plot<T: FloatExt>(&self, pg: &Periodogram<T>) -> Result<Plot> {
    let as_f64 = |v: T| v.to_f64().unwrap_or(f64::NAN);
    let freqs = pg.frequencies().iter().map(|&f| as_f64(f)).collect::<Vec<f64>>();
    let power = pg
      .power
      .iter()
      .map(|&p| {
        let p = as_f64(p);
        // log axes cannot show the zero tail bin
        if self.log_power && p <= 0.0 {
          f64::NAN
        } else {
          p
        }
      })
      .collect::<Vec<f64>>();
    let f_lo = freqs.first().copied().unwrap_or(0.0);
    let f_hi = freqs.last().copied().unwrap_or(0.0);

    let mut plot = Plot::new();
    plot.add_trace(
      Scatter::new(freqs, power)
        .mode(Mode::Lines)
        .line(Line::new().width(self.line_width))
        .name("power"),
    );

    for &level in &self.fap_levels {
      let threshold = as_f64(pg.significance_threshold(T::from_f64_fast(level))?);
      plot.add_trace(
        Scatter::new(vec![f_lo, f_hi], vec![threshold, threshold])
          .mode(Mode::Lines)
          .line(Line::new().width(self.line_width).dash(DashType::Dash))
          .name(format!("FAP {level}").as_str()),
      );
    }

    let y_axis = if self.log_power {
      Axis::new().title("power").type_(AxisType::Log)
    } else {
      Axis::new().title("power")
    };
    plot.set_layout(
      Layout::new()
        .title(self.title.as_str())
        .auto_size(true)
        .margin(Margin::new().left(56).right(24).top(64).bottom(44))
        .x_axis(Axis::new().title("frequency"))
        .y_axis(y_axis),
    );
    Ok(plot)
  }

  pub fn write_html<T: FloatExt>(&self, pg: &Periodogram<T>, path: impl AsRef<Path>) -> Result<()> {
    self.plot(pg)?.write_html(path);
    Ok(())
  }
}
