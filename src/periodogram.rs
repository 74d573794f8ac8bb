//! # Periodogram
//!
//! $$
//! n_g=2^{\lceil\log_2 \lfloor \frac12 N\,\mathrm{ofac}\,\mathrm{hifac}\rfloor\rceil},\qquad
//! f_j=\frac{2a\,(j+1)}{(t_{N-1}-t_0)\,\mathrm{ofac}'}
//! $$
//!
use std::time::Instant;

use ndarray::Array1;
use rayon::prelude::*;
use tracing::debug;
use tracing::info;

use crate::config::DegeneracyPolicy;
use crate::config::LspConfig;
use crate::config::LspFlags;
use crate::error::LspError;
use crate::error::Result;
use crate::kernel::convert_to_terms;
use crate::kernel::PowerParams;
use crate::nfft::evaluate_spectra;
use crate::nfft::CpuNfft;
use crate::preprocess::center_values;
use crate::preprocess::domain_half_width;
use crate::preprocess::scale_times;
use crate::significance;
use crate::traits::FloatExt;
use crate::traits::NfftEngine;

/// Output sizing of one periodogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyGrid<T: FloatExt> {
  /// Number of observations.
  pub npts: usize,
  /// `floor(0.5 · npts · oversampling · hifac)`.
  pub requested: usize,
  /// `requested` rounded up to a power of two.
  pub ng: usize,
  /// Oversampling corrected for the rounding, `oversampling · ng / requested`.
  pub effective_oversampling: T,
  pub hifac: T,
}

impl<T: FloatExt> FrequencyGrid<T> {
  pub fn new(npts: usize, oversampling: T, hifac: T) -> Result<Self> {
    if npts < 2 {
      return Err(LspError::invalid(
        "npts",
        format!("need at least 2 samples, got {npts}"),
      ));
    }
    if !(oversampling > T::zero() && oversampling.is_finite()) {
      return Err(LspError::invalid(
        "oversampling",
        format!("must be positive and finite, got {oversampling}"),
      ));
    }
    if !(hifac > T::zero() && hifac.is_finite()) {
      return Err(LspError::invalid(
        "hifac",
        format!("must be positive and finite, got {hifac}"),
      ));
    }

    let target = T::from_f64_fast(0.5) * T::from_usize_(npts) * oversampling * hifac;
    let requested = target.floor().to_usize().ok_or_else(|| {
      LspError::invalid(
        "oversampling",
        format!("0.5 · {npts} · {oversampling} · {hifac} bins do not fit in usize"),
      )
    })?;
    if requested == 0 {
      return Err(LspError::invalid(
        "oversampling",
        format!("0.5 · {npts} · {oversampling} · {hifac} leaves no frequency bins"),
      ));
    }
    let ng = requested.checked_next_power_of_two().ok_or_else(|| {
      LspError::invalid(
        "oversampling",
        format!("{requested} bins cannot be rounded up to a power of two"),
      )
    })?;

    // scaled times must stay inside [-a, a]
    let effective_oversampling = oversampling * T::from_usize_(ng) / T::from_usize_(requested);
    if effective_oversampling < T::one() {
      return Err(LspError::invalid(
        "oversampling",
        format!("effective oversampling {effective_oversampling} is below 1"),
      ));
    }

    Ok(Self {
      npts,
      requested,
      ng,
      effective_oversampling,
      hifac,
    })
  }
}

/// Lomb-Scargle periodogram with its frequency grid.
#[derive(Debug, Clone)]
pub struct Periodogram<T: FloatExt> {
  /// Power per bin; bin `j` is frequency [`Periodogram::frequency`]`(j)`.
  pub power: Array1<T>,
  pub grid: FrequencyGrid<T>,
  /// `t[N-1] - t[0]` in input time units.
  pub time_span: T,
  /// Population variance of the input values.
  pub variance: T,
}

/// Single periodogram peak.
#[derive(Debug, Clone, Copy)]
pub struct Peak<T: FloatExt> {
  /// Bin index in the periodogram.
  pub index: usize,
  /// Frequency in cycles per input time unit.
  pub frequency: T,
  /// Period in input time units.
  pub period: T,
  pub power: T,
  /// `None` when the power lies outside the formula's domain.
  pub false_alarm_probability: Option<T>,
}

/// Configuration for peak search over a periodogram.
#[derive(Debug, Clone, Copy)]
pub struct PeakSearchConfig<T: FloatExt> {
  /// Number of peaks to return.
  pub top_k: usize,
  /// Minimum frequency (inclusive).
  pub min_frequency: Option<T>,
  /// Maximum frequency (inclusive).
  pub max_frequency: Option<T>,
  /// Minimum separation between selected peaks (in bins).
  pub min_separation_bins: usize,
}

impl<T: FloatExt> Default for PeakSearchConfig<T> {
  fn default() -> Self {
    Self {
      top_k: 3,
      min_frequency: None,
      max_frequency: None,
      min_separation_bins: 2,
    }
  }
}

impl<T: FloatExt> Periodogram<T> {
  pub fn ng(&self) -> usize {
    self.grid.ng
  }

  /// Frequency spacing of the grid.
  pub fn resolution(&self) -> T {
    let a = domain_half_width::<T>();
    (a + a) / (self.time_span * self.grid.effective_oversampling)
  }

  pub fn frequency(&self, bin: usize) -> T {
    T::from_usize_(bin + 1) * self.resolution()
  }

  pub fn frequencies(&self) -> Array1<T> {
    let df = self.resolution();
    Array1::from_shape_fn(self.ng(), |j| T::from_usize_(j + 1) * df)
  }

  /// False-alarm probability of `power` for this sample size and grid.
  pub fn false_alarm_probability(&self, power: T) -> Result<T> {
    significance::false_alarm_probability(
      power,
      self.grid.npts,
      self.grid.ng,
      self.grid.effective_oversampling,
    )
  }

  /// Power a peak needs for a false-alarm probability of `probability`.
  pub fn significance_threshold(&self, probability: T) -> Result<T> {
    significance::significance_threshold(
      probability,
      self.grid.npts,
      self.grid.ng,
      self.grid.effective_oversampling,
    )
  }

  /// Local maxima sorted by descending power.
  pub fn peaks(&self, cfg: PeakSearchConfig<T>) -> Vec<Peak<T>> {
    if cfg.top_k == 0 {
      return Vec::new();
    }
    let n = self.power.len();
    let freqs = self.frequencies();
    let min_f = cfg.min_frequency.unwrap_or_else(T::neg_infinity);
    let max_f = cfg.max_frequency.unwrap_or_else(T::infinity);

    let mut candidates = Vec::new();
    for i in 0..n {
      let f = freqs[i];
      let p = self.power[i];
      if f < min_f || f > max_f || !p.is_finite() {
        continue;
      }
      let left = if i > 0 { self.power[i - 1] } else { T::neg_infinity() };
      let right = if i + 1 < n { self.power[i + 1] } else { T::neg_infinity() };
      if p >= left && p >= right {
        candidates.push((i, f, p));
      }
    }
    candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let min_sep = cfg.min_separation_bins.max(1);
    let mut peaks: Vec<Peak<T>> = Vec::with_capacity(cfg.top_k);
    for (index, frequency, power) in candidates {
      if peaks.iter().all(|peak| peak.index.abs_diff(index) >= min_sep) {
        peaks.push(Peak {
          index,
          frequency,
          period: T::one() / frequency,
          power,
          false_alarm_probability: self.false_alarm_probability(power).ok(),
        });
        if peaks.len() >= cfg.top_k {
          break;
        }
      }
    }
    peaks
  }
}

fn timed<R>(enabled: bool, stage: &'static str, f: impl FnOnce() -> R) -> R {
  if !enabled {
    return f();
  }
  let start = Instant::now();
  let out = f();
  info!(
    stage,
    elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
    "stage finished"
  );
  out
}

fn check_finite<T: FloatExt>(arg: &'static str, data: &[T]) -> Result<()> {
  match data.iter().position(|v| !v.is_finite()) {
    Some(i) => Err(LspError::invalid(arg, format!("sample {i} is not finite"))),
    None => Ok(()),
  }
}

/// Lomb-Scargle periodogram estimator over an NFFT engine.
#[derive(Debug, Clone)]
pub struct LombScargle<T: FloatExt, E = CpuNfft> {
  pub config: LspConfig<T>,
  engine: E,
}

impl<T: FloatExt> LombScargle<T, CpuNfft> {
  #[must_use]
  pub fn new(config: LspConfig<T>) -> Self {
    Self {
      config,
      engine: CpuNfft::default(),
    }
  }
}

impl<T: FloatExt> Default for LombScargle<T, CpuNfft> {
  fn default() -> Self {
    Self::new(LspConfig::default())
  }
}

impl<T: FloatExt, E: NfftEngine<T>> LombScargle<T, E> {
  #[must_use]
  pub fn with_engine(config: LspConfig<T>, engine: E) -> Self {
    Self { config, engine }
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  /// Computes the periodogram of `(times, values)`.
  ///
  /// Times must be increasing. On error nothing is returned, there is no
  /// partially filled periodogram.
  pub fn compute(&self, times: &[T], values: &[T]) -> Result<Periodogram<T>> {
    let cfg = &self.config;
    if times.len() != values.len() {
      return Err(LspError::invalid(
        "values",
        format!("got {} times but {} values", times.len(), values.len()),
      ));
    }
    let grid = FrequencyGrid::new(times.len(), cfg.oversampling, cfg.hifac)?;
    check_finite("times", times)?;
    check_finite("values", values)?;
    debug!(
      npts = grid.npts,
      requested = grid.requested,
      ng = grid.ng,
      "sized frequency grid"
    );

    let timing = cfg.flags.print_timing;
    let (x, y, variance) = timed(timing, "preprocess", || -> Result<_> {
      let x = scale_times(times, grid.effective_oversampling)?;
      let (y, variance) = center_values(values)?;
      Ok((x, y, variance))
    })?;
    if !(variance > T::zero()) {
      return Err(LspError::invalid("values", "series has zero variance"));
    }

    let spectra = timed(timing, "transform", || {
      evaluate_spectra(&self.engine, x.view(), y.view(), grid.ng, cfg.flags)
    })?;

    let params = PowerParams {
      ng: grid.ng,
      npts: grid.npts,
      variance,
      formula: cfg.formula,
    };
    let terms = timed(timing, "kernel", || convert_to_terms(&spectra, &params));

    if cfg.degeneracy == DegeneracyPolicy::Reject {
      if let Some(bin) = terms.iter().position(|t| t.is_degenerate()) {
        return Err(LspError::DegenerateBin { bin });
      }
    }

    Ok(Periodogram {
      power: terms.mapv(|t| t.power),
      grid,
      time_span: times[times.len() - 1] - times[0],
      variance,
    })
  }

  /// Computes independent periodograms in parallel, one result per series.
  pub fn compute_batch(&self, series: &[(&[T], &[T])]) -> Vec<Result<Periodogram<T>>> {
    series
      .par_iter()
      .map(|(times, values)| self.compute(times, values))
      .collect()
  }
}

/// Periodogram power and its length `ng` using the CPU engine.
pub fn compute_periodogram<T: FloatExt>(
  times: &[T],
  values: &[T],
  oversampling: T,
  hifac: T,
  flags: LspFlags,
) -> Result<(Array1<T>, usize)> {
  let lsp = LombScargle::new(LspConfig {
    oversampling,
    hifac,
    flags,
    ..LspConfig::default()
  });
  let pg = lsp.compute(times, values)?;
  let ng = pg.ng();
  Ok((pg.power, ng))
}

#[cfg(test)]
mod tests {
  use anyhow::Result as AnyResult;
  use ndarray::Array1;
  use ndarray::ArrayView1;
  use num_complex::Complex;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;
  use tracing_test::traced_test;

  use super::compute_periodogram;
  use super::FrequencyGrid;
  use super::LombScargle;
  use super::PeakSearchConfig;
  use super::Periodogram;
  use crate::config::DegeneracyPolicy;
  use crate::config::LspConfig;
  use crate::config::LspFlags;
  use crate::config::PowerFormula;
  use crate::config::TransformConfig;
  use crate::nfft::DirectNdft;
  use crate::nfft::Spectra;
  use crate::traits::NfftEngine;
  use crate::LspError;

  /// Uniform-ish sampling: unit steps with random jitter.
  fn sinusoid(n: usize, f0: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let t: Vec<f64> = (0..n).map(|i| i as f64 + 0.4 * rng.random::<f64>()).collect();
    let y = t
      .iter()
      .map(|&ti| (2.0 * std::f64::consts::PI * f0 * ti + 0.3).sin())
      .collect();
    (t, y)
  }

  fn argmax(pg: &Periodogram<f64>) -> usize {
    pg.power
      .iter()
      .enumerate()
      .filter(|(_, p)| p.is_finite())
      .max_by(|a, b| a.1.total_cmp(b.1))
      .map(|(i, _)| i)
      .expect("periodogram must contain a peak")
  }

  #[test]
  fn grid_is_power_of_two_and_covers_request() {
    for &n in &[2_usize, 3, 17, 64, 100, 1000] {
      for &over in &[1.0_f64, 2.5, 4.0, 10.0] {
        for &hifac in &[0.5_f64, 1.0, 3.0] {
          let Ok(grid) = FrequencyGrid::new(n, over, hifac) else {
            continue;
          };
          let requested = (0.5 * n as f64 * over * hifac).floor() as usize;
          assert_eq!(grid.requested, requested);
          assert!(grid.ng.is_power_of_two());
          assert!(grid.ng >= requested);
          let resolution_ratio = grid.effective_oversampling / over;
          assert!((resolution_ratio - grid.ng as f64 / requested as f64).abs() < 1e-12);
        }
      }
    }
  }

  #[test]
  fn degenerate_sizes_fail_fast() {
    assert!(matches!(
      FrequencyGrid::new(1, 4.0_f64, 1.0),
      Err(LspError::InvalidArgument { arg: "npts", .. })
    ));
    assert!(matches!(
      FrequencyGrid::new(10, 0.0_f64, 1.0),
      Err(LspError::InvalidArgument { arg: "oversampling", .. })
    ));
    assert!(matches!(
      FrequencyGrid::new(10, 4.0_f64, -1.0),
      Err(LspError::InvalidArgument { arg: "hifac", .. })
    ));
    assert!(FrequencyGrid::new(10, f64::NAN, 1.0).is_err());
    assert!(FrequencyGrid::new(2, 0.5_f64, 1.0).is_err());
  }

  #[test]
  fn oversized_grids_are_rejected() {
    assert!(matches!(
      FrequencyGrid::new(10, 1e300_f64, 1.0),
      Err(LspError::InvalidArgument { arg: "oversampling", .. })
    ));
    // fits in usize but has no power of two above it
    let over = 1.5 * 2f64.powi(usize::BITS as i32 - 1);
    assert!(matches!(
      FrequencyGrid::new(2, over, 1.0),
      Err(LspError::InvalidArgument { arg: "oversampling", .. })
    ));
  }

  #[test]
  fn sub_unit_oversampling_is_checked_before_the_transform() {
    let (t, y) = sinusoid(64, 0.1, 6);
    // NG = 16 is already a power of two, over' stays 0.5
    assert!(matches!(
      compute_periodogram(&t, &y, 0.5, 1.0, LspFlags::default()),
      Err(LspError::InvalidArgument { arg: "oversampling", .. })
    ));

    // NG = 28 rounds up to 32, over' = 0.9 · 32 / 28 > 1
    let grid = FrequencyGrid::new(64, 0.9_f64, 1.0).unwrap();
    assert_eq!(grid.ng, 32);
    assert!(grid.effective_oversampling >= 1.0);
    let (power, ng) = compute_periodogram(&t, &y, 0.9, 1.0, LspFlags::default()).unwrap();
    assert_eq!(ng, 32);
    assert!(power.iter().all(|p| p.is_finite()));
  }

  #[test]
  fn invalid_series_are_rejected() {
    let lsp = LombScargle::new(LspConfig::<f64>::default());
    assert!(matches!(
      lsp.compute(&[0.0, 1.0, 2.0], &[1.0, 2.0]),
      Err(LspError::InvalidArgument { arg: "values", .. })
    ));
    assert!(matches!(
      lsp.compute(&[0.0, 1.0, 2.0], &[1.0, f64::NAN, 2.0]),
      Err(LspError::InvalidArgument { arg: "values", .. })
    ));
    assert!(matches!(
      lsp.compute(&[0.0, 1.0, 2.0], &[3.0, 3.0, 3.0]),
      Err(LspError::InvalidArgument { arg: "values", .. })
    ));
    assert!(matches!(
      lsp.compute(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
      Err(LspError::InvalidArgument { arg: "times", .. })
    ));
  }

  #[test]
  fn sinusoid_peak_is_found_and_significant() {
    let f0 = 0.1;
    let (t, y) = sinusoid(64, f0, 7);
    let lsp = LombScargle::new(LspConfig {
      oversampling: 4.0,
      hifac: 1.0,
      ..LspConfig::default()
    });
    let pg = lsp.compute(&t, &y).unwrap();
    assert_eq!(pg.ng(), 128);
    assert_eq!(pg.power[pg.ng() - 1], 0.0);

    let peak = argmax(&pg);
    let f_est = pg.frequency(peak);
    assert!(
      (f_est - f0).abs() <= pg.resolution(),
      "peak at {f_est}, expected {f0} ± {}",
      pg.resolution()
    );

    let fap_peak = pg.false_alarm_probability(pg.power[peak]).unwrap();
    let other = (0..pg.ng() - 1)
      .find(|&j| (pg.frequency(j) - 0.3).abs() <= pg.resolution())
      .unwrap();
    let fap_other = pg.false_alarm_probability(pg.power[other]).unwrap();
    assert!(fap_peak < 1e-3, "fap at peak {fap_peak}");
    assert!(fap_other > 0.1, "fap off peak {fap_other}");
  }

  #[test]
  fn rotated_formula_finds_the_same_peak() {
    let f0 = 0.17;
    let (t, y) = sinusoid(64, f0, 21);
    let lsp = LombScargle::new(LspConfig {
      formula: PowerFormula::Rotated,
      ..LspConfig::default()
    });
    let pg = lsp.compute(&t, &y).unwrap();
    let peak = argmax(&pg);
    assert!((pg.frequency(peak) - f0).abs() <= pg.resolution());
    // a noiseless sinusoid explains all variance: P ≈ N/2
    assert!(pg.power[peak] > 0.4 * 64.0 && pg.power[peak] <= 0.5 * 64.0 * 1.001);
  }

  #[test]
  fn identical_inputs_give_identical_output() {
    let (t, y) = sinusoid(200, 0.05, 5);
    let (a, ng_a) = compute_periodogram(&t, &y, 4.0, 2.0, LspFlags::default()).unwrap();
    let (b, ng_b) = compute_periodogram(&t, &y, 4.0, 2.0, LspFlags::default()).unwrap();
    assert_eq!(ng_a, ng_b);
    assert_eq!(a, b);
  }

  #[test]
  fn cpu_engine_matches_direct_sums() {
    let (t, mut y) = sinusoid(150, 0.2, 9);
    let mut rng = StdRng::seed_from_u64(1);
    for v in &mut y {
      *v += 0.5 * (rng.random::<f64>() - 0.5);
    }

    let cfg = LspConfig::default();
    let fast = LombScargle::new(cfg).compute(&t, &y).unwrap();
    let exact = LombScargle::with_engine(cfg, DirectNdft).compute(&t, &y).unwrap();
    for (a, b) in fast.power.iter().zip(exact.power.iter()) {
      assert!((a - b).abs() <= 1e-4 * b.abs().max(1.0), "{a} vs {b}");
    }
  }

  #[test]
  fn single_precision_pipeline() {
    let (t, y) = sinusoid(64, 0.1, 7);
    let t32: Vec<f32> = t.iter().map(|&v| v as f32).collect();
    let y32: Vec<f32> = y.iter().map(|&v| v as f32).collect();
    let pg = LombScargle::new(LspConfig::<f32>::default()).compute(&t32, &y32).unwrap();
    let peak = pg
      .power
      .iter()
      .enumerate()
      .filter(|(_, p)| p.is_finite())
      .max_by(|a, b| a.1.total_cmp(b.1))
      .map(|(i, _)| i)
      .unwrap();
    assert!((pg.frequency(peak) - 0.1).abs() <= pg.resolution());
  }

  #[test]
  fn peaks_are_sorted_and_separated() {
    let (t, y1) = sinusoid(256, 0.08, 3);
    let y: Vec<f64> = t
      .iter()
      .zip(y1.iter())
      .map(|(&ti, &v)| v + 0.6 * (2.0 * std::f64::consts::PI * 0.31 * ti).sin())
      .collect();
    let pg = LombScargle::new(LspConfig::<f64>::default()).compute(&t, &y).unwrap();

    let peaks = pg.peaks(PeakSearchConfig {
      top_k: 2,
      min_separation_bins: 8,
      ..PeakSearchConfig::default()
    });
    assert_eq!(peaks.len(), 2);
    assert!(peaks[0].power >= peaks[1].power);
    assert!((peaks[0].frequency - 0.08).abs() <= pg.resolution());
    assert!((peaks[1].frequency - 0.31).abs() <= pg.resolution());
    assert!((peaks[0].period - 12.5).abs() < 1.0);
    assert!(peaks[0].false_alarm_probability.unwrap() < 1e-6);

    let band = pg.peaks(PeakSearchConfig {
      top_k: 1,
      min_frequency: Some(0.2),
      max_frequency: Some(0.4),
      ..PeakSearchConfig::default()
    });
    assert!((band[0].frequency - 0.31).abs() <= pg.resolution());
  }

  #[test]
  fn batch_reports_each_series() {
    let (t1, y1) = sinusoid(64, 0.1, 1);
    let (t2, y2) = sinusoid(96, 0.2, 2);
    let bad_t = [0.0, 1.0];
    let bad_y = [1.0];
    let lsp = LombScargle::new(LspConfig::<f64>::default());
    let out = lsp.compute_batch(&[
      (t1.as_slice(), y1.as_slice()),
      (&bad_t[..], &bad_y[..]),
      (t2.as_slice(), y2.as_slice()),
    ]);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].as_ref().unwrap().power, lsp.compute(&t1, &y1).unwrap().power);
    assert!(out[1].is_err());
    assert_eq!(out[2].as_ref().unwrap().ng(), 256);
  }

  struct HoledWindow;

  impl NfftEngine<f64> for HoledWindow {
    type Plan = usize;

    fn prepare(
      &self,
      _x: ArrayView1<f64>,
      _y: ArrayView1<f64>,
      transform_size: usize,
      _config: &TransformConfig,
    ) -> AnyResult<usize> {
      Ok(transform_size)
    }

    fn execute(&self, m: usize) -> AnyResult<Spectra<f64>> {
      let mut window = Array1::from_elem(m, Complex::new(1.0, 1.0));
      window[6] = Complex::new(0.0, 0.0);
      Ok(Spectra {
        signal: Array1::from_elem(m / 2, Complex::new(1.0, -1.0)),
        window,
      })
    }
  }

  #[test]
  fn degenerate_bins_follow_policy() {
    let (t, y) = sinusoid(16, 0.1, 4);
    let mut cfg = LspConfig::default();

    let pg = LombScargle::with_engine(cfg, HoledWindow).compute(&t, &y).unwrap();
    assert!(pg.power[2].is_nan());

    cfg.degeneracy = DegeneracyPolicy::Reject;
    let err = LombScargle::with_engine(cfg, HoledWindow).compute(&t, &y).unwrap_err();
    assert!(matches!(err, LspError::DegenerateBin { bin: 2 }));
  }

  #[traced_test]
  #[test]
  fn timing_is_logged_on_request() {
    let (t, y) = sinusoid(64, 0.1, 8);
    compute_periodogram(&t, &y, 4.0, 1.0, LspFlags::default().with_timing(true)).unwrap();
    assert!(logs_contain("stage finished"));
    assert!(logs_contain("transform"));
    assert!(logs_contain("kernel"));
  }
}
