//! # Preprocess
//!
//! $$
//! x_i = 2a\,\frac{t_i-t_0}{(t_{N-1}-t_0)\,\mathrm{ofac}} - a,\qquad a=\tfrac12-\varepsilon
//! $$
//!
use ndarray::Array1;

use crate::error::LspError;
use crate::error::Result;
use crate::traits::FloatExt;

/// Margin keeping scaled times away from the periodic boundary at `±0.5`.
pub const DOMAIN_EPSILON: f64 = 1e-5;

/// Half width `a` of the scaled time domain.
pub fn domain_half_width<T: FloatExt>() -> T {
  T::from_f64_fast(0.5 - DOMAIN_EPSILON)
}

/// Maps `times` affinely onto `[-a, -a + 2a / oversampling]`.
///
/// Times are expected in increasing order; only the span between the first
/// and the last sample is checked.
pub fn scale_times<T: FloatExt>(times: &[T], oversampling: T) -> Result<Array1<T>> {
  if times.len() < 2 {
    return Err(LspError::invalid(
      "times",
      format!("need at least 2 samples, got {}", times.len()),
    ));
  }
  if !(oversampling >= T::one() && oversampling.is_finite()) {
    return Err(LspError::invalid(
      "oversampling",
      format!("must be finite and at least 1, got {oversampling}"),
    ));
  }

  let t0 = times[0];
  let span = times[times.len() - 1] - t0;
  if !(span > T::zero() && span.is_finite()) {
    return Err(LspError::invalid(
      "times",
      format!("last sample must come after the first, span is {span}"),
    ));
  }

  let a = domain_half_width::<T>();
  let scale = (a + a) / (span * oversampling);
  Ok(times.iter().map(|&t| (t - t0) * scale - a).collect())
}

/// Removes the sample mean and returns the population variance of `values`.
pub fn center_values<T: FloatExt>(values: &[T]) -> Result<(Array1<T>, T)> {
  if values.len() < 2 {
    return Err(LspError::invalid(
      "values",
      format!("need at least 2 samples, got {}", values.len()),
    ));
  }

  // Welford
  let mut mean = T::zero();
  let mut m2 = T::zero();
  for (i, &v) in values.iter().enumerate() {
    let delta = v - mean;
    mean += delta / T::from_usize_(i + 1);
    m2 += delta * (v - mean);
  }
  let variance = m2 / T::from_usize_(values.len());

  Ok((values.iter().map(|&v| v - mean).collect(), variance))
}
