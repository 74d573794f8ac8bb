//! # Significance
//!
//! $$
//! \mathrm{FAP}(P)=1-\left[1-\left(1-\tfrac{2P}{N}\right)^{\frac{N-3}{2}}\right]^{M_{\mathrm{eff}}},\qquad
//! M_{\mathrm{eff}}=\frac{2\,n_f}{\mathrm{ofac}}
//! $$
//!
use crate::error::LspError;
use crate::error::Result;
use crate::traits::FloatExt;

fn check_domain<T: FloatExt>(npts: usize, nfreqs: usize, over: T) -> Result<()> {
  if npts <= 3 {
    return Err(LspError::invalid(
      "npts",
      format!("need more than 3 samples, got {npts}"),
    ));
  }
  if nfreqs == 0 {
    return Err(LspError::invalid("nfreqs", "must be positive"));
  }
  if !(over > T::zero() && over.is_finite()) {
    return Err(LspError::invalid(
      "over",
      format!("must be positive and finite, got {over}"),
    ));
  }
  Ok(())
}

/// `(1 - 2P/N)^((N-3)/2)` and the effective number of independent frequencies.
fn tail<T: FloatExt>(power: T, npts: usize, nfreqs: usize, over: T) -> Result<(T, T)> {
  check_domain(npts, nfreqs, over)?;
  let n = T::from_usize_(npts);
  let two = T::from_usize_(2);
  let ratio = two * power / n;
  if !(ratio >= T::zero() && ratio <= T::one()) {
    return Err(LspError::invalid(
      "power",
      format!("2·power/npts must lie in [0, 1], got {ratio}"),
    ));
  }

  let exponent = T::from_f64_fast(0.5) * T::from_usize_(npts - 3);
  let effm = two * T::from_usize_(nfreqs) / over;
  Ok(((T::one() - ratio).powf(exponent), effm))
}

/// Probability that noise alone produces a peak at least as high as `power`
/// somewhere among `nfreqs` bins oversampled by `over`.
pub fn false_alarm_probability<T: FloatExt>(power: T, npts: usize, nfreqs: usize, over: T) -> Result<T> {
  let (q, effm) = tail(power, npts, nfreqs, over)?;
  // 1 - (1 - q)^effm
  Ok(-(effm * (-q).ln_1p()).exp_m1())
}

/// Complement of [`false_alarm_probability`].
pub fn detection_significance<T: FloatExt>(power: T, npts: usize, nfreqs: usize, over: T) -> Result<T> {
  let (q, effm) = tail(power, npts, nfreqs, over)?;
  Ok((effm * (-q).ln_1p()).exp())
}

/// Power whose false-alarm probability equals `probability`.
pub fn significance_threshold<T: FloatExt>(
  probability: T,
  npts: usize,
  nfreqs: usize,
  over: T,
) -> Result<T> {
  check_domain(npts, nfreqs, over)?;
  if !(probability >= T::zero() && probability <= T::one()) {
    return Err(LspError::invalid(
      "probability",
      format!("must lie in [0, 1], got {probability}"),
    ));
  }

  let n = T::from_usize_(npts);
  let two = T::from_usize_(2);
  let effm = two * T::from_usize_(nfreqs) / over;
  let q = -((-probability).ln_1p() / effm).exp_m1();
  let ratio = T::one() - q.powf(two / T::from_usize_(npts - 3));
  Ok(ratio * n / two)
}
