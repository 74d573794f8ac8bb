//! # Kernel
//!
//! $$
//! P_j=\frac{1}{2\sigma^2}\left(\frac{\Re(z_1)^2}{\tfrac{n_g}{2}+\tfrac12|z_2|}+\frac{\Im(z_1)^2}{\tfrac{n_g}{2}-\tfrac12|z_2|}\right),\quad
//! z_1=S_{j+1},\ z_2=W_{2(j+1)}
//! $$
//!
use ndarray::Array1;
use ndarray::Zip;

use crate::config::PowerFormula;
use crate::nfft::Spectra;
use crate::traits::FloatExt;

/// Scalars shared by every bin.
#[derive(Debug, Clone, Copy)]
pub struct PowerParams<T: FloatExt> {
  /// Periodogram length.
  pub ng: usize,
  /// Number of observations.
  pub npts: usize,
  /// Population variance of the observations.
  pub variance: T,
  pub formula: PowerFormula,
}

/// Intermediate quantities of one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinTerms<T: FloatExt> {
  /// Weighted `Σ cos²` normalization of the shifted frequency.
  pub cos2wttau: T,
  /// Weighted `Σ sin²` normalization of the shifted frequency.
  pub sin2wttau: T,
  pub power: T,
}

impl<T: FloatExt> BinTerms<T> {
  pub fn is_degenerate(&self) -> bool {
    !(self.cos2wttau > T::zero() && self.sin2wttau > T::zero() && self.power.is_finite())
  }
}

/// Evaluates bin `j < ng - 1`.
pub fn bin_terms<T: FloatExt>(spectra: &Spectra<T>, j: usize, params: &PowerParams<T>) -> BinTerms<T> {
  let half = T::from_f64_fast(0.5);
  let z1 = spectra.signal[j + 1];
  let z2 = spectra.window[2 * (j + 1)];

  let invhypo = T::one() / z2.norm();
  let hc2wtau = half * z2.re * invhypo;
  let hs2wtau = half * z2.im * invhypo;

  let norm = match params.formula {
    PowerFormula::Reference => half * T::from_usize_(params.ng),
    PowerFormula::Rotated => half * T::from_usize_(params.npts),
  };
  let shift = hc2wtau * z2.re + hs2wtau * z2.im;
  let cos2wttau = norm + shift;
  let sin2wttau = norm - shift;

  let (cterm, sterm) = match params.formula {
    PowerFormula::Reference => (z1.re * z1.re / cos2wttau, z1.im * z1.im / sin2wttau),
    PowerFormula::Rotated => {
      let cwtau = (half + hc2wtau).sqrt();
      let swtau = (half - hc2wtau).sqrt();
      let swtau = if z2.im < T::zero() { -swtau } else { swtau };
      let yc = cwtau * z1.re + swtau * z1.im;
      let ys = cwtau * z1.im - swtau * z1.re;
      (yc * yc / cos2wttau, ys * ys / sin2wttau)
    }
  };

  BinTerms {
    cos2wttau,
    sin2wttau,
    power: (cterm + sterm) / (params.variance + params.variance),
  }
}

/// Converts the signal and window spectra into `ng` power values.
///
/// The last bin has no valid coefficients under this formulation and is
/// always exactly zero.
pub fn convert_to_power<T: FloatExt>(spectra: &Spectra<T>, params: &PowerParams<T>) -> Array1<T> {
  convert_to_terms(spectra, params).mapv(|t| t.power)
}

pub(crate) fn convert_to_terms<T: FloatExt>(
  spectra: &Spectra<T>,
  params: &PowerParams<T>,
) -> Array1<BinTerms<T>> {
  let ng = params.ng;
  let zero = BinTerms {
    cos2wttau: T::one(),
    sin2wttau: T::one(),
    power: T::zero(),
  };

  let mut terms = Array1::from_elem(ng, zero);
  Zip::indexed(&mut terms).par_for_each(|j, out| {
    if j + 1 < ng {
      *out = bin_terms(spectra, j, params);
    }
  });
  terms
}
