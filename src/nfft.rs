//! # NFFT
//!
//! $$
//! S_k=\sum_i y_i e^{2\pi i k x_i},\quad W_k=\sum_i e^{2\pi i k x_i}
//! $$
//!
//! Spectral evaluation on top of an adjoint non-uniform FFT engine.
//!
//! | Engine          | Description                                                       |
//! |-----------------|-------------------------------------------------------------------|
//! | [`CpuNfft`]     | Gaussian gridding on an oversampled grid followed by one FFT.      |
//! | [`DirectNdft`]  | Exact O(N·M) sums, parallel over frequencies.                      |
//! | `CudaNfft`      | External CUDA library loaded at runtime (feature `cuda`).          |
pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod direct;

use ndarray::Array1;
use ndarray::ArrayView1;
use num_complex::Complex;
use tracing::debug;

pub use self::cpu::CpuNfft;
#[cfg(feature = "cuda")]
pub use self::cuda::CudaNfft;
pub use self::direct::DirectNdft;
use crate::config::LspFlags;
use crate::config::TransformConfig;
use crate::error::LspError;
use crate::error::Result;
use crate::traits::FloatExt;
use crate::traits::NfftEngine;

/// Signal and window spectra, index 0 is the zero frequency.
#[derive(Debug, Clone)]
pub struct Spectra<T: FloatExt> {
  /// `ng` coefficients of the centered values.
  pub signal: Array1<Complex<T>>,
  /// `2 * ng` coefficients of the unit-weight window.
  pub window: Array1<Complex<T>>,
}

impl<T: FloatExt> Spectra<T> {
  /// Number of periodogram bins these spectra describe.
  pub fn ng(&self) -> usize {
    self.signal.len()
  }

  pub(crate) fn check_shape(&self, ng: usize) -> Result<()> {
    if self.signal.len() != ng {
      return Err(LspError::SpectrumLength {
        name: "signal",
        expected: ng,
        actual: self.signal.len(),
      });
    }
    if self.window.len() != 2 * ng {
      return Err(LspError::SpectrumLength {
        name: "window",
        expected: 2 * ng,
        actual: self.window.len(),
      });
    }
    Ok(())
  }
}

/// Runs the adjoint transform of size `2 * ng` for the signal and the window.
pub fn evaluate_spectra<T, E>(
  engine: &E,
  x: ArrayView1<T>,
  y: ArrayView1<T>,
  ng: usize,
  flags: LspFlags,
) -> Result<Spectra<T>>
where
  T: FloatExt,
  E: NfftEngine<T>,
{
  let config = TransformConfig::from_flags(flags);
  let transform_size = 2 * ng;
  debug!(
    npts = x.len(),
    transform_size,
    flags = config.bits(),
    "preparing adjoint transform"
  );

  let plan = engine
    .prepare(x, y, transform_size, &config)
    .map_err(LspError::Engine)?;
  let spectra = engine.execute(plan).map_err(LspError::Engine)?;
  spectra.check_shape(ng)?;

  Ok(spectra)
}

pub(crate) fn check_inputs<T: FloatExt>(
  x: &ArrayView1<T>,
  y: &ArrayView1<T>,
  transform_size: usize,
) -> anyhow::Result<()> {
  anyhow::ensure!(
    x.len() == y.len(),
    "got {} scaled times but {} values",
    x.len(),
    y.len()
  );
  anyhow::ensure!(
    transform_size >= 2 && transform_size % 2 == 0,
    "transform size must be even and at least 2, got {transform_size}"
  );
  let half = T::from_f64_fast(0.5);
  if let Some(bad) = x.iter().find(|&&v| !(v >= -half && v < half)) {
    anyhow::bail!("scaled time {bad} lies outside [-0.5, 0.5)");
  }
  Ok(())
}
