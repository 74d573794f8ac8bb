//! # Traits
//!
//! $$
//! \hat f_k=\sum_{i=0}^{N-1} f_i\,e^{2\pi i k x_i},\qquad x_i\in[-\tfrac12,\tfrac12)
//! $$
//!
use std::fmt::Debug;
use std::fmt::Display;
use std::iter::Sum;

use anyhow::Result;
use ndarray::ArrayView1;
use ndarray::ScalarOperand;
use ndrustfft::FftNum;

use crate::config::TransformConfig;
use crate::nfft::Spectra;

/// Floating point scalar the whole pipeline is generic over.
///
/// The width is picked once per call site (`f32` or `f64`), every bin of the
/// power kernel is evaluated in that width.
pub trait FloatExt:
  num_traits::Float
  + num_traits::FromPrimitive
  + num_traits::FloatConst
  + num_traits::NumAssign
  + FftNum
  + Sum
  + Default
  + Debug
  + Display
  + Send
  + Sync
  + ScalarOperand
  + 'static
{
  fn from_usize_(n: usize) -> Self;
  fn from_f64_fast(v: f64) -> Self;
}

impl FloatExt for f64 {
  fn from_usize_(n: usize) -> Self {
    n as f64
  }

  fn from_f64_fast(v: f64) -> Self {
    v
  }
}

impl FloatExt for f32 {
  fn from_usize_(n: usize) -> Self {
    n as f32
  }

  fn from_f64_fast(v: f64) -> Self {
    v as f32
  }
}

/// Adjoint non-uniform FFT engine.
///
/// For scaled times `x` in `[-0.5, 0.5)`, weights `y` and transform size `M`
/// an engine produces
///
/// - `signal[k] = Σ y_i exp(2πi k x_i)` for `k` in `[0, M/2)`
/// - `window[k] = Σ exp(2πi k x_i)` for `k` in `[0, M)` (when the window
///   transform is requested)
///
/// `execute` blocks until both spectra are available.
pub trait NfftEngine<T: FloatExt>: Send + Sync {
  type Plan;

  fn prepare(
    &self,
    x: ArrayView1<T>,
    y: ArrayView1<T>,
    transform_size: usize,
    config: &TransformConfig,
  ) -> Result<Self::Plan>;

  fn execute(&self, plan: Self::Plan) -> Result<Spectra<T>>;
}
