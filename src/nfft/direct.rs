use anyhow::Result;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray::Zip;
use num_complex::Complex;

use super::check_inputs;
use super::Spectra;
use crate::config::TransformConfig;
use crate::traits::FloatExt;
use crate::traits::NfftEngine;

/// Exact evaluation of the adjoint transform.
///
/// Cost is `O(N·M)`; meant for short series and for validating faster
/// engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectNdft;

#[derive(Debug, Clone)]
pub struct DirectPlan<T: FloatExt> {
  x: Array1<T>,
  y: Array1<T>,
  transform_size: usize,
  config: TransformConfig,
}

fn adjoint_sum<T: FloatExt>(x: &Array1<T>, weight: impl Fn(usize) -> T, k: usize) -> Complex<T> {
  let omega = (T::PI() + T::PI()) * T::from_usize_(k);
  x.iter()
    .enumerate()
    .fold(Complex::new(T::zero(), T::zero()), |acc, (i, &xi)| {
      acc + Complex::from_polar(weight(i), omega * xi)
    })
}

impl<T: FloatExt> NfftEngine<T> for DirectNdft {
  type Plan = DirectPlan<T>;

  fn prepare(
    &self,
    x: ArrayView1<T>,
    y: ArrayView1<T>,
    transform_size: usize,
    config: &TransformConfig,
  ) -> Result<DirectPlan<T>> {
    check_inputs(&x, &y, transform_size)?;
    Ok(DirectPlan {
      x: x.to_owned(),
      y: y.to_owned(),
      transform_size,
      config: *config,
    })
  }

  fn execute(&self, plan: DirectPlan<T>) -> Result<Spectra<T>> {
    let m = plan.transform_size;

    let mut signal = Array1::<Complex<T>>::zeros(m / 2);
    Zip::indexed(&mut signal).par_for_each(|k, s| {
      *s = adjoint_sum(&plan.x, |i| plan.y[i], k);
    });

    let mut window = Array1::<Complex<T>>::zeros(if plan.config.compute_window() { m } else { 0 });
    Zip::indexed(&mut window).par_for_each(|k, w| {
      *w = adjoint_sum(&plan.x, |_| T::one(), k);
    });

    Ok(Spectra { signal, window })
  }
}
