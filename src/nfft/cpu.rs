//! # CPU
//!
//! $$
//! \hat f_k \approx e^{b(\pi k/n)^2}\sum_{l=0}^{n-1} g_l\,e^{2\pi i k l/n},\quad
//! g_l=\sum_i f_i\,\tilde\varphi\!\left(x_i-\tfrac{l}{n}\right),\quad
//! \varphi(x)=\tfrac{1}{\sqrt{\pi b}}e^{-(nx)^2/b}
//! $$
//!
use anyhow::Result;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndrustfft::ndfft;
use ndrustfft::FftHandler;
use num_complex::Complex;

use super::check_inputs;
use super::Spectra;
use crate::config::TransformConfig;
use crate::traits::FloatExt;
use crate::traits::NfftEngine;

/// Adjoint NFFT with a truncated Gaussian window.
#[derive(Debug, Clone, Copy)]
pub struct CpuNfft {
  /// Oversampled grid length relative to the transform size.
  pub grid_factor: usize,
  /// Grid points on each side of a sample touched by gridding.
  pub half_width: usize,
}

impl Default for CpuNfft {
  fn default() -> Self {
    Self {
      grid_factor: 2,
      half_width: 8,
    }
  }
}

impl CpuNfft {
  pub fn new(grid_factor: usize, half_width: usize) -> Self {
    Self {
      grid_factor,
      half_width,
    }
  }

  /// Gaussian shape parameter for the configured grid and width.
  fn shape<T: FloatExt>(&self) -> T {
    let sigma = T::from_usize_(self.grid_factor);
    let two = T::from_usize_(2);
    two * sigma * T::from_usize_(self.half_width) / ((two * sigma - T::one()) * T::PI())
  }
}

/// Scaled inputs and sizes for one [`CpuNfft`] run.
#[derive(Debug, Clone)]
pub struct CpuPlan<T: FloatExt> {
  x: Array1<T>,
  y: Array1<T>,
  transform_size: usize,
  config: TransformConfig,
}

impl<T: FloatExt> NfftEngine<T> for CpuNfft {
  type Plan = CpuPlan<T>;

  fn prepare(
    &self,
    x: ArrayView1<T>,
    y: ArrayView1<T>,
    transform_size: usize,
    config: &TransformConfig,
  ) -> Result<CpuPlan<T>> {
    anyhow::ensure!(
      self.grid_factor >= 2,
      "grid factor must be at least 2, got {}",
      self.grid_factor
    );
    anyhow::ensure!(self.half_width >= 1, "kernel half width must be positive");
    check_inputs(&x, &y, transform_size)?;
    anyhow::ensure!(
      2 * self.half_width < self.grid_factor * transform_size,
      "kernel half width {} too large for a grid of {} points",
      self.half_width,
      self.grid_factor * transform_size
    );

    Ok(CpuPlan {
      x: x.to_owned(),
      y: y.to_owned(),
      transform_size,
      config: *config,
    })
  }

  fn execute(&self, plan: CpuPlan<T>) -> Result<Spectra<T>> {
    let m = plan.transform_size;
    let half = m / 2;
    let n = self.grid_factor * m;
    let n_t = T::from_usize_(n);
    let b = self.shape::<T>();
    let norm = T::one() / (T::PI() * b).sqrt();
    let two_pi = T::PI() + T::PI();
    let width = self.half_width as isize;
    let with_window = plan.config.compute_window();

    let mut signal_grid = Array1::<Complex<T>>::zeros(n);
    let mut window_grid = Array1::<Complex<T>>::zeros(if with_window { n } else { 0 });

    for (&xi, &yi) in plan.x.iter().zip(plan.y.iter()) {
      let u = xi * n_t;
      let base = u
        .floor()
        .to_isize()
        .ok_or_else(|| anyhow::anyhow!("scaled time {xi} cannot be gridded"))?;
      // shifts window frequencies [-M/2, M/2) onto [0, M)
      let shift = Complex::from_polar(T::one(), two_pi * T::from_usize_(half) * xi);

      for l in base - width + 1..=base + width {
        let d = u - T::from_f64_fast(l as f64);
        let phi = norm * (-(d * d) / b).exp();
        let idx = l.rem_euclid(n as isize) as usize;
        signal_grid[idx] += Complex::new(yi * phi, T::zero());
        if with_window {
          window_grid[idx] += shift.scale(phi);
        }
      }
    }

    let handler = FftHandler::<T>::new(n);
    let deconvolve = |k: isize| {
      let arg = T::PI() * T::from_f64_fast(k as f64) / n_t;
      (b * arg * arg).exp()
    };
    // Σ_l g_l e^{+2πikl/n} is the forward transform read at -k
    let read = |grid: &Array1<Complex<T>>, k: isize| grid[(-k).rem_euclid(n as isize) as usize];

    let mut signal_fft = Array1::<Complex<T>>::zeros(n);
    ndfft(&signal_grid, &mut signal_fft, &handler, 0);
    let signal = Array1::from_shape_fn(half, |k| {
      let k = k as isize;
      read(&signal_fft, k).scale(deconvolve(k))
    });

    let window = if with_window {
      let mut window_fft = Array1::<Complex<T>>::zeros(n);
      ndfft(&window_grid, &mut window_fft, &handler, 0);
      Array1::from_shape_fn(m, |k| {
        let k = k as isize - half as isize;
        read(&window_fft, k).scale(deconvolve(k))
      })
    } else {
      Array1::zeros(0)
    };

    Ok(Spectra { signal, window })
  }
}
