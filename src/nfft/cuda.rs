//! # CUDA
//!
//! $$
//! (x,y)\xrightarrow{\text{init\_plan}}\text{plan}\xrightarrow{\text{cunfft\_adjoint\_from\_plan}}(S,W)
//! $$
//!
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use libloading::Library;
use ndarray::Array1;
use ndarray::ArrayView1;
use num_complex::Complex;
use num_complex::Complex64;
use tracing::debug;

use super::check_inputs;
use super::Spectra;
use crate::config::TransformConfig;
use crate::traits::FloatExt;
use crate::traits::NfftEngine;

type InitPlanFn = unsafe extern "C" fn(*const f64, *const f64, i32, i32, u32) -> *mut c_void;
type AdjointFn = unsafe extern "C" fn(*mut c_void) -> i32;
type CopySpectraFn = unsafe extern "C" fn(*const c_void, *mut f64, *mut f64) -> i32;
type FreePlanFn = unsafe extern "C" fn(*mut c_void);

/// Entry points resolved from the shared library, which is kept loaded for
/// as long as the pointers are reachable.
struct CudaLibrary {
  _lib: Library,
  init_plan: InitPlanFn,
  adjoint: AdjointFn,
  copy_spectra: CopySpectraFn,
  free_plan: FreePlanFn,
}

impl CudaLibrary {
  const PATH_ENV: &'static str = "NFFT_LSP_CUDA_LIB_PATH";

  /// Explicit path first (runtime, then build time), then the platform name.
  fn search_path() -> Vec<PathBuf> {
    let platform = if cfg!(target_os = "windows") {
      Some("cunfft.dll")
    } else if cfg!(target_os = "linux") {
      Some("libcunfft.so")
    } else {
      None
    };

    std::env::var(Self::PATH_ENV)
      .ok()
      .into_iter()
      .chain(option_env!("NFFT_LSP_CUDA_LIB").map(str::to_string))
      .filter(|p| !p.is_empty())
      .map(PathBuf::from)
      .chain(platform.map(PathBuf::from))
      .collect()
  }

  fn open() -> Result<Self> {
    let paths = Self::search_path();
    anyhow::ensure!(
      !paths.is_empty(),
      "no CUDA NFFT library path configured, set {}",
      Self::PATH_ENV
    );

    let mut failures = Vec::with_capacity(paths.len());
    for path in &paths {
      match unsafe { Library::new(path) } {
        Ok(lib) => {
          debug!(path = %path.display(), "loaded CUDA NFFT library");
          return Self::resolve(lib).with_context(|| format!("in {}", path.display()));
        }
        Err(err) => failures.push(format!("{}: {err}", path.display())),
      }
    }
    anyhow::bail!("failed to load CUDA NFFT library ({})", failures.join("; "))
  }

  fn resolve(lib: Library) -> Result<Self> {
    unsafe {
      Ok(Self {
        init_plan: Self::entry(&lib, "init_plan")?,
        adjoint: Self::entry(&lib, "cunfft_adjoint_from_plan")?,
        copy_spectra: Self::entry(&lib, "copy_spectra_from_plan")?,
        free_plan: Self::entry(&lib, "free_plan")?,
        _lib: lib,
      })
    }
  }

  /// Looks up `<name>_f64`, then `<name>`.
  ///
  /// # Safety
  /// `F` must match the exported signature.
  unsafe fn entry<F: Copy>(lib: &Library, name: &str) -> Result<F> {
    let wide = format!("{name}_f64");
    let found = [wide.as_str(), name]
      .into_iter()
      .find_map(|sym| lib.get::<F>(sym.as_bytes()).ok().map(|f| *f));
    found.with_context(|| format!("symbol `{name}` (or `{wide}`) not exported"))
  }
}

/// Adjoint NFFT executed by an external CUDA library.
///
/// The library is opened on first use and shared by every plan. It must
/// export
///
/// - `init_plan(x, y, npts, m, flags) -> plan` (null on failure)
/// - `cunfft_adjoint_from_plan(plan) -> status`
/// - `copy_spectra_from_plan(plan, signal, window) -> status` writing `m/2`
///   and `m` interleaved complex doubles
/// - `free_plan(plan)`
#[derive(Default)]
pub struct CudaNfft {
  library: Mutex<Option<Arc<CudaLibrary>>>,
}

impl CudaNfft {
  pub fn new() -> Self {
    Self::default()
  }

  fn library(&self) -> Result<Arc<CudaLibrary>> {
    let mut guard = self
      .library
      .lock()
      .map_err(|_| anyhow::anyhow!("CUDA library lock poisoned"))?;
    if let Some(lib) = guard.as_ref() {
      return Ok(Arc::clone(lib));
    }
    let lib = Arc::new(CudaLibrary::open()?);
    *guard = Some(Arc::clone(&lib));
    Ok(lib)
  }
}

/// Device plan owned by the CUDA library, released on drop.
pub struct CudaPlan {
  lib: Arc<CudaLibrary>,
  handle: *mut c_void,
  transform_size: usize,
}

impl Drop for CudaPlan {
  fn drop(&mut self) {
    unsafe {
      (self.lib.free_plan)(self.handle);
    }
  }
}

impl<T: FloatExt> NfftEngine<T> for CudaNfft {
  type Plan = CudaPlan;

  fn prepare(
    &self,
    x: ArrayView1<T>,
    y: ArrayView1<T>,
    transform_size: usize,
    config: &TransformConfig,
  ) -> Result<CudaPlan> {
    check_inputs(&x, &y, transform_size)?;
    let npts = i32::try_from(x.len())?;
    let m = i32::try_from(transform_size)?;
    let lib = self.library()?;

    let host_x = x.iter().map(|v| v.to_f64()).collect::<Option<Vec<f64>>>();
    let host_y = y.iter().map(|v| v.to_f64()).collect::<Option<Vec<f64>>>();
    let (Some(host_x), Some(host_y)) = (host_x, host_y) else {
      anyhow::bail!("inputs are not representable as f64");
    };

    let handle =
      unsafe { (lib.init_plan)(host_x.as_ptr(), host_y.as_ptr(), npts, m, config.bits()) };
    if handle.is_null() {
      anyhow::bail!("init_plan failed for {npts} points and transform size {m}");
    }

    Ok(CudaPlan {
      lib,
      handle,
      transform_size,
    })
  }

  fn execute(&self, plan: CudaPlan) -> Result<Spectra<T>> {
    let status = unsafe { (plan.lib.adjoint)(plan.handle) };
    if status != 0 {
      anyhow::bail!("cunfft_adjoint_from_plan failed with status {status}");
    }

    let m = plan.transform_size;
    let mut signal = vec![Complex64::new(0.0, 0.0); m / 2];
    let mut window = vec![Complex64::new(0.0, 0.0); m];
    let status = unsafe {
      (plan.lib.copy_spectra)(
        plan.handle,
        bytemuck::cast_slice_mut::<Complex64, f64>(&mut signal).as_mut_ptr(),
        bytemuck::cast_slice_mut::<Complex64, f64>(&mut window).as_mut_ptr(),
      )
    };
    if status != 0 {
      anyhow::bail!("copy_spectra_from_plan failed with status {status}");
    }

    let narrow = |z: &Complex64| Complex::new(T::from_f64_fast(z.re), T::from_f64_fast(z.im));
    Ok(Spectra {
      signal: signal.iter().map(narrow).collect::<Array1<_>>(),
      window: window.iter().map(narrow).collect::<Array1<_>>(),
    })
  }
}
