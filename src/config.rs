//! Pipeline configuration.

use crate::traits::FloatExt;

/// Options recognized from the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LspFlags {
  /// Skip the device to host copy of the intermediate spectra.
  pub retain_on_device: bool,
  /// Compute the window transform.
  pub compute_window: bool,
  /// Log elapsed time of every pipeline stage.
  pub print_timing: bool,
}

impl LspFlags {
  pub fn with_timing(mut self, on: bool) -> Self {
    self.print_timing = on;
    self
  }
}

/// Configuration handed to an NFFT engine.
///
/// Built once from the caller's [`LspFlags`]. The window transform and
/// device residency are always on: the power kernel needs the window
/// spectrum and reads both spectra where the engine produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
  retain_on_device: bool,
  compute_window: bool,
  print_timing: bool,
}

impl TransformConfig {
  pub const RETAIN_ON_DEVICE: u32 = 1;
  pub const COMPUTE_WINDOW: u32 = 1 << 1;
  pub const PRINT_TIMING: u32 = 1 << 2;

  pub fn from_flags(flags: LspFlags) -> Self {
    Self {
      retain_on_device: true,
      compute_window: true,
      print_timing: flags.print_timing,
    }
  }

  pub fn retain_on_device(&self) -> bool {
    self.retain_on_device
  }

  pub fn compute_window(&self) -> bool {
    self.compute_window
  }

  pub fn print_timing(&self) -> bool {
    self.print_timing
  }

  /// Bit encoding for engines behind a C ABI.
  pub fn bits(&self) -> u32 {
    let mut bits = 0;
    if self.retain_on_device {
      bits |= Self::RETAIN_ON_DEVICE;
    }
    if self.compute_window {
      bits |= Self::COMPUTE_WINDOW;
    }
    if self.print_timing {
      bits |= Self::PRINT_TIMING;
    }
    bits
  }
}

/// Closed-form conversion from the two spectra to power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerFormula {
  /// Unrotated signal terms normalized by half the grid length.
  #[default]
  Reference,
  /// Signal terms rotated by the window phase and normalized by half the
  /// sample count (classical τ-shifted statistic).
  Rotated,
}

/// What to do with bins whose normalization sums are not positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DegeneracyPolicy {
  /// Keep whatever the formula produced (`inf`, `NaN` or negative values).
  #[default]
  Propagate,
  /// Fail with [`crate::LspError::DegenerateBin`].
  Reject,
}

/// Configuration for periodogram estimation.
#[derive(Debug, Clone, Copy)]
pub struct LspConfig<T: FloatExt> {
  /// Frequency grid density relative to `1 / time span`.
  pub oversampling: T,
  /// Highest frequency relative to the mean Nyquist rate `N / (2 span)`.
  pub hifac: T,
  /// Caller flags.
  pub flags: LspFlags,
  /// Power formula used by the kernel.
  pub formula: PowerFormula,
  /// Degenerate bin handling.
  pub degeneracy: DegeneracyPolicy,
}

impl<T: FloatExt> Default for LspConfig<T> {
  fn default() -> Self {
    Self {
      oversampling: T::from_usize_(4),
      hifac: T::one(),
      flags: LspFlags::default(),
      formula: PowerFormula::default(),
      degeneracy: DegeneracyPolicy::default(),
    }
  }
}
