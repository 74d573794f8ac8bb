//! Periodogram error types

/// Result type for periodogram operations
pub type Result<T> = std::result::Result<T, LspError>;

/// Errors reported by the periodogram pipeline
#[derive(Debug, thiserror::Error)]
pub enum LspError {
  /// Input rejected before any transform work was done
  #[error("invalid argument `{arg}`: {reason}")]
  InvalidArgument { arg: &'static str, reason: String },

  /// The NFFT engine failed (allocation, library loading, transfer)
  #[error("NFFT engine failure: {0:#}")]
  Engine(anyhow::Error),

  /// The NFFT engine returned a spectrum of unexpected length
  #[error("{name} spectrum has {actual} coefficients, expected {expected}")]
  SpectrumLength {
    name: &'static str,
    expected: usize,
    actual: usize,
  },

  /// Non-positive normalization sum or non-finite power in a bin
  #[error("degenerate normalization at frequency bin {bin}")]
  DegenerateBin { bin: usize },
}

impl LspError {
  pub(crate) fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidArgument {
      arg,
      reason: reason.into(),
    }
  }
}
