//! # nfft-lsp
//!
//! $$
//! P(f)=\frac{1}{2\sigma^2}\left[\frac{\left(\sum_i y_i\cos\omega(t_i-\tau)\right)^2}{\sum_i\cos^2\omega(t_i-\tau)}
//! +\frac{\left(\sum_i y_i\sin\omega(t_i-\tau)\right)^2}{\sum_i\sin^2\omega(t_i-\tau)}\right]
//! $$
//!
//! Fast Lomb-Scargle periodograms of unevenly sampled series. Both
//! trigonometric sums are evaluated for every frequency at once with an
//! adjoint non-uniform FFT.
//!
//! | Module | Role |
//! |---|---|
//! | [`preprocess`] | time scaling to `[-a, a)`, mean removal, variance |
//! | [`nfft`] | adjoint NFFT engines (CPU gridding, direct sums, CUDA) |
//! | [`kernel`] | per-bin conversion of spectra into power |
//! | [`significance`] | false-alarm probability of a peak |
//! | [`periodogram`] | frequency grid, orchestration, peak search |
//! | [`visualization`] | plotly charts of a periodogram |
//!
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(all(feature = "jemalloc", not(feature = "mimalloc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod config;
pub mod error;
pub mod kernel;
pub mod nfft;
pub mod periodogram;
pub mod preprocess;
pub mod significance;
pub mod traits;
pub mod visualization;

pub use config::DegeneracyPolicy;
pub use config::LspConfig;
pub use config::LspFlags;
pub use config::PowerFormula;
pub use config::TransformConfig;
pub use error::LspError;
pub use error::Result;
#[cfg(feature = "cuda")]
pub use nfft::CudaNfft;
pub use nfft::CpuNfft;
pub use nfft::DirectNdft;
pub use nfft::Spectra;
pub use periodogram::compute_periodogram;
pub use periodogram::FrequencyGrid;
pub use periodogram::LombScargle;
pub use periodogram::Peak;
pub use periodogram::PeakSearchConfig;
pub use periodogram::Periodogram;
pub use significance::detection_significance;
pub use significance::false_alarm_probability;
pub use significance::significance_threshold;
pub use traits::FloatExt;
pub use traits::NfftEngine;
pub use visualization::PeriodogramPlotter;
