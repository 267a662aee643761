//! Spectral analysis for the live voice spectrogram: frequency/screen scale
//! mapping, smoothing and peak picking, and fundamental/formant tracking.
#![no_std]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Debug trace routed to `defmt` with the `logging` feature and to stdout with
/// the `std` feature. Compiles to nothing otherwise.
#[macro_export]
#[doc(hidden)]
macro_rules! dsp_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        defmt::debug!($($arg)*);
        #[cfg(feature = "std")]
        std::println!($($arg)*);
    }};
}

pub mod analyser;
pub mod error;
pub mod scale;
pub mod smoother;
pub mod track;

pub use analyser::{
    apply_hann_window, normalize_samples, process_frame, ByteAnalyser, BIN_COUNT, FFT_SIZE,
};
pub use error::{DspError, Result};
pub use scale::{ScaleMode, ScaleTransform};
pub use smoother::{
    detect_peaks, estimate_formants, moving_average, refine_fundamental, FormantBank,
    FormantEstimate, Peak,
};
pub use track::{
    FrequencyTrack, FundamentalEstimate, FundamentalPolicy, TrackConfig, TrackMode,
};
