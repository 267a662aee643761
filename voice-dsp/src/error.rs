use core::fmt;

/// Errors raised by the scale and analysis code.
///
/// Everything here is a wiring mistake on the caller's side. Degraded input
/// (empty frames, zero elapsed time) is never reported as an error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum DspError {
    /// A scale mode name or tag that is neither linear nor logarithmic.
    InvalidScaleMode,
    /// Logarithm base must be positive and different from one.
    InvalidLogBase,
    /// The requested upper frequency lies above the Nyquist frequency.
    MaxFrequencyAboveNyquist,
    /// Sample rate or bin count of zero.
    EmptySpectrum,
    /// A PCM frame of the wrong length was handed to the analyser.
    FrameLength { expected: usize, actual: usize },
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DspError::InvalidScaleMode => write!(f, "invalid scale mode"),
            DspError::InvalidLogBase => write!(f, "logarithm base must be > 0 and != 1"),
            DspError::MaxFrequencyAboveNyquist => {
                write!(f, "maximum frequency exceeds the Nyquist frequency")
            }
            DspError::EmptySpectrum => write!(f, "sample rate and bin count must be non-zero"),
            DspError::FrameLength { expected, actual } => {
                write!(f, "expected {} samples per frame, got {}", expected, actual)
            }
        }
    }
}

impl core::error::Error for DspError {}

pub type Result<T> = core::result::Result<T, DspError>;
