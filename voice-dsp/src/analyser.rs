use microdsp::common::{apply_window_function, real_fft, WindowFunctionType::Hann};
use microfft::Complex32;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::error::{DspError, Result};

/// Transform length, in samples.
pub const FFT_SIZE: usize = 1024;
/// Bins per magnitude frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

/// Normalize a single sample from i16 to f32.
pub fn normalize_sample(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Normalize a slice of i16 samples to a slice of f32 samples.
pub fn normalize_samples(samples: &[i16], normalized_samples: &mut [f32]) {
    for (out, &sample) in normalized_samples.iter_mut().zip(samples) {
        *out = normalize_sample(sample);
    }
}

/// Apply a Hann window to a slice of f32 samples.
pub fn apply_hann_window(samples: &mut [f32]) {
    apply_window_function(Hann, samples);
}

/// Compute the FFT of a slice of f32 samples.
pub fn compute_fft(samples: &mut [f32; FFT_SIZE]) -> &mut [Complex32] {
    real_fft(samples)
}

/// Compute the magnitude of the FFT output.
///
/// The real FFT packs the Nyquist component into the imaginary part of bin 0,
/// so bin 0 only uses its real part.
pub fn compute_magnitude(fft_output: &[Complex32]) -> Result<[f32; BIN_COUNT]> {
    if fft_output.len() != BIN_COUNT {
        return Err(DspError::FrameLength {
            expected: BIN_COUNT,
            actual: fft_output.len(),
        });
    }
    let mut magnitude = [0.0; BIN_COUNT];
    magnitude[0] = fft_output[0].re.abs();
    for i in 1..BIN_COUNT {
        let component = fft_output[i];
        magnitude[i] = (component.re * component.re + component.im * component.im).sqrt();
    }
    Ok(magnitude)
}

/// Process a frame of i16 samples and return the magnitude spectrum.
pub fn process_frame(samples: &[i16]) -> Result<[f32; BIN_COUNT]> {
    if samples.len() != FFT_SIZE {
        return Err(DspError::FrameLength {
            expected: FFT_SIZE,
            actual: samples.len(),
        });
    }

    let mut normalized_samples = [0.0; FFT_SIZE];
    normalize_samples(samples, &mut normalized_samples);
    apply_hann_window(&mut normalized_samples);
    let fft_output = compute_fft(&mut normalized_samples);
    compute_magnitude(fft_output)
}

/// Turns PCM frames into byte magnitude frames.
///
/// Magnitudes are scaled by `1 / FFT_SIZE`, blended with the previous frame
/// (`smoothing` is the weight of the old value), converted to decibels and
/// mapped linearly from `[min_decibels, max_decibels]` onto `0..=255`.
#[derive(Debug, Clone)]
pub struct ByteAnalyser {
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    smoothed: [f32; BIN_COUNT],
    bytes: [u8; BIN_COUNT],
}

impl Default for ByteAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteAnalyser {
    pub fn new() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            smoothed: [0.0; BIN_COUNT],
            bytes: [0; BIN_COUNT],
        }
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    /// Sets the decibel window. An empty or inverted range is ignored.
    pub fn with_decibel_range(mut self, min_decibels: f32, max_decibels: f32) -> Self {
        if max_decibels > min_decibels {
            self.min_decibels = min_decibels;
            self.max_decibels = max_decibels;
        }
        self
    }

    /// Latest byte frame without reprocessing.
    pub fn frame(&self) -> &[u8; BIN_COUNT] {
        &self.bytes
    }

    pub fn process(&mut self, samples: &[i16]) -> Result<&[u8; BIN_COUNT]> {
        let magnitude = process_frame(samples)?;
        let range = self.max_decibels - self.min_decibels;
        for ((smoothed, byte), &raw) in self
            .smoothed
            .iter_mut()
            .zip(self.bytes.iter_mut())
            .zip(magnitude.iter())
        {
            let scaled = raw / FFT_SIZE as f32;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * scaled;
            *byte = if *smoothed <= 0.0 {
                0
            } else {
                let decibels = 20.0 * smoothed.log10();
                (255.0 * (decibels - self.min_decibels) / range).clamp(0.0, 255.0) as u8
            };
        }
        Ok(&self.bytes)
    }

    pub fn reset(&mut self) {
        self.smoothed = [0.0; BIN_COUNT];
        self.bytes = [0; BIN_COUNT];
    }
}
