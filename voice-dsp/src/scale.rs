use core::str::FromStr;

use libm::{log, pow, round};

use crate::error::{DspError, Result};

/// How frequency bins are laid out along the display axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum ScaleMode {
    Linear,
    #[default]
    Logarithmic,
}

impl ScaleMode {
    pub fn toggled(self) -> Self {
        match self {
            ScaleMode::Linear => ScaleMode::Logarithmic,
            ScaleMode::Logarithmic => ScaleMode::Linear,
        }
    }
}

impl FromStr for ScaleMode {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(ScaleMode::Linear),
            "log" | "logarithmic" => Ok(ScaleMode::Logarithmic),
            _ => Err(DspError::InvalidScaleMode),
        }
    }
}

impl TryFrom<u8> for ScaleMode {
    type Error = DspError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ScaleMode::Linear),
            1 => Ok(ScaleMode::Logarithmic),
            _ => Err(DspError::InvalidScaleMode),
        }
    }
}

/// Logarithm of `x` in `base`, rounded to 9 decimal places.
///
/// The rounding keeps values that should land exactly on a pixel boundary
/// from flickering between neighbouring rows.
pub fn base_log(x: f64, base: f64) -> f64 {
    round(log(x) / log(base) * 1e9) / 1e9
}

/// Inverse of [`base_log`].
pub fn base_pow(exponent: f64, base: f64) -> f64 {
    pow(base, exponent)
}

/// Lower end of every frequency axis. Position 0 is always DC.
pub const MIN_HZ: f64 = 0.0;

/// Bidirectional mapping between frequency bins and a screen axis.
///
/// Positions are measured from the low-frequency end of the axis. Renderers
/// flip them when the axis runs the other way (the spectrogram puts low
/// frequencies at the bottom).
#[derive(Debug, Clone)]
pub struct ScaleTransform {
    mode: ScaleMode,
    log_base: f64,
    max_hz: f64,
    sample_rate: f64,
    bin_count: usize,
    extent: u32,
    scale_factor: f64,
    repaint: bool,
}

impl ScaleTransform {
    /// Creates a transform for a spectrum of `bin_count` bins sampled at
    /// `sample_rate`, showing frequencies up to `max_hz`.
    ///
    /// The extent starts at zero; call [`ScaleTransform::update_scale`] with
    /// the measured viewport before mapping positions.
    pub fn new(sample_rate: f64, bin_count: usize, max_hz: f64) -> Result<Self> {
        if sample_rate <= 0.0 || bin_count == 0 {
            return Err(DspError::EmptySpectrum);
        }
        if max_hz > sample_rate / 2.0 {
            return Err(DspError::MaxFrequencyAboveNyquist);
        }
        Ok(Self {
            mode: ScaleMode::default(),
            log_base: 2.0,
            max_hz,
            sample_rate,
            bin_count,
            extent: 0,
            scale_factor: 0.0,
            repaint: true,
        })
    }

    pub fn with_mode(mut self, mode: ScaleMode) -> Self {
        self.mode = mode;
        self.recompute();
        self
    }

    pub fn with_log_base(mut self, base: f64) -> Result<Self> {
        if !(base > 0.0) || base == 1.0 {
            return Err(DspError::InvalidLogBase);
        }
        self.log_base = base;
        self.recompute();
        Ok(self)
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn log_base(&self) -> f64 {
        self.log_base
    }

    pub fn max_hz(&self) -> f64 {
        self.max_hz
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn extent(&self) -> u32 {
        self.extent
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Fractional bin index of `hz`. Independent of the scale mode.
    pub fn index_from_hz(&self, hz: f64) -> f64 {
        hz / self.nyquist() * self.bin_count as f64
    }

    pub fn hz_from_index(&self, index: f64) -> f64 {
        index / self.bin_count as f64 * self.nyquist()
    }

    /// Highest bin index shown on the axis.
    pub fn max_index(&self) -> f64 {
        self.index_from_hz(self.max_hz)
    }

    /// Axis position of a (fractional) bin.
    ///
    /// In logarithmic mode indices below 1 are clamped to 1, so the DC bin and
    /// 0 Hz map onto the start of the axis instead of negative infinity.
    pub fn position_from_index(&self, index: f64) -> f64 {
        match self.mode {
            ScaleMode::Linear => index * self.scale_factor,
            ScaleMode::Logarithmic => base_log(index.max(1.0), self.log_base) * self.scale_factor,
        }
    }

    pub fn index_from_position(&self, position: f64) -> f64 {
        if self.scale_factor == 0.0 {
            return 0.0;
        }
        match self.mode {
            ScaleMode::Linear => position / self.scale_factor,
            ScaleMode::Logarithmic => base_pow(position / self.scale_factor, self.log_base),
        }
    }

    pub fn position_from_hz(&self, hz: f64) -> f64 {
        self.position_from_index(self.index_from_hz(hz))
    }

    pub fn hz_from_position(&self, position: f64) -> f64 {
        self.hz_from_index(self.index_from_position(position))
    }

    /// Adopts a freshly measured viewport extent.
    ///
    /// Returns `true` when the extent changed and the scale factor was
    /// recomputed, meaning static decorations must be repainted.
    pub fn update_scale(&mut self, extent: u32) -> bool {
        if extent == self.extent {
            return false;
        }
        self.extent = extent;
        self.recompute();
        true
    }

    pub fn set_mode(&mut self, mode: ScaleMode) {
        self.mode = mode;
        self.recompute();
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    /// Moves the top of the axis. Frequencies above Nyquist are rejected.
    pub fn set_max_hz(&mut self, max_hz: f64) -> Result<()> {
        if max_hz > self.nyquist() {
            return Err(DspError::MaxFrequencyAboveNyquist);
        }
        self.max_hz = max_hz;
        self.recompute();
        Ok(())
    }

    /// Returns and clears the pending-repaint flag set by any recomputation.
    pub fn take_repaint(&mut self) -> bool {
        core::mem::take(&mut self.repaint)
    }

    fn recompute(&mut self) {
        let top = self.max_index();
        let span = match self.mode {
            ScaleMode::Linear => top,
            ScaleMode::Logarithmic => base_log(top.max(1.0), self.log_base),
        };
        self.scale_factor = if span != 0.0 && self.extent > 0 {
            self.extent as f64 / span
        } else {
            0.0
        };
        self.repaint = true;
    }
}
