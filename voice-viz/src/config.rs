use voice_dsp::{ScaleMode, TrackConfig};

// --- Audio ---
pub const SAMPLE_RATE_HZ: f64 = 48_000.0;
pub const BIN_COUNT: usize = voice_dsp::BIN_COUNT;

// --- Scale ---
pub const SPECTROGRAM_MAX_HZ: f64 = 15_000.0;
pub const BAR_VIEW_MAX_HZ: f64 = 1_000.0;
pub const HZ_MAX_FLOOR: f64 = 1_000.0; // Lowest top-of-axis reachable with hz_max_increment
pub const HZ_MAX_CEILING: f64 = 15_000.0;
pub const LOG_BASE: f64 = 2.0;
pub const SCALE_STRIP_PX: u32 = 100; // Ruler strip beside (spectrogram) or below (bar view) the plot
pub const SCALE_TICK_STEP_PX: u32 = 50;

// --- Drawing ---
pub const SCROLL_PIXELS_PER_SECOND: f32 = 100.0;
pub const MARKER_HEIGHT_PX: u32 = 2;
pub const PITCH_MARKER_HEIGHT_PX: u32 = 8;
pub const BAR_HEIGHT_RATIO: f64 = 0.7; // Full-scale bar height as a share of the plot

/// Everything a visualizer needs at construction time.
#[derive(Debug, Clone, Copy)]
pub struct VisualizerConfig {
    pub sample_rate: f64,
    pub bin_count: usize,
    pub max_hz: f64,
    pub scale_mode: ScaleMode,
    pub log_base: f64,
    pub scale_strip_px: u32,
    pub pixels_per_second: f32,
    pub track: TrackConfig,
}

impl VisualizerConfig {
    /// Defaults for the scrolling spectrogram.
    pub fn spectrogram() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_HZ,
            bin_count: BIN_COUNT,
            max_hz: SPECTROGRAM_MAX_HZ,
            scale_mode: ScaleMode::Logarithmic,
            log_base: LOG_BASE,
            scale_strip_px: SCALE_STRIP_PX,
            pixels_per_second: SCROLL_PIXELS_PER_SECOND,
            track: TrackConfig::default(),
        }
    }

    /// Defaults for the 1-D bar view.
    pub fn bar_view() -> Self {
        Self {
            max_hz: BAR_VIEW_MAX_HZ,
            scale_mode: ScaleMode::Linear,
            ..Self::spectrogram()
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self::spectrogram()
    }
}
