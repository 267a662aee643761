use alloc::{vec, vec::Vec};

use libm::floor;

use crate::dsp_log;
use crate::scale::ScaleTransform;
use crate::smoother::{
    detect_peaks, estimate_formants, moving_average, refine_fundamental, FormantEstimate,
};

/// Fundamentals are only searched below this frequency.
pub const FUNDAMENTAL_SEARCH_CEILING_HZ: f64 = 5_000.0;
/// Share of the loudest bin a candidate must exceed.
const FUNDAMENTAL_THRESHOLD_RATIO: f32 = 0.7;

const FORMANT_SMOOTHING_WIDE: usize = 20;
const FORMANT_SMOOTHING_NARROW: usize = 10;
const FORMANT_SMOOTHING_LIMIT: usize = 1000;
const FORMANT_SEGMENT_SIZE: usize = 6;
const FORMANT_SEGMENT_GROWTH: f64 = 1.0;

/// Frames between two tracker state traces.
const LOG_INTERVAL_FRAMES: u8 = 200;

pub const DEFAULT_FORMANT_COUNT: usize = 3;
pub const DEFAULT_FUNDAMENTAL_MIN_AMPLITUDE: u8 = 150;

/// Which above-threshold run of bins becomes the fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum FundamentalPolicy {
    /// Stop at the end of the first run. A later, louder run is ignored; the
    /// scan stays a single bounded pass per frame.
    #[default]
    FirstRun,
    /// Look at every run and keep the loudest one.
    StrongestRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum TrackMode {
    Idle,
    FundamentalOnly,
    FormantsOnly,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackConfig {
    pub track_fundamental: bool,
    pub track_formants: bool,
    pub formant_count: usize,
    pub fundamental_min_amplitude: u8,
    pub fundamental_policy: FundamentalPolicy,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            track_fundamental: false,
            track_formants: false,
            formant_count: DEFAULT_FORMANT_COUNT,
            fundamental_min_amplitude: DEFAULT_FUNDAMENTAL_MIN_AMPLITUDE,
            fundamental_policy: FundamentalPolicy::FirstRun,
        }
    }
}

impl TrackConfig {
    pub fn mode(&self) -> TrackMode {
        match (self.track_fundamental, self.track_formants) {
            (false, false) => TrackMode::Idle,
            (true, false) => TrackMode::FundamentalOnly,
            (false, true) => TrackMode::FormantsOnly,
            (true, true) => TrackMode::Both,
        }
    }

    /// Flips fundamental and formant tracking together. The single-flag modes
    /// are reached through the setters on [`FrequencyTrack`].
    pub fn toggle_formant_tracking(&mut self) {
        self.track_fundamental = !self.track_fundamental;
        self.track_formants = !self.track_formants;
    }
}

/// Result of one fundamental search. Index 0 means no signal, never the DC bin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct FundamentalEstimate {
    pub index: f32,
    pub amplitude: u8,
}

impl FundamentalEstimate {
    pub const NONE: Self = Self {
        index: 0.0,
        amplitude: 0,
    };

    pub fn is_none(&self) -> bool {
        self.index == 0.0
    }
}

/// Per-frame fundamental and formant estimator.
///
/// Slot 0 holds the last committed fundamental, slots `1..=formant_count`
/// the formants. Slots are overwritten in place every frame.
#[derive(Debug, Clone)]
pub struct FrequencyTrack {
    config: TrackConfig,
    slots: Vec<FormantEstimate>,
    fundamental_amplitude: u8,
    log_counter: u8,
}

impl FrequencyTrack {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            slots: vec![FormantEstimate::default(); config.formant_count + 1],
            config,
            fundamental_amplitude: 0,
            log_counter: 0,
        }
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn mode(&self) -> TrackMode {
        self.config.mode()
    }

    pub fn toggle_formant_tracking(&mut self) {
        self.config.toggle_formant_tracking();
    }

    pub fn set_track_fundamental(&mut self, enabled: bool) {
        self.config.track_fundamental = enabled;
    }

    pub fn set_track_formants(&mut self, enabled: bool) {
        self.config.track_formants = enabled;
    }

    pub fn set_fundamental_min_amplitude(&mut self, amplitude: u8) {
        self.config.fundamental_min_amplitude = amplitude;
    }

    pub fn set_fundamental_policy(&mut self, policy: FundamentalPolicy) {
        self.config.fundamental_policy = policy;
    }

    /// Changes the number of tracked formants, discarding current estimates.
    pub fn set_formant_count(&mut self, count: usize) {
        self.config.formant_count = count;
        self.slots = vec![FormantEstimate::default(); count + 1];
    }

    pub fn slots(&self) -> &[FormantEstimate] {
        &self.slots
    }

    pub fn fundamental(&self) -> &FormantEstimate {
        &self.slots[0]
    }

    pub fn formants(&self) -> &[FormantEstimate] {
        &self.slots[1..]
    }

    /// Raw amplitude of the most recent fundamental candidate, committed or not.
    pub fn fundamental_amplitude(&self) -> u8 {
        self.fundamental_amplitude
    }

    /// Whether the latest candidate was loud enough to be drawn.
    pub fn fundamental_above_minimum(&self) -> bool {
        self.fundamental_amplitude > self.config.fundamental_min_amplitude
    }

    /// Runs the fundamental search every frame and the formant chain when
    /// formant tracking is on.
    pub fn update(&mut self, frame: &[u8], scale: &ScaleTransform) -> FundamentalEstimate {
        let estimate = self.estimate_fundamental(frame, scale);
        if self.config.track_formants {
            self.estimate_formants(frame);
        } else {
            for slot in &mut self.slots[1..] {
                slot.active = false;
            }
        }

        self.log_counter = self.log_counter.wrapping_add(1);
        if self.log_counter >= LOG_INTERVAL_FRAMES {
            dsp_log!(
                "fundamental bin {} amp {} active {}",
                self.slots[0].index,
                self.fundamental_amplitude,
                self.slots[0].active
            );
            self.log_counter = 0;
        }
        estimate
    }

    /// Searches the bins below 5 kHz for the fundamental.
    ///
    /// A candidate is committed to slot 0 only when its raw amplitude exceeds
    /// the configured minimum; the raw amplitude is recorded either way.
    pub fn estimate_fundamental(
        &mut self,
        frame: &[u8],
        scale: &ScaleTransform,
    ) -> FundamentalEstimate {
        let ceiling = scale.index_from_hz(FUNDAMENTAL_SEARCH_CEILING_HZ);
        let max_bin = (floor(ceiling.max(0.0)) as usize).min(frame.len());
        let window = &frame[..max_bin];

        let highest_peak = window.iter().copied().max().unwrap_or(0);
        let threshold = highest_peak as f32 * FUNDAMENTAL_THRESHOLD_RATIO;
        let run = match self.config.fundamental_policy {
            FundamentalPolicy::FirstRun => first_run(window, threshold),
            FundamentalPolicy::StrongestRun => strongest_run(window, threshold),
        };

        let Some((index, amplitude)) = run else {
            self.fundamental_amplitude = 0;
            self.slots[0].active = false;
            return FundamentalEstimate::NONE;
        };

        let refined = refine_fundamental(frame, index).max(1.0);
        self.fundamental_amplitude = amplitude;
        if amplitude > self.config.fundamental_min_amplitude {
            self.slots[0] = FormantEstimate {
                index: refined,
                amplitude: amplitude as f32,
                active: true,
            };
            FundamentalEstimate {
                index: refined,
                amplitude,
            }
        } else {
            self.slots[0].active = false;
            FundamentalEstimate::NONE
        }
    }

    fn estimate_formants(&mut self, frame: &[u8]) {
        let count = self.config.formant_count;
        let smoothed = moving_average(frame, FORMANT_SMOOTHING_WIDE, FORMANT_SMOOTHING_LIMIT);
        let smoothed = moving_average(&smoothed, FORMANT_SMOOTHING_NARROW, FORMANT_SMOOTHING_LIMIT);
        let peaks = detect_peaks(&smoothed, FORMANT_SEGMENT_SIZE, FORMANT_SEGMENT_GROWTH);
        let bank = estimate_formants(&peaks, count);
        for (slot, estimate) in self.slots[1..].iter_mut().zip(bank.newest(count)) {
            *slot = *estimate;
        }
    }
}

/// Loudest bin of the first run above `threshold`, reported when the run ends.
/// Runs that start at bin 0 or reach the end of `window` are not reported.
fn first_run(window: &[u8], threshold: f32) -> Option<(usize, u8)> {
    let mut index = 0;
    let mut amplitude = 0;
    for (i, &value) in window.iter().enumerate() {
        if value as f32 > threshold {
            if value > amplitude {
                index = i;
                amplitude = value;
            }
        } else if index > 0 {
            return Some((index, amplitude));
        }
    }
    None
}

fn strongest_run(window: &[u8], threshold: f32) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    let mut index = 0;
    let mut amplitude = 0;
    for (i, &value) in window.iter().enumerate() {
        if value as f32 > threshold {
            if value > amplitude {
                index = i;
                amplitude = value;
            }
        } else {
            if index > 0 && best.is_none_or(|(_, loudest)| amplitude > loudest) {
                best = Some((index, amplitude));
            }
            index = 0;
            amplitude = 0;
        }
    }
    best
}
