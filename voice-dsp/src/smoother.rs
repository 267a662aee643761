use alloc::{collections::VecDeque, vec, vec::Vec};

use libm::pow;

/// Anchor emitted in front of every peak list so the first real segment can
/// still qualify as a local maximum.
pub const PEAK_SENTINEL: Peak = Peak {
    index: 1.0,
    amplitude: 10.0,
};

/// Exponent applied to amplitudes when centring a formant between its
/// neighbours. Large enough that the centroid lands almost on the loudest one.
const FORMANT_WEIGHT_EXPONENT: f64 = 40.0;

/// Half-width of the window used by [`refine_fundamental`].
const FUNDAMENTAL_REFINE_SPAN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct Peak {
    pub index: f32,
    pub amplitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct FormantEstimate {
    /// Fractional bin position.
    pub index: f32,
    /// Amplitude in the 0..=255 byte range of the source frame.
    pub amplitude: f32,
    pub active: bool,
}

/// Fixed-capacity FIFO of formant estimates ordered by insertion.
///
/// The bank holds `formant_count + 1` entries and starts out filled with
/// inactive placeholders, so slot 0 reads as "nothing found" until enough
/// estimates have been pushed to rotate it out.
#[derive(Debug, Clone)]
pub struct FormantBank {
    slots: VecDeque<FormantEstimate>,
}

impl FormantBank {
    pub fn new(formant_count: usize) -> Self {
        let capacity = formant_count + 1;
        let mut slots = VecDeque::with_capacity(capacity);
        slots.extend(core::iter::repeat(FormantEstimate::default()).take(capacity));
        Self { slots }
    }

    /// Appends `estimate`, evicting the oldest entry.
    pub fn push(&mut self, estimate: FormantEstimate) {
        self.slots.pop_front();
        self.slots.push_back(estimate);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&FormantEstimate> {
        self.slots.get(slot)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &FormantEstimate> {
        self.slots.iter()
    }

    /// The newest `count` entries, oldest first.
    pub fn newest(&self, count: usize) -> impl Iterator<Item = &FormantEstimate> {
        self.slots.iter().skip(self.slots.len().saturating_sub(count))
    }
}

/// Sliding-window mean over `samples[i - half_window ..= i + half_window]`.
///
/// Only the first `min(len, limit)` samples take part. The window is clipped
/// to that range and the divisor shrinks with it, so edges are neither
/// wrapped nor zero-padded.
pub fn moving_average<T>(samples: &[T], half_window: usize, limit: usize) -> Vec<f32>
where
    T: Copy + Into<f32>,
{
    let len = samples.len().min(limit);
    let mut output = Vec::with_capacity(len);
    for i in 0..len {
        let lo = i.saturating_sub(half_window);
        let hi = i.saturating_add(half_window).min(len - 1);
        let window = &samples[lo..=hi];
        let sum: f32 = window.iter().map(|&s| s.into()).sum();
        output.push(sum / window.len() as f32);
    }
    output
}

/// Picks the loudest sample of each segment, with segments growing
/// geometrically.
///
/// Segment `n` (counting from 1) spans `base_segment_size * growth_factor^(n-1)`
/// samples, never less than one. Resolution is therefore finest at the low
/// bins where formants cluster. The output always starts with
/// [`PEAK_SENTINEL`]; the final partial segment is included.
pub fn detect_peaks(samples: &[f32], base_segment_size: usize, growth_factor: f64) -> Vec<Peak> {
    let mut peaks = vec![PEAK_SENTINEL];
    if samples.is_empty() || base_segment_size == 0 {
        return peaks;
    }

    let base = base_segment_size as f64;
    let mut segment = 1;
    let mut segment_end = base;
    let mut best = Peak::default();

    for (k, &value) in samples.iter().enumerate() {
        if k as f64 >= segment_end {
            peaks.push(best);
            segment_end += (base * pow(growth_factor, segment as f64)).max(1.0);
            segment += 1;
            best = Peak {
                index: k as f32,
                amplitude: 0.0,
            };
        }
        if value >= best.amplitude {
            best = Peak {
                index: k as f32,
                amplitude: value,
            };
        }
    }
    peaks.push(best);
    peaks
}

/// Extracts formant candidates from a peak list.
///
/// Every interior strict local maximum louder than the best one accepted so
/// far is centred between its two neighbours (weights `amplitude^40`) and
/// pushed into a [`FormantBank`] of `formant_count + 1` slots.
pub fn estimate_formants(peaks: &[Peak], formant_count: usize) -> FormantBank {
    let mut bank = FormantBank::new(formant_count);
    let mut best = 0.0f32;

    for i in 1..peaks.len().saturating_sub(1) {
        let here = peaks[i];
        if here.amplitude <= best {
            continue;
        }
        if !(peaks[i - 1].amplitude < here.amplitude && here.amplitude > peaks[i + 1].amplitude) {
            continue;
        }

        // Normalising by the centre amplitude keeps the 40th power in range.
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for peak in &peaks[i - 1..=i + 1] {
            let weight = pow(
                peak.amplitude as f64 / here.amplitude as f64,
                FORMANT_WEIGHT_EXPONENT,
            );
            weighted += peak.index as f64 * weight;
            total += weight;
        }

        bank.push(FormantEstimate {
            index: (weighted / total) as f32,
            amplitude: here.amplitude,
            active: true,
        });
        best = here.amplitude;
    }
    bank
}

/// Sub-bin estimate of a peak: amplitude-weighted centroid of the bins within
/// two of `approx_index`.
pub fn refine_fundamental<T>(samples: &[T], approx_index: usize) -> f32
where
    T: Copy + Into<f32>,
{
    if approx_index >= samples.len() {
        return approx_index as f32;
    }
    let lo = approx_index.saturating_sub(FUNDAMENTAL_REFINE_SPAN);
    let hi = (approx_index + FUNDAMENTAL_REFINE_SPAN).min(samples.len() - 1);

    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for (i, &sample) in samples[lo..=hi].iter().enumerate() {
        let amplitude: f32 = sample.into();
        weighted += amplitude * (lo + i) as f32;
        total += amplitude;
    }
    if total == 0.0 {
        approx_index as f32
    } else {
        weighted / total
    }
}
