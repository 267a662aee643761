#![allow(dead_code)]

use rand::Rng;
use voice_dsp::FFT_SIZE;
use wavegen::{sine, Waveform};

pub const SAMPLE_RATE_HZ: f32 = 48_000.0;

/// One analyser frame of a sine at `frequency` Hz, scaled to `amplitude` of
/// full scale.
pub fn sine_frame_i16(frequency: f32, amplitude: f32) -> Vec<i16> {
    let waveform = Waveform::<f32>::with_components(SAMPLE_RATE_HZ, vec![sine!(frequency)]);
    waveform
        .iter()
        .take(FFT_SIZE)
        .map(|s| (s * amplitude * i16::MAX as f32) as i16)
        .collect()
}

/// Byte frame with a single non-zero bin.
pub fn spike_frame(len: usize, bin: usize, value: u8) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    frame[bin] = value;
    frame
}

pub fn random_frame(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..len).map(|_| rng.random_range(0..=255u8)).collect()
}

pub fn argmax(frame: &[u8]) -> usize {
    frame
        .iter()
        .enumerate()
        .max_by_key(|&(_, &v)| v)
        .map(|(i, _)| i)
        .unwrap_or(0)
}
