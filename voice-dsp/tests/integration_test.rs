use voice_dsp::{
    detect_peaks, moving_average, ByteAnalyser, FrequencyTrack, ScaleMode, ScaleTransform,
    TrackConfig, BIN_COUNT,
};
pub mod common;
use common::*;

fn voice_scale() -> ScaleTransform {
    let mut scale = ScaleTransform::new(SAMPLE_RATE_HZ as f64, BIN_COUNT, 15_000.0)
        .unwrap()
        .with_mode(ScaleMode::Logarithmic);
    scale.update_scale(480);
    scale
}

#[test]
fn test_analyser_places_tone_in_expected_bin() {
    let tone = sine_frame_i16(1_000.0, 0.05);
    let mut analyser = ByteAnalyser::new();
    for _ in 0..8 {
        analyser.process(&tone).unwrap();
    }
    let frame = analyser.frame();
    let expected = voice_scale().index_from_hz(1_000.0);
    let peak = argmax(frame);
    assert!(
        (peak as f64 - expected).abs() <= 1.0,
        "peak at bin {}, expected near {}",
        peak,
        expected
    );
    assert!(frame[peak] > 180, "peak byte {}", frame[peak]);
}

#[test]
fn test_tracker_follows_analysed_tone() {
    let tone = sine_frame_i16(440.0, 0.05);
    let mut analyser = ByteAnalyser::new().with_smoothing(0.0);
    let frame = analyser.process(&tone).unwrap();

    let scale = voice_scale();
    let mut track = FrequencyTrack::new(TrackConfig {
        track_fundamental: true,
        ..TrackConfig::default()
    });
    let estimate = track.update(frame, &scale);
    assert!(!estimate.is_none());
    let hz = scale.hz_from_index(estimate.index as f64);
    assert!((hz - 440.0).abs() < 2.0 * SAMPLE_RATE_HZ as f64 / 1024.0, "estimated {} Hz", hz);
}

#[test]
fn test_spike_scenario() {
    let frame = spike_frame(1024, 50, 200);
    let mut scale = ScaleTransform::new(SAMPLE_RATE_HZ as f64, 1024, 15_000.0).unwrap();
    scale.update_scale(800);
    let mut track = FrequencyTrack::new(TrackConfig::default());
    let estimate = track.update(&frame, &scale);
    assert!((estimate.index - 50.0).abs() < 0.5);
    assert_eq!(estimate.amplitude, 200);
}

#[test]
fn test_random_frames_stay_in_range() {
    for _ in 0..20 {
        let frame = random_frame(BIN_COUNT);
        let smoothed = moving_average(&frame, 20, 1000);
        assert_eq!(smoothed.len(), BIN_COUNT);
        assert!(smoothed.iter().all(|&v| (0.0..=255.0).contains(&v)));

        let peaks = detect_peaks(&smoothed, 6, 1.0);
        assert_eq!(peaks.len(), BIN_COUNT.div_ceil(6) + 1);
        assert!(peaks[1..]
            .windows(2)
            .all(|pair| pair[0].index < pair[1].index));

        let mut track = FrequencyTrack::new(TrackConfig::default());
        let estimate = track.update(&frame, &voice_scale());
        assert!(estimate.is_none() || estimate.amplitude > 150);
    }
}
