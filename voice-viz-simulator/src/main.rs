use std::{f32::consts::TAU, time::Instant};

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use embedded_graphics_simulator::{
    sdl2::Keycode, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use voice_dsp::{ByteAnalyser, FundamentalPolicy, FFT_SIZE};
use voice_viz::{BarView, FrameBuffer, Spectrogram, ViridisRamp, Visualizer, VisualizerConfig};

// Constants for visualization parameters
pub const WIDTH: u32 = 480;
pub const HEIGHT: u32 = 320;
const SAMPLE_RATE_HZ: f32 = 48_000.0;
const HZ_MAX_STEP: f64 = 1_000.0;
const MIN_AMPLITUDE_STEP: u8 = 10;

// Synthetic voice: a gliding fundamental shaped by three vowel formants.
const HARMONICS: usize = 24;
const FORMANTS_HZ: [f32; 3] = [700.0, 1_220.0, 2_600.0];
const FORMANT_WIDTH_HZ: f32 = 180.0;
const VOICE_LEVEL: f32 = 0.02;

struct VoiceSynth {
    phase: f32,
    time: f32,
    window: Vec<i16>,
}

impl VoiceSynth {
    fn new() -> Self {
        Self {
            phase: 0.0,
            time: 0.0,
            window: vec![0; FFT_SIZE],
        }
    }

    fn fundamental(&self) -> f32 {
        165.0 + 55.0 * (TAU * 0.2 * self.time).sin()
    }

    fn harmonic_gain(hz: f32) -> f32 {
        let envelope: f32 = FORMANTS_HZ
            .iter()
            .map(|&formant| {
                let distance = (hz - formant) / FORMANT_WIDTH_HZ;
                (-distance * distance).exp()
            })
            .sum();
        0.15 + envelope
    }

    /// Synthesizes `dt` seconds of audio and returns the latest analysis window.
    fn advance(&mut self, dt: f32) -> &[i16] {
        let hop = ((dt * SAMPLE_RATE_HZ).round() as usize).clamp(1, FFT_SIZE);
        let mut fresh = Vec::with_capacity(hop);
        for _ in 0..hop {
            let f0 = self.fundamental();
            self.phase = (self.phase + TAU * f0 / SAMPLE_RATE_HZ) % TAU;
            self.time += 1.0 / SAMPLE_RATE_HZ;
            let sample: f32 = (1..=HARMONICS)
                .map(|h| {
                    let h = h as f32;
                    Self::harmonic_gain(h * f0) * (h * self.phase).sin()
                })
                .sum();
            let sample = (sample * VOICE_LEVEL).clamp(-1.0, 1.0);
            fresh.push((sample * i16::MAX as f32) as i16);
        }
        self.window.drain(..hop);
        self.window.extend(fresh);
        &self.window
    }
}

enum ActiveView {
    Spectrogram,
    Bars,
}

struct Views {
    active: ActiveView,
    spectrogram: Spectrogram,
    bars: BarView,
}

impl Views {
    fn new() -> Result<Self, voice_dsp::DspError> {
        let mut spectrogram = Spectrogram::new(&VisualizerConfig::spectrogram())?;
        spectrogram
            .state_mut()
            .set_color_ramp(Some(Box::new(ViridisRamp)));
        let mut bars = BarView::new(&VisualizerConfig::bar_view())?;
        bars.state_mut().set_color_ramp(Some(Box::new(ViridisRamp)));
        Ok(Self {
            active: ActiveView::Spectrogram,
            spectrogram,
            bars,
        })
    }

    fn active(&mut self) -> &mut dyn ControlPanel {
        match self.active {
            ActiveView::Spectrogram => &mut self.spectrogram,
            ActiveView::Bars => &mut self.bars,
        }
    }

    fn update(&mut self, fb: &mut FrameBuffer, frame: &[u8], dt: f32) {
        let result = match self.active {
            ActiveView::Spectrogram => self.spectrogram.update(fb, frame, dt),
            ActiveView::Bars => self.bars.update(fb, frame, dt),
        };
        // FrameBuffer drawing cannot fail.
        let Ok(()) = result;
    }

    fn switch(&mut self, fb: &mut FrameBuffer) {
        self.active = match self.active {
            ActiveView::Spectrogram => ActiveView::Bars,
            ActiveView::Bars => ActiveView::Spectrogram,
        };
        let Ok(()) = fb.clear(Rgb888::BLACK);
        match self.active {
            ActiveView::Spectrogram => self.spectrogram.state_mut().request_repaint(),
            ActiveView::Bars => self.bars.state_mut().request_repaint(),
        }
    }
}

/// The object-safe subset of [`Visualizer`] driven from the keyboard.
trait ControlPanel {
    fn handle_key(&mut self, keycode: Keycode);
}

impl<V: Visualizer> ControlPanel for V {
    fn handle_key(&mut self, keycode: Keycode) {
        let outcome = match keycode {
            Keycode::Space => {
                self.pause_toggle();
                return;
            }
            Keycode::S => {
                self.scale_mode_toggle();
                return;
            }
            Keycode::N => {
                self.notation_toggle();
                return;
            }
            Keycode::P => {
                self.pitch_track_mode_toggle();
                return;
            }
            Keycode::F => {
                self.track_formant_toggle();
                return;
            }
            Keycode::G => {
                let track = self.state_mut().track_mut();
                let policy = match track.config().fundamental_policy {
                    FundamentalPolicy::FirstRun => FundamentalPolicy::StrongestRun,
                    FundamentalPolicy::StrongestRun => FundamentalPolicy::FirstRun,
                };
                track.set_fundamental_policy(policy);
                println!("fundamental policy: {:?}", policy);
                return;
            }
            Keycode::LeftBracket | Keycode::RightBracket => {
                let track = self.state_mut().track_mut();
                let current = track.config().fundamental_min_amplitude;
                let amplitude = if keycode == Keycode::LeftBracket {
                    current.saturating_sub(MIN_AMPLITUDE_STEP)
                } else {
                    current.saturating_add(MIN_AMPLITUDE_STEP)
                };
                track.set_fundamental_min_amplitude(amplitude);
                println!("fundamental threshold: {}", amplitude);
                return;
            }
            Keycode::Up => self.hz_max_increment(HZ_MAX_STEP),
            Keycode::Down => self.hz_max_increment(-HZ_MAX_STEP),
            _ => return,
        };
        if let Err(error) = outcome {
            eprintln!("control rejected: {}", error);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut display: SimulatorDisplay<Rgb888> = SimulatorDisplay::new(Size::new(WIDTH, HEIGHT));
    let mut window = Window::new(
        "Voice Spectrogram Simulator",
        &OutputSettingsBuilder::new().build(),
    );

    let mut fb = FrameBuffer::new(WIDTH, HEIGHT);
    let mut synth = VoiceSynth::new();
    let mut analyser = ByteAnalyser::new();
    let mut views = Views::new()?;

    println!("space: pause  s: log/linear  n: notation  p: pitch mode  f: tracking");
    println!("g: fundamental policy  [/]: fundamental threshold  r: reset analyser");
    println!("up/down: max frequency  v: switch view  q: quit");

    let mut last = Instant::now();
    'running: loop {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        // A zero-length tick carries no new audio.
        if dt > 0.0 {
            let frame = analyser.process(synth.advance(dt))?;
            views.update(&mut fb, frame, dt);
        }

        let Ok(()) = fb.draw_to(&mut display);
        window.update(&display);

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Q | Keycode::Escape => break 'running,
                    Keycode::V => views.switch(&mut fb),
                    Keycode::R => analyser.reset(),
                    other => views.active().handle_key(other),
                },
                _ => {}
            }
        }
    }

    Ok(())
}
