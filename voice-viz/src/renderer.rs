use alloc::{boxed::Box, format, string::String};
use core::fmt::Write;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};
use voice_dsp::{DspError, FrequencyTrack, ScaleTransform};

use crate::color_strategy::{ramp_color, ColorRamp, MARKER_BORDER};
use crate::config::{VisualizerConfig, HZ_MAX_CEILING, HZ_MAX_FLOOR, SCALE_TICK_STEP_PX};
use crate::surface::ScrollSurface;
use crate::viz_log;

const TICK_MAJOR: Rgb888 = Rgb888::new(0x88, 0x88, 0x88);
const TICK_MINOR: Rgb888 = Rgb888::new(0x55, 0x55, 0x55);
const LABEL_MAJOR: Rgb888 = Rgb888::new(0x77, 0x77, 0x77);
const LABEL_FIXED: Rgb888 = Rgb888::new(0x44, 0x44, 0x44);
const FIXED_TICKS_HZ: [f64; 5] = [100.0, 500.0, 1_000.0, 5_000.0, 10_000.0];

/// Naming scheme for the note guides on the frequency scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum Notation {
    #[default]
    Musical,
    Experimental,
}

impl Notation {
    pub fn toggled(self) -> Self {
        match self {
            Notation::Musical => Notation::Experimental,
            Notation::Experimental => Notation::Musical,
        }
    }
}

/// Turns a frequency into a note label.
pub trait NoteNamer {
    fn note_name(&self, hz: f64, notation: Notation) -> String;
}

/// Twelve-tone equal temperament around A4 = 440 Hz.
///
/// Musical notation gives scientific pitch names (`A4`, `C#5`); experimental
/// notation gives the MIDI note number (`n69`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualTemperament;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl EqualTemperament {
    pub fn midi_note(hz: f64) -> i32 {
        libm::round(69.0 + 12.0 * libm::log2(hz / 440.0)) as i32
    }
}

impl NoteNamer for EqualTemperament {
    fn note_name(&self, hz: f64, notation: Notation) -> String {
        if !(hz > 0.0) {
            return String::new();
        }
        let midi = Self::midi_note(hz);
        match notation {
            Notation::Musical => {
                let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
                format!("{}{}", name, midi.div_euclid(12) - 1)
            }
            Notation::Experimental => format!("n{}", midi),
        }
    }
}

/// State shared by every view: the scale, the tracker and the user toggles.
pub struct VisualizerState {
    scale: ScaleTransform,
    track: FrequencyTrack,
    notation: Notation,
    pitch_track_mode: bool,
    ramp: Option<Box<dyn ColorRamp>>,
    note_namer: Option<Box<dyn NoteNamer>>,
    repaint: bool,
}

impl VisualizerState {
    pub fn new(config: &VisualizerConfig) -> Result<Self, DspError> {
        let scale = ScaleTransform::new(config.sample_rate, config.bin_count, config.max_hz)?
            .with_mode(config.scale_mode)
            .with_log_base(config.log_base)?;
        Ok(Self {
            scale,
            track: FrequencyTrack::new(config.track),
            notation: Notation::default(),
            pitch_track_mode: false,
            ramp: None,
            note_namer: Some(Box::new(EqualTemperament)),
            repaint: true,
        })
    }

    pub fn scale(&self) -> &ScaleTransform {
        &self.scale
    }

    pub fn scale_mut(&mut self) -> &mut ScaleTransform {
        &mut self.scale
    }

    pub fn track(&self) -> &FrequencyTrack {
        &self.track
    }

    pub fn track_mut(&mut self) -> &mut FrequencyTrack {
        &mut self.track
    }

    pub fn notation(&self) -> Notation {
        self.notation
    }

    pub fn pitch_track_mode(&self) -> bool {
        self.pitch_track_mode
    }

    pub fn set_color_ramp(&mut self, ramp: Option<Box<dyn ColorRamp>>) {
        self.ramp = ramp;
    }

    pub fn set_note_namer(&mut self, namer: Option<Box<dyn NoteNamer>>) {
        self.note_namer = namer;
        self.repaint = true;
    }

    pub fn note_namer(&self) -> Option<&dyn NoteNamer> {
        self.note_namer.as_deref()
    }

    pub fn color(&self, intensity: u8) -> Rgb888 {
        ramp_color(self.ramp.as_deref(), intensity)
    }

    pub fn background(&self) -> Rgb888 {
        self.color(0)
    }

    /// Runs the tracker over one byte frame against the current scale.
    pub fn update_track(&mut self, frame: &[u8]) {
        self.track.update(frame, &self.scale);
    }

    /// Moves the top of the frequency axis by `amount` Hz, clamped to
    /// `[HZ_MAX_FLOOR, HZ_MAX_CEILING]` and never above Nyquist.
    pub fn hz_max_increment(&mut self, amount: f64) -> Result<(), DspError> {
        let ceiling = HZ_MAX_CEILING.min(self.scale.nyquist());
        let target = (self.scale.max_hz() + amount).clamp(HZ_MAX_FLOOR.min(ceiling), ceiling);
        if target != self.scale.max_hz() {
            self.scale.set_max_hz(target)?;
            viz_log!("max frequency now {} Hz", target as u32);
        }
        Ok(())
    }

    pub fn scale_mode_toggle(&mut self) {
        self.scale.toggle_mode();
    }

    pub fn notation_toggle(&mut self) {
        self.notation = self.notation.toggled();
        self.repaint = true;
    }

    pub fn pitch_track_mode_toggle(&mut self) {
        self.pitch_track_mode = !self.pitch_track_mode;
    }

    pub fn track_formant_toggle(&mut self) {
        self.track.toggle_formant_tracking();
    }

    /// Asks for the static decorations to be redrawn on the next frame.
    pub fn request_repaint(&mut self) {
        self.repaint = true;
    }

    /// Returns and clears the pending request to redraw static decorations.
    pub fn take_repaint(&mut self) -> bool {
        let scale = self.scale.take_repaint();
        core::mem::take(&mut self.repaint) || scale
    }
}

/// A live view over byte magnitude frames.
///
/// Views own a [`VisualizerState`] and expose the user controls through it.
pub trait Visualizer {
    fn state(&self) -> &VisualizerState;

    fn state_mut(&mut self) -> &mut VisualizerState;

    fn is_paused(&self) -> bool;

    fn pause_toggle(&mut self);

    /// Consumes one frame after `dt` seconds of wall time.
    fn update<D: ScrollSurface>(
        &mut self,
        target: &mut D,
        frame: &[u8],
        dt: f32,
    ) -> Result<(), D::Error>;

    /// Repaints the frequency ruler.
    fn draw_scale<D: DrawTarget<Color = Rgb888>>(&self, target: &mut D) -> Result<(), D::Error>;

    fn scale(&self) -> &ScaleTransform {
        self.state().scale()
    }

    fn hz_max_increment(&mut self, amount: f64) -> Result<(), DspError> {
        self.state_mut().hz_max_increment(amount)
    }

    fn scale_mode_toggle(&mut self) {
        self.state_mut().scale_mode_toggle();
    }

    fn notation_toggle(&mut self) {
        self.state_mut().notation_toggle();
    }

    fn pitch_track_mode_toggle(&mut self) {
        self.state_mut().pitch_track_mode_toggle();
    }

    fn track_formant_toggle(&mut self) {
        self.state_mut().track_formant_toggle();
    }
}

/// Pixel rows (or columns) owned by a bin whose edges sit at screen
/// coordinates `a` and `b`, in either order.
///
/// Pixel `p` belongs to the bin whose half-open span contains `p`, so
/// neighbouring bins never overlap. Bins narrower than a pixel can round to a
/// zero or `-1` extent; those are skipped.
pub(crate) fn bin_span(a: f64, b: f64) -> Option<(i32, u32)> {
    let start = libm::ceil(a.min(b)) as i32;
    let end = libm::ceil(a.max(b)) as i32;
    match end - start {
        extent if extent <= 0 => None,
        extent => Some((start, extent as u32)),
    }
}

/// Horizontal marker centred on `y`, with a one-pixel border above and below.
pub(crate) fn plot_marker<D>(
    target: &mut D,
    x: i32,
    y: f64,
    width: u32,
    height: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let top = libm::round(y - height as f64 / 2.0) as i32;
    target.fill_solid(
        &Rectangle::new(Point::new(x, top - 1), Size::new(width, height + 2)),
        MARKER_BORDER,
    )?;
    target.fill_solid(
        &Rectangle::new(Point::new(x, top), Size::new(width, height)),
        color,
    )
}

/// Vertical marker centred on `x`, spanning `height` rows from the top.
pub(crate) fn plot_vertical_marker<D>(
    target: &mut D,
    x: f64,
    width: u32,
    height: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let left = libm::round(x - width as f64 / 2.0) as i32;
    target.fill_solid(
        &Rectangle::new(Point::new(left - 1, 0), Size::new(width + 2, height)),
        MARKER_BORDER,
    )?;
    target.fill_solid(
        &Rectangle::new(Point::new(left, 0), Size::new(width, height)),
        color,
    )
}

/// Where a frequency ruler sits relative to the plot.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Ruler {
    /// Vertical axis in a strip starting at `x`; positions grow upwards from
    /// `bottom`.
    Right { x: i32, bottom: i32 },
    /// Horizontal axis in a strip starting at `y`; positions grow rightwards.
    Below { y: i32 },
}

impl Ruler {
    fn screen(self, position: f64) -> f64 {
        match self {
            Ruler::Right { bottom, .. } => bottom as f64 - position,
            Ruler::Below { .. } => position,
        }
    }

    fn position(self, screen: f64) -> f64 {
        match self {
            Ruler::Right { bottom, .. } => bottom as f64 - screen,
            Ruler::Below { .. } => screen,
        }
    }

    fn point(self, along: i32, across: i32) -> Point {
        match self {
            Ruler::Right { x, .. } => Point::new(x + across, along),
            Ruler::Below { y } => Point::new(along, y + across),
        }
    }

    fn baseline(self) -> Baseline {
        match self {
            Ruler::Right { .. } => Baseline::Alphabetic,
            Ruler::Below { .. } => Baseline::Top,
        }
    }

    pub(crate) fn line<D>(
        self,
        target: &mut D,
        along: i32,
        length: u32,
        color: Rgb888,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let size = match self {
            Ruler::Right { .. } => Size::new(length, 1),
            Ruler::Below { .. } => Size::new(1, length),
        };
        target.fill_solid(&Rectangle::new(self.point(along, 0), size), color)
    }

    pub(crate) fn label<D>(
        self,
        target: &mut D,
        text: &str,
        along: i32,
        across: i32,
        color: Rgb888,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let style = MonoTextStyle::new(&FONT_6X10, color);
        Text::with_baseline(text, self.point(along, across), style, self.baseline()).draw(target)?;
        Ok(())
    }

    fn hz_label<D>(
        self,
        target: &mut D,
        hz: f64,
        along: i32,
        across: i32,
        color: Rgb888,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        self.label(target, &format_hz(hz), along, across, color)
    }

    /// Screen coordinate of `hz` along this ruler, rounded to a pixel.
    pub(crate) fn pixel_from_hz(self, scale: &ScaleTransform, hz: f64) -> i32 {
        libm::round(self.screen(scale.position_from_hz(hz))) as i32
    }

    /// Draws the frequency ticks and labels for the current scale mode.
    ///
    /// Logarithmic axes get a tick every [`SCALE_TICK_STEP_PX`] pixels plus
    /// fixed ticks at round frequencies. Linear axes get minor ticks every
    /// 100 Hz and labeled ticks every 500 Hz.
    pub(crate) fn draw_ticks<D>(
        self,
        target: &mut D,
        scale: &ScaleTransform,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let max_hz = scale.max_hz();
        match scale.mode() {
            voice_dsp::ScaleMode::Logarithmic => {
                let mut along = SCALE_TICK_STEP_PX;
                while along < scale.extent() {
                    let hz = scale.hz_from_position(self.position(along as f64));
                    self.line(target, along as i32, 20, TICK_MAJOR)?;
                    self.hz_label(target, hz, along as i32 - 5, 0, LABEL_MAJOR)?;
                    along += SCALE_TICK_STEP_PX;
                }
                for hz in FIXED_TICKS_HZ.into_iter().filter(|&hz| hz <= max_hz) {
                    let along = self.pixel_from_hz(scale, hz);
                    self.line(target, along, 30, TICK_MINOR)?;
                    self.hz_label(target, hz, along + 5, 30, LABEL_FIXED)?;
                }
            }
            voice_dsp::ScaleMode::Linear => {
                let mut hz = voice_dsp::scale::MIN_HZ;
                while hz < max_hz {
                    self.line(target, self.pixel_from_hz(scale, hz), 5, TICK_MINOR)?;
                    hz += 100.0;
                }
                let mut hz = voice_dsp::scale::MIN_HZ;
                while hz < max_hz {
                    let along = self.pixel_from_hz(scale, hz);
                    self.line(target, along, 10, LABEL_MAJOR)?;
                    self.hz_label(target, hz, along - 5, 20, LABEL_MAJOR)?;
                    hz += 500.0;
                }
            }
        }
        Ok(())
    }
}

/// Whole-hertz label text. Any `i64`, sign included, fits in 20 bytes.
fn format_hz(hz: f64) -> heapless::String<20> {
    let mut text = heapless::String::new();
    let written = write!(text, "{}", libm::floor(hz) as i64);
    debug_assert!(written.is_ok());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FrameBuffer;

    fn state() -> VisualizerState {
        VisualizerState::new(&VisualizerConfig::spectrogram()).unwrap()
    }

    #[test]
    fn test_bin_span_partitions_pixels() {
        assert_eq!(bin_span(10.0, 11.0), Some((10, 1)));
        assert_eq!(bin_span(11.0, 10.0), Some((10, 1)));
        assert_eq!(bin_span(148.5, 150.0), Some((149, 1)));
        // Entirely inside one pixel.
        assert_eq!(bin_span(10.2, 10.7), None);
        assert_eq!(bin_span(3.0, 3.0), None);
        assert_eq!(bin_span(2.5, 6.5), Some((3, 4)));
    }

    #[test]
    fn test_hz_max_increment_is_clamped() {
        let mut state = state();
        state.hz_max_increment(5_000.0).unwrap();
        assert_eq!(state.scale().max_hz(), 15_000.0);
        state.hz_max_increment(-20_000.0).unwrap();
        assert_eq!(state.scale().max_hz(), 1_000.0);
        state.hz_max_increment(500.0).unwrap();
        assert_eq!(state.scale().max_hz(), 1_500.0);
    }

    #[test]
    fn test_hz_max_never_exceeds_nyquist() {
        let config = VisualizerConfig {
            sample_rate: 16_000.0,
            max_hz: 4_000.0,
            ..VisualizerConfig::spectrogram()
        };
        let mut state = VisualizerState::new(&config).unwrap();
        state.hz_max_increment(10_000.0).unwrap();
        assert_eq!(state.scale().max_hz(), 8_000.0);
    }

    #[test]
    fn test_toggles() {
        let mut state = state();
        state.take_repaint();
        state.notation_toggle();
        assert_eq!(state.notation(), Notation::Experimental);
        assert!(state.take_repaint());
        assert!(!state.take_repaint());
        state.scale_mode_toggle();
        assert_eq!(state.scale().mode(), voice_dsp::ScaleMode::Linear);
        assert!(state.take_repaint());
        state.pitch_track_mode_toggle();
        assert!(state.pitch_track_mode());
        state.track_formant_toggle();
        assert_eq!(state.track().mode(), voice_dsp::TrackMode::Both);
    }

    #[test]
    fn test_note_names() {
        let namer = EqualTemperament;
        assert_eq!(namer.note_name(440.0, Notation::Musical), "A4");
        assert_eq!(namer.note_name(27.5, Notation::Musical), "A0");
        assert_eq!(namer.note_name(277.18, Notation::Musical), "C#4");
        assert_eq!(namer.note_name(440.0, Notation::Experimental), "n69");
        assert_eq!(namer.note_name(0.0, Notation::Musical), "");
    }

    #[test]
    fn test_marker_has_border() {
        let mut fb = FrameBuffer::new(4, 12);
        plot_marker(&mut fb, 1, 6.0, 2, 2, Rgb888::WHITE).unwrap();
        assert_eq!(fb.pixel(Point::new(1, 4)), Some(MARKER_BORDER));
        assert_eq!(fb.pixel(Point::new(1, 5)), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(Point::new(2, 6)), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(Point::new(1, 7)), Some(MARKER_BORDER));
        assert_eq!(fb.pixel(Point::new(0, 5)), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_linear_ruler_ticks_every_hundred_hz() {
        let mut scale = ScaleTransform::new(48_000.0, 512, 1_000.0)
            .unwrap()
            .with_mode(voice_dsp::ScaleMode::Linear);
        scale.update_scale(200);
        let mut fb = FrameBuffer::new(200, 40);
        let ruler = Ruler::Below { y: 0 };
        ruler.draw_ticks(&mut fb, &scale).unwrap();
        // 100 Hz sits at 20 px, 500 Hz at 100 px.
        assert_eq!(fb.pixel(Point::new(20, 4)), Some(TICK_MINOR));
        assert_eq!(fb.pixel(Point::new(20, 6)), Some(Rgb888::BLACK));
        assert_eq!(fb.pixel(Point::new(100, 9)), Some(LABEL_MAJOR));
        // The labeled family starts at the bottom of the axis.
        assert_eq!(fb.pixel(Point::new(0, 9)), Some(LABEL_MAJOR));
    }

    #[test]
    fn test_log_ruler_adds_fixed_ticks() {
        let mut scale = ScaleTransform::new(48_000.0, 512, 15_000.0)
            .unwrap()
            .with_mode(voice_dsp::ScaleMode::Logarithmic);
        scale.update_scale(400);
        let mut fb = FrameBuffer::new(400, 40);
        Ruler::Below { y: 0 }.draw_ticks(&mut fb, &scale).unwrap();
        // 100 Hz, 500 Hz and 1 kHz land on 53, 164 and 212 px.
        for x in [53, 164, 212] {
            assert_eq!(fb.pixel(Point::new(x, 25)), Some(TICK_MINOR));
        }
        // Stepped ticks are shorter and sit every 50 px.
        assert_eq!(fb.pixel(Point::new(50, 15)), Some(TICK_MAJOR));
        assert_eq!(fb.pixel(Point::new(100, 15)), Some(TICK_MAJOR));
        assert_eq!(fb.pixel(Point::new(60, 25)), Some(Rgb888::BLACK));
        assert_eq!(fb.pixel(Point::new(50, 25)), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_hz_labels_fit_any_value() {
        assert_eq!(format_hz(440.7).as_str(), "440");
        assert_eq!(format_hz(-0.5).as_str(), "-1");
        assert_eq!(format_hz(-1e300).as_str(), "-9223372036854775808");
    }
}
