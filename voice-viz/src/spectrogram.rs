use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use voice_dsp::DspError;

use crate::color_strategy::formant_color;
use crate::config::{VisualizerConfig, MARKER_HEIGHT_PX, PITCH_MARKER_HEIGHT_PX};
use crate::renderer::{bin_span, plot_marker, Ruler, Visualizer, VisualizerState};
use crate::scroll::ScrollBuffer;
use crate::surface::ScrollSurface;
use crate::viz_log;

const A1_HZ: f64 = 55.0;
const NOTE_GUIDE: Rgb888 = Rgb888::new(0x22, 0x1f, 0x33);
const NOTE_ACCENT: Rgb888 = Rgb888::new(0xaa, 0x99, 0xff);
const NOTE_GUIDE_PX: u32 = 77;
const NOTE_LABEL_OFFSET_PX: i32 = 70;

/// Scrolling time/frequency plot.
///
/// Time runs right to left, low frequencies sit at the bottom. The frequency
/// ruler occupies a strip on the right edge of the target.
pub struct Spectrogram {
    state: VisualizerState,
    scroll: ScrollBuffer,
    scale_strip_px: u32,
    size: Size,
}

impl Spectrogram {
    pub fn new(config: &VisualizerConfig) -> Result<Self, DspError> {
        Ok(Self {
            state: VisualizerState::new(config)?,
            scroll: ScrollBuffer::new(config.pixels_per_second),
            scale_strip_px: config.scale_strip_px,
            size: Size::zero(),
        })
    }

    pub fn scroll(&self) -> &ScrollBuffer {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollBuffer {
        &mut self.scroll
    }

    /// Plot area left of the ruler.
    pub fn viewport(&self) -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(
                self.size.width.saturating_sub(self.scale_strip_px),
                self.size.height,
            ),
        )
    }

    fn ruler(&self) -> Ruler {
        Ruler::Right {
            x: self.viewport().size.width as i32,
            bottom: self.size.height as i32,
        }
    }

    fn y_from_index(&self, index: f64) -> f64 {
        self.size.height as f64 - self.state.scale().position_from_index(index)
    }

    /// Picks up size changes and pending repaints before drawing a frame.
    fn sync_layout<D: ScrollSurface>(&mut self, target: &mut D) -> Result<(), D::Error> {
        let size = target.bounding_box().size;
        let resized = size != self.size;
        if resized {
            viz_log!("spectrogram resized to {}x{}", size.width, size.height);
            self.size = size;
            self.state.scale_mut().update_scale(size.height);
            target.fill_solid(&self.viewport(), self.state.background())?;
        }
        if self.state.take_repaint() || resized {
            self.draw_scale(target)?;
        }
        Ok(())
    }

    /// Paints one frame as a column of `width` pixels starting at `x`.
    fn draw_slice<D: ScrollSurface>(
        &self,
        target: &mut D,
        frame: &[u8],
        x: i32,
        width: u32,
    ) -> Result<(), D::Error> {
        let last = (libm::ceil(self.state.scale().max_index()) as usize).min(frame.len() - 1);
        for (index, &intensity) in frame.iter().enumerate().take(last + 1) {
            let low = self.y_from_index(index as f64);
            let high = self.y_from_index(index as f64 + 1.0);
            if let Some((y, rows)) = bin_span(low, high) {
                target.fill_solid(
                    &Rectangle::new(Point::new(x, y), Size::new(width, rows)),
                    self.state.color(intensity),
                )?;
            }
        }
        Ok(())
    }

    fn draw_pitch_tracker<D: ScrollSurface>(
        &self,
        target: &mut D,
        x: i32,
        width: u32,
    ) -> Result<(), D::Error> {
        let track = self.state.track();
        if track.fundamental_above_minimum() {
            let y = self.y_from_index(track.fundamental().index as f64);
            plot_marker(target, x, y, width, PITCH_MARKER_HEIGHT_PX, formant_color(0))?;
        }
        Ok(())
    }

    fn plot_formants<D: ScrollSurface>(
        &self,
        target: &mut D,
        x: i32,
        width: u32,
    ) -> Result<(), D::Error> {
        let track = self.state.track();
        let config = track.config();
        if config.track_fundamental && track.fundamental_above_minimum() {
            let y = self.y_from_index(track.fundamental().index as f64);
            plot_marker(target, x, y, width, MARKER_HEIGHT_PX, formant_color(0))?;
        }
        if config.track_formants {
            for (slot, formant) in track.formants().iter().enumerate() {
                if formant.active {
                    let y = self.y_from_index(formant.index as f64);
                    let color = formant_color(slot + 1);
                    plot_marker(target, x, y, width, MARKER_HEIGHT_PX, color)?;
                }
            }
        }
        Ok(())
    }
}

impl Visualizer for Spectrogram {
    fn state(&self) -> &VisualizerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisualizerState {
        &mut self.state
    }

    fn is_paused(&self) -> bool {
        self.scroll.is_paused()
    }

    fn pause_toggle(&mut self) {
        self.scroll.toggle_pause();
    }

    fn update<D: ScrollSurface>(
        &mut self,
        target: &mut D,
        frame: &[u8],
        dt: f32,
    ) -> Result<(), D::Error> {
        if self.scroll.is_paused() || !(dt > 0.0) || frame.is_empty() {
            return Ok(());
        }
        self.sync_layout(target)?;
        self.state.update_track(frame);

        let viewport = self.viewport();
        let advance = self.scroll.advance(dt).min(viewport.size.width);
        if advance == 0 {
            return Ok(());
        }
        target.scroll_left(&viewport, advance)?;
        let x = (viewport.size.width - advance) as i32;
        target.fill_solid(
            &Rectangle::new(Point::new(x, 0), Size::new(advance, viewport.size.height)),
            self.state.background(),
        )?;
        if self.state.pitch_track_mode() {
            self.draw_pitch_tracker(target, x, advance)?;
        } else {
            self.draw_slice(target, frame, x, advance)?;
        }
        self.plot_formants(target, x, advance)
    }

    fn draw_scale<D: DrawTarget<Color = Rgb888>>(&self, target: &mut D) -> Result<(), D::Error> {
        let ruler = self.ruler();
        let strip = Rectangle::new(
            Point::new(self.viewport().size.width as i32, 0),
            Size::new(self.scale_strip_px, self.size.height),
        );
        target.fill_solid(&strip, Rgb888::BLACK)?;

        let scale = self.state.scale();
        for octave in -1..12 {
            let hz = A1_HZ * libm::pow(2.0, octave as f64);
            if hz > scale.max_hz() {
                break;
            }
            let y = ruler.pixel_from_hz(scale, hz);
            ruler.line(target, y, NOTE_GUIDE_PX.min(self.scale_strip_px), NOTE_GUIDE)?;
            ruler.line(target, y, 5, NOTE_ACCENT)?;
            if let Some(namer) = self.state.note_namer() {
                let name = namer.note_name(hz, self.state.notation());
                ruler.label(target, &name, y, NOTE_LABEL_OFFSET_PX, NOTE_ACCENT)?;
            }
        }
        ruler.draw_ticks(target, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FrameBuffer;
    use voice_dsp::ScaleMode;

    // 512 bins at 48 kHz over 0..1 kHz linear: 21.33 bins onto 64 rows, 3 rows per bin.
    fn linear_spectrogram() -> Spectrogram {
        let config = VisualizerConfig {
            max_hz: 1_000.0,
            scale_mode: ScaleMode::Linear,
            scale_strip_px: 20,
            ..VisualizerConfig::spectrogram()
        };
        Spectrogram::new(&config).unwrap()
    }

    fn bin_row(spectrogram: &Spectrogram, bin: usize) -> i32 {
        libm::floor(spectrogram.y_from_index(bin as f64 + 0.5)) as i32
    }

    #[test]
    fn test_first_frame_paints_rightmost_column() {
        let mut fb = FrameBuffer::new(84, 64);
        let mut spectrogram = linear_spectrogram();
        let mut frame = [0u8; 512];
        frame[10] = 200;
        spectrogram.update(&mut fb, &frame, 0.01).unwrap();

        let row = bin_row(&spectrogram, 10);
        assert_eq!(fb.pixel(Point::new(63, row)), Some(Rgb888::new(200, 200, 200)));
        assert_eq!(fb.pixel(Point::new(62, row)), Some(Rgb888::BLACK));
        assert_eq!(fb.pixel(Point::new(63, bin_row(&spectrogram, 3))), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_columns_scroll_left() {
        let mut fb = FrameBuffer::new(84, 64);
        let mut spectrogram = linear_spectrogram();
        let mut loud = [0u8; 512];
        loud[10] = 255;
        spectrogram.update(&mut fb, &loud, 0.01).unwrap();
        spectrogram.update(&mut fb, &[0u8; 512], 0.01).unwrap();
        spectrogram.update(&mut fb, &[0u8; 512], 0.01).unwrap();

        let row = bin_row(&spectrogram, 10);
        assert_eq!(fb.pixel(Point::new(61, row)), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(Point::new(63, row)), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_pause_and_zero_dt_are_noops() {
        let mut fb = FrameBuffer::new(84, 64);
        let mut spectrogram = linear_spectrogram();
        let frame = [255u8; 512];
        spectrogram.pause_toggle();
        spectrogram.update(&mut fb, &frame, 0.01).unwrap();
        assert!(fb.pixels().iter().all(|&c| c == Rgb888::BLACK));

        spectrogram.pause_toggle();
        spectrogram.update(&mut fb, &frame, 0.0).unwrap();
        spectrogram.update(&mut fb, &[], 0.01).unwrap();
        assert!(fb.pixels().iter().all(|&c| c == Rgb888::BLACK));
        assert!(!spectrogram.is_paused());
    }

    #[test]
    fn test_fundamental_marker_is_plotted() {
        let mut fb = FrameBuffer::new(84, 64);
        let mut spectrogram = linear_spectrogram();
        spectrogram.state_mut().track_mut().set_track_fundamental(true);
        spectrogram.pitch_track_mode_toggle();
        let mut frame = [0u8; 512];
        frame[8..13].copy_from_slice(&[100, 200, 255, 200, 100]);
        spectrogram.update(&mut fb, &frame, 0.01).unwrap();

        let track = spectrogram.state().track();
        assert!(track.fundamental_above_minimum());
        let y = libm::round(spectrogram.y_from_index(track.fundamental().index as f64)) as i32;
        assert_eq!(fb.pixel(Point::new(63, y)), Some(Rgb888::WHITE));
        // Pitch-tracker mode draws no spectrum, only the 8 px marker.
        assert_eq!(fb.pixel(Point::new(63, y - 6)), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_resize_rescales_axis() {
        let mut spectrogram = linear_spectrogram();
        let mut fb = FrameBuffer::new(84, 64);
        spectrogram.update(&mut fb, &[0u8; 512], 0.01).unwrap();
        assert_eq!(spectrogram.scale().extent(), 64);
        fb.resize(84, 128);
        spectrogram.update(&mut fb, &[0u8; 512], 0.01).unwrap();
        assert_eq!(spectrogram.scale().extent(), 128);
        assert_eq!(spectrogram.viewport().size, Size::new(64, 128));
    }

    // Default log axis on a 200x300 target: the ruler strip starts at x = 100.
    const NOTE_ROWS: [i32; 9] = [292, 256, 220, 184, 147, 111, 75, 39, 3];

    fn draw_log_ruler(namer: bool) -> FrameBuffer {
        let mut fb = FrameBuffer::new(200, 300);
        let mut spectrogram = Spectrogram::new(&VisualizerConfig::spectrogram()).unwrap();
        if !namer {
            spectrogram.state_mut().set_note_namer(None);
        }
        spectrogram.update(&mut fb, &[0u8; 512], 0.01).unwrap();
        fb
    }

    #[test]
    fn test_note_guides_every_octave_of_a1() {
        let fb = draw_log_ruler(true);
        for y in NOTE_ROWS {
            assert_eq!(fb.pixel(Point::new(165, y)), Some(NOTE_GUIDE));
        }
        // A1 and A3 rows are clear of the frequency ticks.
        assert_eq!(fb.pixel(Point::new(102, 292)), Some(NOTE_ACCENT));
        assert_eq!(fb.pixel(Point::new(102, 220)), Some(NOTE_ACCENT));
        assert_eq!(fb.pixel(Point::new(165, 200)), Some(Rgb888::BLACK));
        assert!((170..200).any(|x| (0..300).any(|y| fb.pixel(Point::new(x, y)) == Some(NOTE_ACCENT))));
    }

    #[test]
    fn test_missing_namer_leaves_guides_unlabeled() {
        let fb = draw_log_ruler(false);
        for y in NOTE_ROWS {
            assert_eq!(fb.pixel(Point::new(165, y)), Some(NOTE_GUIDE));
        }
        for x in 160..200 {
            for y in 0..300 {
                let color = fb.pixel(Point::new(x, y));
                assert!(color == Some(Rgb888::BLACK) || color == Some(NOTE_GUIDE));
            }
        }
    }
}
