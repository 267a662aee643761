use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use voice_dsp::DspError;

use crate::color_strategy::formant_color;
use crate::config::{VisualizerConfig, BAR_HEIGHT_RATIO, MARKER_HEIGHT_PX};
use crate::renderer::{bin_span, plot_vertical_marker, Ruler, Visualizer, VisualizerState};
use crate::surface::ScrollSurface;
use crate::viz_log;

/// One bar per bin, redrawn from scratch every frame.
///
/// Frequency runs left to right with the ruler in a strip along the bottom.
/// Tracked frequencies are shown as vertical markers across the plot.
pub struct BarView {
    state: VisualizerState,
    paused: bool,
    scale_strip_px: u32,
    size: Size,
}

impl BarView {
    pub fn new(config: &VisualizerConfig) -> Result<Self, DspError> {
        Ok(Self {
            state: VisualizerState::new(config)?,
            paused: false,
            scale_strip_px: config.scale_strip_px,
            size: Size::zero(),
        })
    }

    /// Plot area above the ruler.
    pub fn viewport(&self) -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(
                self.size.width,
                self.size.height.saturating_sub(self.scale_strip_px),
            ),
        )
    }

    fn ruler(&self) -> Ruler {
        Ruler::Below {
            y: self.viewport().size.height as i32,
        }
    }

    /// Height of the bar for byte magnitude `intensity`.
    pub fn bar_height(&self, intensity: u8) -> u32 {
        let plot = self.viewport().size.height as f64;
        libm::floor(plot * BAR_HEIGHT_RATIO / 255.0 * intensity as f64) as u32
    }

    /// Draws one frame without touching the pause state. Usable on any
    /// target, scrolling or not.
    pub fn render<D>(&mut self, target: &mut D, frame: &[u8]) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        if frame.is_empty() {
            return Ok(());
        }
        let size = target.bounding_box().size;
        let resized = size != self.size;
        if resized {
            viz_log!("bar view resized to {}x{}", size.width, size.height);
            self.size = size;
            self.state.scale_mut().update_scale(size.width);
        }
        if self.state.take_repaint() || resized {
            self.draw_scale(target)?;
        }
        self.state.update_track(frame);

        let viewport = self.viewport();
        target.fill_solid(&viewport, self.state.background())?;
        let bottom = viewport.size.height as i32;
        let scale = self.state.scale();
        let last = (libm::ceil(scale.max_index()) as usize).min(frame.len() - 1);
        for (index, &intensity) in frame.iter().enumerate().take(last + 1) {
            let height = self.bar_height(intensity);
            if height == 0 {
                continue;
            }
            let left = scale.position_from_index(index as f64);
            let right = scale.position_from_index(index as f64 + 1.0);
            if let Some((x, columns)) = bin_span(left, right) {
                target.fill_solid(
                    &Rectangle::new(
                        Point::new(x, bottom - height as i32),
                        Size::new(columns, height),
                    ),
                    self.state.color(intensity),
                )?;
            }
        }
        self.plot_formants(target)
    }

    fn plot_formants<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let track = self.state.track();
        let scale = self.state.scale();
        let config = track.config();
        let height = self.viewport().size.height;
        let fundamental_shown = (config.track_fundamental || self.state.pitch_track_mode())
            && track.fundamental_above_minimum();
        if fundamental_shown {
            let x = scale.position_from_index(track.fundamental().index as f64);
            plot_vertical_marker(target, x, MARKER_HEIGHT_PX, height, formant_color(0))?;
        }
        if config.track_formants {
            for (slot, formant) in track.formants().iter().enumerate() {
                if formant.active {
                    let x = scale.position_from_index(formant.index as f64);
                    let color = formant_color(slot + 1);
                    plot_vertical_marker(target, x, MARKER_HEIGHT_PX, height, color)?;
                }
            }
        }
        Ok(())
    }
}

impl Visualizer for BarView {
    fn state(&self) -> &VisualizerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisualizerState {
        &mut self.state
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause_toggle(&mut self) {
        self.paused = !self.paused;
    }

    fn update<D: ScrollSurface>(
        &mut self,
        target: &mut D,
        frame: &[u8],
        dt: f32,
    ) -> Result<(), D::Error> {
        if self.paused || !(dt > 0.0) || frame.is_empty() {
            return Ok(());
        }
        self.render(target, frame)
    }

    fn draw_scale<D: DrawTarget<Color = Rgb888>>(&self, target: &mut D) -> Result<(), D::Error> {
        let strip = Rectangle::new(
            Point::new(0, self.viewport().size.height as i32),
            Size::new(self.size.width, self.scale_strip_px),
        );
        target.fill_solid(&strip, Rgb888::BLACK)?;
        self.ruler().draw_ticks(target, self.state.scale())
    }
}
