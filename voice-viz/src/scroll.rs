/// Converts elapsed time into whole-pixel scroll steps.
///
/// Sub-pixel progress carries over between frames. Every unpaused call moves
/// at least one column so the picture keeps flowing at low speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollBuffer {
    pixels_per_second: f32,
    accumulated: f32,
    paused: bool,
}

impl ScrollBuffer {
    pub fn new(pixels_per_second: f32) -> Self {
        Self {
            pixels_per_second,
            accumulated: 0.0,
            paused: false,
        }
    }

    /// Columns to scroll for `dt` seconds of wall time. Zero while paused,
    /// otherwise at least one.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.paused {
            return 0;
        }
        self.accumulated += self.pixels_per_second * dt;
        let advance = libm::roundf(self.accumulated).max(1.0);
        self.accumulated = (self.accumulated - advance).max(0.0);
        advance as u32
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    pub fn speed(&self) -> f32 {
        self.pixels_per_second
    }

    pub fn set_speed(&mut self, pixels_per_second: f32) {
        self.pixels_per_second = pixels_per_second.max(0.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_hundred_pixels_per_second_at_100_fps() {
        let mut scroll = ScrollBuffer::new(100.0);
        for _ in 0..3 {
            assert_eq!(scroll.advance(0.01), 1);
            assert_abs_diff_eq!(scroll.accumulated(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_paused_scroll_keeps_accumulator() {
        let mut scroll = ScrollBuffer::new(140.0);
        assert_eq!(scroll.advance(0.01), 1);
        scroll.toggle_pause();
        assert_eq!(scroll.advance(0.5), 0);
        assert_abs_diff_eq!(scroll.accumulated(), 0.4, epsilon = 1e-5);
        scroll.toggle_pause();
        assert!(!scroll.is_paused());
        assert_eq!(scroll.advance(0.01), 2);
    }

    #[test]
    fn test_slow_speed_still_moves_one_column() {
        let mut scroll = ScrollBuffer::new(10.0);
        assert_eq!(scroll.advance(0.01), 1);
        assert_eq!(scroll.accumulated(), 0.0);
    }

    #[test]
    fn test_overshoot_never_goes_negative() {
        let mut scroll = ScrollBuffer::new(260.0);
        assert_eq!(scroll.advance(0.01), 3);
        assert_eq!(scroll.accumulated(), 0.0);
        scroll.set_speed(-5.0);
        assert_eq!(scroll.speed(), 0.0);
    }
}
