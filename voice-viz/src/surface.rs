use alloc::{vec, vec::Vec};
use core::convert::Infallible;

use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};

/// A draw target that can move a block of its own pixels sideways.
///
/// The spectrogram only paints the newest columns each frame and relies on
/// the surface to shift everything else.
pub trait ScrollSurface: DrawTarget<Color = Rgb888> {
    /// Shifts `region` left by `columns`, discarding the leftmost columns.
    /// The rightmost `columns` columns keep stale content until repainted.
    fn scroll_left(&mut self, region: &Rectangle, columns: u32) -> Result<(), Self::Error>;
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Row-major RGB framebuffer kept in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb888::BLACK; pixel_count(width, height)],
        }
    }

    /// Changes the dimensions, clearing every pixel to black.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Size::new(width, height);
        self.pixels.clear();
        self.pixels.resize(pixel_count(width, height), Rgb888::BLACK);
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index_of(point).map(|i| self.pixels[i])
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// Copies the whole buffer onto another target, e.g. a display.
    pub fn draw_to<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        target.fill_contiguous(&self.bounding_box(), self.pixels.iter().copied())
    }

    fn index_of(&self, point: Point) -> Option<usize> {
        let (x, y) = (point.x, point.y);
        if x < 0 || y < 0 || x >= self.size.width as i32 || y >= self.size.height as i32 {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index_of(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        let width = self.size.width as usize;
        let x0 = area.top_left.x as usize;
        let x1 = x0 + area.size.width as usize;
        for y in area.rows() {
            let row = y as usize * width;
            self.pixels[row + x0..row + x1].fill(color);
        }
        Ok(())
    }
}

impl ScrollSurface for FrameBuffer {
    fn scroll_left(&mut self, region: &Rectangle, columns: u32) -> Result<(), Self::Error> {
        let region = region.intersection(&self.bounding_box());
        if region.is_zero_sized() || columns == 0 || columns >= region.size.width {
            return Ok(());
        }
        let width = self.size.width as usize;
        let x0 = region.top_left.x as usize;
        let x1 = x0 + region.size.width as usize;
        let shift = columns as usize;
        for y in region.rows() {
            let row = y as usize * width;
            self.pixels.copy_within(row + x0 + shift..row + x1, row + x0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_pixels_are_clipped() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.draw_iter([
            Pixel(Point::new(-1, 0), Rgb888::RED),
            Pixel(Point::new(3, 2), Rgb888::GREEN),
            Pixel(Point::new(4, 0), Rgb888::BLUE),
        ])
        .unwrap();
        assert_eq!(fb.pixel(Point::new(3, 2)), Some(Rgb888::GREEN));
        assert_eq!(fb.pixel(Point::new(4, 0)), None);
        assert_eq!(fb.pixels().iter().filter(|&&c| c != Rgb888::BLACK).count(), 1);
    }

    #[test]
    fn test_fill_solid_clips_to_bounds() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.fill_solid(&Rectangle::new(Point::new(2, -1), Size::new(5, 2)), Rgb888::WHITE)
            .unwrap();
        assert_eq!(fb.pixel(Point::new(2, 0)), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(Point::new(3, 0)), Some(Rgb888::WHITE));
        assert_eq!(fb.pixel(Point::new(1, 0)), Some(Rgb888::BLACK));
        assert_eq!(fb.pixel(Point::new(2, 1)), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_scroll_left_moves_region_only() {
        let mut fb = FrameBuffer::new(5, 2);
        for x in 0..5 {
            let shade = (x * 10) as u8;
            fb.fill_solid(
                &Rectangle::new(Point::new(x, 0), Size::new(1, 2)),
                Rgb888::new(shade, shade, shade),
            )
            .unwrap();
        }
        // Column 4 lies outside the region and must not move.
        fb.scroll_left(&Rectangle::new(Point::zero(), Size::new(4, 2)), 1)
            .unwrap();
        let row: Vec<u8> = (0..5)
            .map(|x| fb.pixel(Point::new(x, 1)).unwrap().r())
            .collect();
        assert_eq!(row, [10, 20, 30, 30, 40]);
    }

    #[test]
    fn test_resize_clears() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(Rgb888::RED).unwrap();
        fb.resize(3, 1);
        assert_eq!(fb.size(), Size::new(3, 1));
        assert!(fb.pixels().iter().all(|&c| c == Rgb888::BLACK));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_pixel_count_does_not_wrap_u32() {
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(pixel_count(u32::MAX, 2), 2 * u32::MAX as usize);
    }
}
