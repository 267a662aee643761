use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

/// Marker colors: slot 0 (fundamental) first, then each formant in turn.
pub const FORMANT_COLORS: [Rgb888; 8] = [
    Rgb888::new(0xff, 0xff, 0xff),
    Rgb888::new(0xff, 0x33, 0xff),
    Rgb888::new(0xff, 0xff, 0x11),
    Rgb888::new(0x66, 0xff, 0xff),
    Rgb888::new(0xff, 0x22, 0x22),
    Rgb888::new(0xff, 0xff, 0x22),
    Rgb888::new(0x22, 0xff, 0x22),
    Rgb888::new(0x22, 0x22, 0xff),
];

/// Outline drawn one pixel around every marker.
pub const MARKER_BORDER: Rgb888 = Rgb888::new(0x33, 0x33, 0x33);

/// Maps a byte magnitude to a color.
pub trait ColorRamp {
    fn color_from_intensity(&self, intensity: u8) -> Rgb888;
}

/// `(d, d, d)`. Used whenever no palette is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleRamp;

impl ColorRamp for GrayscaleRamp {
    fn color_from_intensity(&self, intensity: u8) -> Rgb888 {
        Rgb888::new(intensity, intensity, intensity)
    }
}

/// A 256-entry palette of `[r, g, b]` components in `0.0..=1.0`, indexed
/// directly by the intensity byte.
#[derive(Debug, Clone, Copy)]
pub struct LutRamp<'a> {
    table: &'a [[f32; 3]; 256],
}

impl<'a> LutRamp<'a> {
    pub const fn new(table: &'a [[f32; 3]; 256]) -> Self {
        Self { table }
    }
}

fn unit_to_byte(component: f32) -> u8 {
    libm::roundf(component.clamp(0.0, 1.0) * 255.0) as u8
}

impl ColorRamp for LutRamp<'_> {
    fn color_from_intensity(&self, intensity: u8) -> Rgb888 {
        let [r, g, b] = self.table[intensity as usize];
        Rgb888::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }
}

/// Viridis approximated by linear interpolation between five stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViridisRamp;

const VIRIDIS_STOPS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    libm::roundf(a as f32 + (b as f32 - a as f32) * t) as u8
}

impl ColorRamp for ViridisRamp {
    fn color_from_intensity(&self, intensity: u8) -> Rgb888 {
        let scaled = intensity as f32 / 255.0 * (VIRIDIS_STOPS.len() - 1) as f32;
        let lo = (scaled as usize).min(VIRIDIS_STOPS.len() - 2);
        let t = scaled - lo as f32;
        let (r0, g0, b0) = VIRIDIS_STOPS[lo];
        let (r1, g1, b1) = VIRIDIS_STOPS[lo + 1];
        Rgb888::new(lerp_u8(r0, r1, t), lerp_u8(g0, g1, t), lerp_u8(b0, b1, t))
    }
}

/// Color for `intensity`, falling back to grayscale without a ramp.
pub fn ramp_color(ramp: Option<&dyn ColorRamp>, intensity: u8) -> Rgb888 {
    match ramp {
        Some(ramp) => ramp.color_from_intensity(intensity),
        None => GrayscaleRamp.color_from_intensity(intensity),
    }
}

/// Marker color for tracking slot `slot`, cycling through [`FORMANT_COLORS`].
pub fn formant_color(slot: usize) -> Rgb888 {
    FORMANT_COLORS[slot % FORMANT_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_fallback() {
        assert_eq!(ramp_color(None, 0), Rgb888::BLACK);
        assert_eq!(ramp_color(None, 200), Rgb888::new(200, 200, 200));
    }

    #[test]
    fn test_lut_ramp_indexes_by_intensity() {
        let mut table = [[0.0f32; 3]; 256];
        table[255] = [1.0, 0.5, 0.0];
        table[7] = [0.2, 0.4, 0.6];
        let ramp = LutRamp::new(&table);
        assert_eq!(ramp.color_from_intensity(255), Rgb888::new(255, 128, 0));
        assert_eq!(ramp.color_from_intensity(7), Rgb888::new(51, 102, 153));
        assert_eq!(ramp_color(Some(&ramp), 0), Rgb888::BLACK);
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(ViridisRamp.color_from_intensity(0), Rgb888::new(0x44, 0x01, 0x54));
        assert_eq!(ViridisRamp.color_from_intensity(255), Rgb888::new(0xfd, 0xe7, 0x25));
    }

    #[test]
    fn test_formant_colors_wrap() {
        assert_eq!(formant_color(0), Rgb888::WHITE);
        assert_eq!(formant_color(9), FORMANT_COLORS[1]);
    }
}
