//! Drawing side of the live voice spectrogram: a scrolling spectrogram and a
//! 1-D bar view over any `embedded-graphics` target, plus the scroll pacing
//! and color ramps they share.
#![no_std]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "logging")]
use defmt_rtt as _;

/// Debug trace routed to `defmt` with the `logging` feature and to stdout with
/// the `std` feature.
#[macro_export]
#[doc(hidden)]
macro_rules! viz_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        defmt::debug!($($arg)*);
        #[cfg(feature = "std")]
        std::println!($($arg)*);
    }};
}

pub mod bar_view;
pub mod color_strategy;
pub mod config;
pub mod renderer;
pub mod scroll;
pub mod spectrogram;
pub mod surface;

pub use bar_view::BarView;
pub use color_strategy::{
    ColorRamp, GrayscaleRamp, LutRamp, ViridisRamp, FORMANT_COLORS, MARKER_BORDER,
};
pub use config::VisualizerConfig;
pub use renderer::{EqualTemperament, Notation, NoteNamer, Visualizer, VisualizerState};
pub use scroll::ScrollBuffer;
pub use spectrogram::Spectrogram;
pub use surface::{FrameBuffer, ScrollSurface};
