//! ShadeReel Core - Foundation types for look-timeline rendering
//!
//! This crate provides the fundamental types used throughout ShadeReel:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Packed RGB raster frames
//! - Aspect-preserving crop/fit geometry
//! - The shared error taxonomy

pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use error::{Result, ShadeReelError};
pub use frame::RasterFrame;
pub use geometry::{CropRect, GeometryFitter, ResampleFilter};
pub use time::{FrameRate, RationalTime, TimeRange};

/// Output dimension limits.
pub mod limits {
    /// Largest accepted output edge in pixels.
    pub const MAX_EDGE: u32 = 8192;

    /// Largest accepted frame rate numerator.
    pub const MAX_FPS: u32 = 240;
}
