//! Packed RGB frames in CPU memory.
//!
//! Every stage of the renderer works on the same layout: 3 bytes per pixel,
//! rows tightly packed, no padding. That keeps the raw buffer directly
//! writable to an ffmpeg `rgb24` pipe and convertible to `image::RgbImage`
//! without copying.

use crate::error::{Result, ShadeReelError};
use image::RgbImage;

/// Bytes per pixel.
pub const CHANNELS: usize = 3;

/// A fixed-size 8-bit RGB frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterFrame {
    /// Create a black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * CHANNELS],
        }
    }

    /// Create a frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut frame = Self::new(width, height);
        for px in frame.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgb);
        }
        frame
    }

    /// Wrap an existing packed RGB buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ShadeReelError::invalid(format!(
                "raw frame is {} bytes, expected {expected} for {width}x{height} rgb24",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Whether both frames have identical dimensions.
    #[inline]
    pub fn same_size(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    /// Get a mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Fill the rows `[y0, y1)` with a color. Out-of-range rows are ignored.
    pub fn fill_rows(&mut self, y0: u32, y1: u32, rgb: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for px in self.row_mut(y).chunks_exact_mut(CHANNELS) {
                px.copy_from_slice(&rgb);
            }
        }
    }

    /// Copy out a sub-rectangle. The rectangle must lie inside the frame.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if x.saturating_add(width) > self.width || y.saturating_add(height) > self.height {
            return Err(ShadeReelError::invalid(format!(
                "crop {width}x{height}+{x}+{y} exceeds {}x{} frame",
                self.width, self.height
            )));
        }
        let mut out = Self::new(width, height);
        let start = x as usize * CHANNELS;
        let len = width as usize * CHANNELS;
        for row in 0..height {
            out.row_mut(row)
                .copy_from_slice(&self.row(y + row)[start..start + len]);
        }
        Ok(out)
    }

    /// Convert into an `image` buffer without copying.
    pub fn into_image(self) -> Result<RgbImage> {
        let (w, h) = self.dimensions();
        RgbImage::from_raw(w, h, self.data).ok_or_else(|| {
            ShadeReelError::invalid(format!("frame buffer does not match {w}x{h}"))
        })
    }

    /// Create a test pattern frame (8 vertical color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 3]; 8] = [
            [255, 255, 255],
            [255, 255, 0],
            [0, 255, 255],
            [0, 255, 0],
            [255, 0, 255],
            [255, 0, 0],
            [0, 0, 255],
            [0, 0, 0],
        ];
        let mut frame = Self::new(width, height);
        for y in 0..height {
            let row = frame.row_mut(y);
            for x in 0..width {
                let bar = (x as u64 * 8 / width.max(1) as u64) as usize;
                let i = x as usize * CHANNELS;
                row[i..i + CHANNELS].copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }

    /// Create a smooth diagonal gradient, handy for resampling tests.
    pub fn gradient(width: u32, height: u32) -> Self {
        let mut frame = Self::new(width, height);
        let span_x = width.saturating_sub(1).max(1) as u64;
        let span_y = height.saturating_sub(1).max(1) as u64;
        for y in 0..height {
            for x in 0..width {
                let r = (x as u64 * 255 / span_x) as u8;
                let g = (y as u64 * 255 / span_y) as u8;
                let b = ((x + y) % 256) as u8;
                frame.put_pixel(x, y, [r, g, b]);
            }
        }
        frame
    }
}

impl From<RgbImage> for RasterFrame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}
