//! 8-bit per-channel lookup tables.
//!
//! Every grade stage except saturation maps each channel value independently,
//! so it collapses to a 256-entry table per channel.

use rayon::prelude::*;
use shadereel_core::RasterFrame;

/// Round and clamp to the 8-bit range.
#[inline]
pub fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// One 256-entry table per RGB channel.
#[derive(Clone)]
pub struct ChannelLut {
    tables: [[u8; 256]; 3],
}

impl ChannelLut {
    /// The table that maps every value to itself.
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self {
            tables: [table; 3],
        }
    }

    /// Apply the same mapping to all three channels.
    pub fn uniform(f: impl Fn(u8) -> u8) -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = f(i as u8);
        }
        Self {
            tables: [table; 3],
        }
    }

    /// Separate mappings for R, G and B.
    pub fn per_channel(r: impl Fn(u8) -> u8, g: impl Fn(u8) -> u8, b: impl Fn(u8) -> u8) -> Self {
        let mut lut = Self::identity();
        for i in 0..256 {
            lut.tables[0][i] = r(i as u8);
            lut.tables[1][i] = g(i as u8);
            lut.tables[2][i] = b(i as u8);
        }
        lut
    }

    #[inline]
    pub fn lookup(&self, rgb: [u8; 3]) -> [u8; 3] {
        [
            self.tables[0][rgb[0] as usize],
            self.tables[1][rgb[1] as usize],
            self.tables[2][rgb[2] as usize],
        ]
    }

    /// Map every pixel of `frame` in place, one row per task.
    pub fn apply(&self, frame: &mut RasterFrame) {
        let stride = frame.stride().max(1);
        frame
            .as_raw_mut()
            .par_chunks_mut(stride)
            .for_each(|row| {
                for px in row.chunks_exact_mut(3) {
                    px[0] = self.tables[0][px[0] as usize];
                    px[1] = self.tables[1][px[1] as usize];
                    px[2] = self.tables[2][px[2] as usize];
                }
            });
    }
}
