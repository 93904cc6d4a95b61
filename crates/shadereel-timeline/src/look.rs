//! Look descriptors and the ordered timeline they form.

use crate::generator::GenerationMode;
use serde::{Deserialize, Serialize};
use shadereel_core::{Result, ShadeReelError};

/// Largest warmth shift, in 8-bit channel steps.
pub const MAX_WARMTH: i16 = 255;

/// A single color-grade look.
///
/// Brightness, contrast and saturation are blend factors where `1.0` leaves
/// the image unchanged. Warmth is added to red and subtracted from blue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookDescriptor {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub warmth: i16,
    pub invert: bool,
}

impl LookDescriptor {
    /// The look that leaves every pixel untouched.
    pub const IDENTITY: Self = Self {
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
        warmth: 0,
        invert: false,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Check the value ranges a grade can be built from.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ShadeReelError::invalid(format!(
                    "look {name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.warmth.abs() > MAX_WARMTH {
            return Err(ShadeReelError::invalid(format!(
                "look warmth {} outside [-{MAX_WARMTH}, {MAX_WARMTH}]",
                self.warmth
            )));
        }
        Ok(())
    }
}

impl Default for LookDescriptor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Ordered looks spanning progress 0..=1, plus the mode that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTimeline {
    looks: Vec<LookDescriptor>,
    mode: GenerationMode,
}

impl EffectTimeline {
    /// Build a timeline from explicit looks. At least two are required.
    pub fn from_looks(looks: Vec<LookDescriptor>, mode: GenerationMode) -> Result<Self> {
        if looks.len() < 2 {
            return Err(ShadeReelError::invalid(format!(
                "a timeline needs at least 2 looks, got {}",
                looks.len()
            )));
        }
        for look in &looks {
            look.validate()?;
        }
        Ok(Self { looks, mode })
    }

    /// Number of looks (`M`).
    pub fn len(&self) -> usize {
        self.looks.len()
    }

    /// Always false; a timeline holds at least two looks.
    pub fn is_empty(&self) -> bool {
        self.looks.is_empty()
    }

    pub fn looks(&self) -> &[LookDescriptor] {
        &self.looks
    }

    pub fn get(&self, index: usize) -> Option<&LookDescriptor> {
        self.looks.get(index)
    }

    /// Look at progress 0.
    pub fn first(&self) -> &LookDescriptor {
        &self.looks[0]
    }

    /// Look at progress 1.
    pub fn last(&self) -> &LookDescriptor {
        &self.looks[self.looks.len() - 1]
    }

    pub fn mode(&self) -> &GenerationMode {
        &self.mode
    }

    /// Number of transitions between adjacent looks.
    pub fn segment_count(&self) -> usize {
        self.looks.len() - 1
    }

    /// Adjacent `(from, to)` pairs in timeline order.
    pub fn segments(&self) -> impl Iterator<Item = (&LookDescriptor, &LookDescriptor)> {
        self.looks.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}
