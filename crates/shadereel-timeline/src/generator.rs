//! Procedural look generation.
//!
//! Look `i` of `M` sits at progress `t = i / (M - 1)`. Deterministic mode
//! evaluates linear ramps at `t`; randomized mode scales bounded draws by `t`,
//! so later looks tend to be more extreme without being guaranteed to be.

use crate::look::{EffectTimeline, LookDescriptor, MAX_WARMTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shadereel_core::{Result, ShadeReelError};

/// `value(t) = start + t * span`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRamp {
    pub start: f64,
    pub span: f64,
}

impl ParamRamp {
    pub const fn new(start: f64, span: f64) -> Self {
        Self { start, span }
    }

    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        self.start + t * self.span
    }

    fn check(&self, name: &str, min: f64, max: f64) -> Result<()> {
        if !self.start.is_finite() || !self.span.is_finite() {
            return Err(ShadeReelError::invalid(format!(
                "{name} ramp bounds must be finite"
            )));
        }
        // Linear, so the endpoints bound every intermediate value.
        for v in [self.at(0.0), self.at(1.0)] {
            if v < min || v > max {
                return Err(ShadeReelError::invalid(format!(
                    "{name} ramp reaches {v}, outside [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }
}

/// Deterministic ramps for every look parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookRamp {
    pub brightness: ParamRamp,
    pub contrast: ParamRamp,
    pub saturation: ParamRamp,
    pub warmth: ParamRamp,
    /// Invert every look whose index is a multiple of this cadence.
    pub invert_every: Option<u32>,
}

impl LookRamp {
    /// Washed-out to blown-out, cold to hot, with periodic inversions.
    pub const fn extreme() -> Self {
        Self {
            brightness: ParamRamp::new(0.2, 2.2),
            contrast: ParamRamp::new(0.3, 2.4),
            saturation: ParamRamp::new(0.0, 3.5),
            warmth: ParamRamp::new(-120.0, 240.0),
            invert_every: Some(12),
        }
    }

    /// A gentle grade that stays close to the source.
    pub const fn subtle() -> Self {
        Self {
            brightness: ParamRamp::new(0.6, 0.8),
            contrast: ParamRamp::new(0.6, 0.8),
            saturation: ParamRamp::new(0.4, 1.4),
            warmth: ParamRamp::new(0.0, 0.0),
            invert_every: None,
        }
    }

    fn validate(&self) -> Result<()> {
        self.brightness.check("brightness", 0.0, f64::MAX)?;
        self.contrast.check("contrast", 0.0, f64::MAX)?;
        self.saturation.check("saturation", 0.0, f64::MAX)?;
        self.warmth
            .check("warmth", -(MAX_WARMTH as f64), MAX_WARMTH as f64)?;
        if self.invert_every == Some(0) {
            return Err(ShadeReelError::invalid("invert cadence must be >= 1"));
        }
        Ok(())
    }

    fn look_at(&self, index: usize, t: f64) -> LookDescriptor {
        LookDescriptor {
            brightness: self.brightness.at(t),
            contrast: self.contrast.at(t),
            saturation: self.saturation.at(t),
            warmth: (self.warmth.at(t).round() as i16).clamp(-MAX_WARMTH, MAX_WARMTH),
            invert: self
                .invert_every
                .is_some_and(|every| index % every as usize == 0),
        }
    }
}

impl Default for LookRamp {
    fn default() -> Self {
        Self::extreme()
    }
}

/// `value(t) = base + U(low, high) * t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledDraw {
    pub base: f64,
    pub low: f64,
    pub high: f64,
}

impl ScaledDraw {
    pub const fn new(base: f64, low: f64, high: f64) -> Self {
        Self { base, low, high }
    }

    fn check(&self, name: &str) -> Result<()> {
        if !self.base.is_finite() || !self.low.is_finite() || !self.high.is_finite() {
            return Err(ShadeReelError::invalid(format!(
                "{name} draw bounds must be finite"
            )));
        }
        if self.low > self.high {
            return Err(ShadeReelError::invalid(format!(
                "{name} draw range [{}, {}] is inverted",
                self.low, self.high
            )));
        }
        if self.base < 0.0 || self.base + self.low.min(0.0) < 0.0 {
            return Err(ShadeReelError::invalid(format!(
                "{name} draw can go negative"
            )));
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, t: f64) -> f64 {
        self.base + rng.gen_range(self.low..=self.high) * t
    }
}

/// Bounded random draws for randomized timelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomEnvelope {
    pub brightness: ScaledDraw,
    pub contrast: ScaledDraw,
    pub saturation: ScaledDraw,
    /// Warmth is drawn uniformly from `-bound..=bound`, independent of `t`.
    pub warmth_bound: i16,
    /// A look is inverted with probability `1 / invert_odds`.
    pub invert_odds: u32,
}

impl RandomEnvelope {
    fn validate(&self) -> Result<()> {
        self.brightness.check("brightness")?;
        self.contrast.check("contrast")?;
        self.saturation.check("saturation")?;
        if !(0..=MAX_WARMTH).contains(&self.warmth_bound) {
            return Err(ShadeReelError::invalid(format!(
                "warmth bound {} outside [0, {MAX_WARMTH}]",
                self.warmth_bound
            )));
        }
        if self.invert_odds == 0 {
            return Err(ShadeReelError::invalid("invert odds must be >= 1"));
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, t: f64) -> LookDescriptor {
        // Draw order is part of the seeded output; keep it stable.
        let brightness = self.brightness.sample(rng, t);
        let contrast = self.contrast.sample(rng, t);
        let saturation = self.saturation.sample(rng, t);
        let warmth = rng.gen_range(-self.warmth_bound..=self.warmth_bound);
        let invert = rng.gen_ratio(1, self.invert_odds);
        LookDescriptor {
            brightness,
            contrast,
            saturation,
            warmth,
            invert,
        }
    }
}

impl Default for RandomEnvelope {
    fn default() -> Self {
        Self {
            brightness: ScaledDraw::new(0.2, 0.2, 2.5),
            contrast: ScaledDraw::new(0.3, 0.3, 2.8),
            saturation: ScaledDraw::new(0.0, 0.0, 3.5),
            warmth_bound: 120,
            invert_odds: 3,
        }
    }
}

/// How a timeline's looks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationMode {
    Deterministic(LookRamp),
    Randomized {
        envelope: RandomEnvelope,
        /// Fixed seed for reproducible output; `None` draws from OS entropy.
        seed: Option<u64>,
    },
}

impl GenerationMode {
    pub fn randomized(seed: Option<u64>) -> Self {
        Self::Randomized {
            envelope: RandomEnvelope::default(),
            seed,
        }
    }

    /// Replace the seed of a randomized mode. Deterministic modes are returned
    /// unchanged.
    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            Self::Randomized { envelope, .. } => Self::Randomized {
                envelope,
                seed: Some(seed),
            },
            other => other,
        }
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, Self::Randomized { .. })
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Deterministic(ramp) => ramp.validate(),
            Self::Randomized { envelope, .. } => envelope.validate(),
        }
    }
}

impl Default for GenerationMode {
    fn default() -> Self {
        Self::Deterministic(LookRamp::extreme())
    }
}

/// Produces [`EffectTimeline`]s.
pub struct TimelineGenerator;

impl TimelineGenerator {
    /// Generate `count` looks. Randomized modes use their seed, or fresh
    /// entropy when none is set.
    pub fn generate(count: usize, mode: &GenerationMode) -> Result<EffectTimeline> {
        let mut rng = match mode {
            GenerationMode::Randomized { seed: Some(seed), .. } => StdRng::seed_from_u64(*seed),
            _ => StdRng::from_entropy(),
        };
        Self::generate_with_rng(count, mode, &mut rng)
    }

    /// Generate `count` looks drawing from `rng`. Deterministic modes never
    /// touch the random source.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        count: usize,
        mode: &GenerationMode,
        rng: &mut R,
    ) -> Result<EffectTimeline> {
        if count < 2 {
            return Err(ShadeReelError::invalid(format!(
                "timeline needs at least 2 looks, got {count}"
            )));
        }
        mode.validate()?;

        let last = (count - 1) as f64;
        let looks = (0..count)
            .map(|i| {
                let t = i as f64 / last;
                match mode {
                    GenerationMode::Deterministic(ramp) => ramp.look_at(i, t),
                    GenerationMode::Randomized { envelope, .. } => envelope.sample(rng, t),
                }
            })
            .collect();

        EffectTimeline::from_looks(looks, *mode)
    }
}
