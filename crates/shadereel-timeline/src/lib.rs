//! ShadeReel Timeline - Look sequences and frame budgets
//!
//! - `LookDescriptor`: one point in color-grade parameter space
//! - `TimelineGenerator`: deterministic ramps or seeded random envelopes
//! - `FrameBudgetPlanner`: exact per-segment frame allocation for a total
//!   output frame count

pub mod generator;
pub mod look;
pub mod schedule;

pub use generator::{GenerationMode, LookRamp, ParamRamp, RandomEnvelope, ScaledDraw, TimelineGenerator};
pub use look::{EffectTimeline, LookDescriptor, MAX_WARMTH};
pub use schedule::{FrameBudgetPlanner, FrameSchedule, FrameSlot, SlideSchedule};
