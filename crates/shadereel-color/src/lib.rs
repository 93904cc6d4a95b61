//! ShadeReel Color: look grading on 8-bit RGB frames.

pub mod grade;
pub mod lut;

pub use grade::{luma, mean_luma, ColorGrade, GradeOp, GradePipeline};
pub use lut::ChannelLut;
