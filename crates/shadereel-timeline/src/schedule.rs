//! Frame budgeting.
//!
//! Every adjacent look pair gets `floor(T / (M - 1))` blend frames. Whatever
//! is left over is emitted as a hold on the final look, so the output always
//! has exactly `T` frames. When nothing is left over, the last blend frame is
//! replaced by the final look.

use serde::{Deserialize, Serialize};
use shadereel_core::{Result, ShadeReelError};

/// What a single output frame shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSlot {
    /// Blend step `step` of `steps` between look `segment` and `segment + 1`.
    Blend { segment: usize, step: u64, steps: u64 },
    /// The final look, unblended. Covers every pad frame, and the last
    /// frame of the output when there is no pad.
    Hold,
}

/// Per-segment frame allocation for a look timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSchedule {
    total_frames: u64,
    segment_frames: Vec<u64>,
    pad_frames: u64,
}

impl FrameSchedule {
    /// Requested output length `T`.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// One entry per adjacent look pair.
    pub fn segment_frames(&self) -> &[u64] {
        &self.segment_frames
    }

    /// The shared per-segment allocation.
    pub fn frames_per_segment(&self) -> u64 {
        self.segment_frames.first().copied().unwrap_or(0)
    }

    /// Frames held on the final look after the last blend.
    pub fn pad_frames(&self) -> u64 {
        self.pad_frames
    }

    /// Frames produced by following this schedule.
    pub fn emitted_frames(&self) -> u64 {
        self.segment_frames.iter().sum::<u64>() + self.pad_frames
    }

    /// Walk the schedule one output frame at a time.
    pub fn slots(&self) -> FrameSlots<'_> {
        FrameSlots {
            schedule: self,
            segment: 0,
            step: 0,
            held: 0,
            remaining: self.emitted_frames(),
        }
    }
}

/// Iterator over the slots of a [`FrameSchedule`].
#[derive(Debug, Clone)]
pub struct FrameSlots<'a> {
    schedule: &'a FrameSchedule,
    segment: usize,
    step: u64,
    held: u64,
    remaining: u64,
}

impl Iterator for FrameSlots<'_> {
    type Item = FrameSlot;

    fn next(&mut self) -> Option<FrameSlot> {
        let segments = &self.schedule.segment_frames;
        while self.segment < segments.len() {
            let steps = segments[self.segment];
            if self.step < steps {
                // With no pad the last output frame still shows the final look.
                let slot = if self.remaining == 1 {
                    FrameSlot::Hold
                } else {
                    FrameSlot::Blend {
                        segment: self.segment,
                        step: self.step,
                        steps,
                    }
                };
                self.step += 1;
                self.remaining -= 1;
                return Some(slot);
            }
            self.segment += 1;
            self.step = 0;
        }
        if self.held < self.schedule.pad_frames {
            self.held += 1;
            self.remaining -= 1;
            return Some(FrameSlot::Hold);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FrameSlots<'_> {}

/// Frames shown per image in a slideshow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSchedule {
    total_frames: u64,
    per_image: Vec<u64>,
}

impl SlideSchedule {
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frame count for each image, in input order.
    pub fn per_image(&self) -> &[u64] {
        &self.per_image
    }

    pub fn emitted_frames(&self) -> u64 {
        self.per_image.iter().sum()
    }
}

/// Computes frame budgets.
pub struct FrameBudgetPlanner;

impl FrameBudgetPlanner {
    /// Plan `total_frames` output frames across a timeline of `keyframes`
    /// looks.
    ///
    /// With fewer frames than segments every segment gets zero blend frames
    /// and the whole output is a hold on the final look.
    pub fn plan(keyframes: usize, total_frames: u64) -> Result<FrameSchedule> {
        if keyframes < 2 {
            return Err(ShadeReelError::invalid(format!(
                "frame plan needs at least 2 looks, got {keyframes}"
            )));
        }
        if total_frames < 1 {
            return Err(ShadeReelError::invalid("frame plan needs at least 1 frame"));
        }

        let segments = (keyframes - 1) as u64;
        let base = total_frames / segments;
        let pad_frames = total_frames - base * segments;

        Ok(FrameSchedule {
            total_frames,
            segment_frames: vec![base; keyframes - 1],
            pad_frames,
        })
    }

    /// Plan a slideshow of `images` stills over `total_frames`.
    ///
    /// Each image gets `max(1, T / n)` frames until the budget runs out; the
    /// last image absorbs any remainder.
    pub fn plan_slideshow(images: usize, total_frames: u64) -> Result<SlideSchedule> {
        if images == 0 {
            return Err(ShadeReelError::invalid("slideshow needs at least 1 image"));
        }
        if total_frames < 1 {
            return Err(ShadeReelError::invalid("slideshow needs at least 1 frame"));
        }

        let per = (total_frames / images as u64).max(1);
        let mut remaining = total_frames;
        let mut per_image: Vec<u64> = (0..images)
            .map(|_| {
                let take = per.min(remaining);
                remaining -= take;
                take
            })
            .collect();
        if let Some(last) = per_image.last_mut() {
            *last += remaining;
        }

        Ok(SlideSchedule {
            total_frames,
            per_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sixty_seconds_fifty_looks() {
        let plan = FrameBudgetPlanner::plan(50, 1440).unwrap();
        assert_eq!(plan.segment_frames().len(), 49);
        assert_eq!(plan.frames_per_segment(), 29);
        assert_eq!(plan.pad_frames(), 19);
        assert_eq!(plan.emitted_frames(), 1440);
    }

    #[test]
    fn test_divisible_budget_has_no_pad() {
        let plan = FrameBudgetPlanner::plan(5, 400).unwrap();
        assert_eq!(plan.frames_per_segment(), 100);
        assert_eq!(plan.pad_frames(), 0);
    }

    #[test]
    fn test_divisible_budget_ends_on_final_look() {
        let plan = FrameBudgetPlanner::plan(5, 400).unwrap();
        let slots: Vec<_> = plan.slots().collect();
        assert_eq!(slots.len(), 400);
        assert_eq!(
            slots[398],
            FrameSlot::Blend {
                segment: 3,
                step: 98,
                steps: 100
            }
        );
        assert_eq!(slots[399], FrameSlot::Hold);
        assert_eq!(slots.iter().filter(|s| **s == FrameSlot::Hold).count(), 1);
    }

    #[test]
    fn test_fewer_frames_than_segments() {
        let plan = FrameBudgetPlanner::plan(50, 10).unwrap();
        assert!(plan.segment_frames().iter().all(|&n| n == 0));
        assert_eq!(plan.pad_frames(), 10);
        assert!(plan.slots().all(|s| s == FrameSlot::Hold));
    }

    #[test]
    fn test_slots_order() {
        let plan = FrameBudgetPlanner::plan(3, 7).unwrap();
        let slots: Vec<_> = plan.slots().collect();
        assert_eq!(slots.len(), 7);
        assert_eq!(
            slots[0],
            FrameSlot::Blend {
                segment: 0,
                step: 0,
                steps: 3
            }
        );
        assert_eq!(
            slots[3],
            FrameSlot::Blend {
                segment: 1,
                step: 0,
                steps: 3
            }
        );
        assert_eq!(slots[6], FrameSlot::Hold);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(FrameBudgetPlanner::plan(1, 100).is_err());
        assert!(FrameBudgetPlanner::plan(10, 0).is_err());
        assert!(FrameBudgetPlanner::plan_slideshow(0, 10).is_err());
        assert!(FrameBudgetPlanner::plan_slideshow(3, 0).is_err());
    }

    #[test]
    fn test_slideshow_remainder_on_last_image() {
        let plan = FrameBudgetPlanner::plan_slideshow(7, 1440).unwrap();
        assert_eq!(&plan.per_image()[..6], &[205; 6]);
        assert_eq!(plan.per_image()[6], 210);
        assert_eq!(plan.emitted_frames(), 1440);
    }

    #[test]
    fn test_slideshow_more_images_than_frames() {
        let plan = FrameBudgetPlanner::plan_slideshow(5, 3).unwrap();
        assert_eq!(plan.per_image(), &[1, 1, 1, 0, 0]);
    }

    proptest! {
        #[test]
        fn plan_always_emits_total(keyframes in 2usize..400, total in 1u64..20_000) {
            let plan = FrameBudgetPlanner::plan(keyframes, total).unwrap();
            prop_assert_eq!(plan.emitted_frames(), total);
            prop_assert_eq!(plan.slots().len() as u64, total);
            prop_assert_eq!(plan.slots().count() as u64, total);
            prop_assert!(plan.pad_frames() < (keyframes - 1) as u64);
            prop_assert_eq!(plan.slots().last(), Some(FrameSlot::Hold));
        }

        #[test]
        fn slideshow_always_emits_total(images in 1usize..60, total in 1u64..5_000) {
            let plan = FrameBudgetPlanner::plan_slideshow(images, total).unwrap();
            prop_assert_eq!(plan.emitted_frames(), total);
            prop_assert_eq!(plan.per_image().len(), images);
        }
    }
}
