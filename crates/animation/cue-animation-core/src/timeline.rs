//! Timeline composition: ordered steps with relative offsets resolved into absolute
//! start times.
//!
//! Offset grammar (per step):
//! - `X`  (plain) starts X after the end of the timeline built so far
//! - `-X` starts X before the previous step's scheduled end (overlap)
//! - `+X` starts X after the previous step's scheduled end (gap)
//!
//! `-=X` / `+=X` are accepted as aliases. Resolution uses scheduled end times only,
//! never wall-clock time, so composing the same steps always yields the same starts.

use std::str::FromStr;

use serde::Serialize;

use crate::data::{Cycle, OnComplete};
use crate::element::{ElementRef, Property};
use crate::error::AnimationError;
use crate::instance::{AnimationInstance, InstanceKind};
use crate::interp::Ease;
use crate::plan::{Driver, Endpoint, MutationPlan, TargetSel, Tween};
use crate::scheduler::Scheduler;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum Offset {
    /// Plain offset from the end of the timeline so far.
    After(f32),
    /// Start this long before the previous step ends.
    Overlap(f32),
    /// Start this long after the previous step ends.
    Gap(f32),
}

impl Default for Offset {
    fn default() -> Self {
        Offset::After(0.0)
    }
}

impl From<f32> for Offset {
    fn from(value: f32) -> Self {
        if value < 0.0 {
            Offset::Overlap(-value)
        } else {
            Offset::After(value)
        }
    }
}

impl FromStr for Offset {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnimationError::InvalidOffset {
            offset: s.to_string(),
        };
        let t = s.trim();
        let amount = |rest: &str| -> Result<f32, AnimationError> {
            let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
            match rest.parse::<f32>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(invalid()),
            }
        };
        if let Some(rest) = t.strip_prefix('-') {
            Ok(Offset::Overlap(amount(rest)?))
        } else if let Some(rest) = t.strip_prefix('+') {
            Ok(Offset::Gap(amount(rest)?))
        } else {
            Ok(Offset::After(amount(t)?))
        }
    }
}

/// One step of a timeline: (target, property mutation, timing offset).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineStep {
    pub target: TargetSel,
    pub property: Property,
    pub from: Endpoint,
    pub to: Endpoint,
    pub duration: f32,
    pub ease: Ease,
    pub cycle: Cycle,
    pub immediate: bool,
    pub offset: Offset,
}

impl TimelineStep {
    pub fn new(target: TargetSel, property: Property, to: Endpoint, duration: f32) -> Self {
        Self {
            target,
            property,
            from: Endpoint::Current,
            to,
            duration: duration.max(0.0),
            ease: Ease::DEFAULT,
            cycle: Cycle::ONCE,
            immediate: false,
            offset: Offset::default(),
        }
    }

    /// Start from an explicit value, written before the step begins.
    pub fn from(mut self, from: Endpoint) -> Self {
        self.immediate = matches!(from, Endpoint::Absolute(_));
        self.from = from;
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn cycle(mut self, cycle: Cycle) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }
}

pub struct TimelineComposer;

impl TimelineComposer {
    /// Resolve steps into a plan with absolute start times.
    pub fn compose(steps: &[TimelineStep]) -> MutationPlan {
        let mut timeline_end = 0.0f32;
        let mut prev_end = 0.0f32;
        let mut tweens = Vec::with_capacity(steps.len());

        for step in steps {
            let start = match step.offset {
                Offset::After(x) => timeline_end + x,
                Offset::Overlap(x) => prev_end - x,
                Offset::Gap(x) => prev_end + x,
            }
            .max(0.0);

            let tween = Tween {
                target: step.target,
                property: step.property,
                from: step.from,
                to: step.to,
                start,
                duration: step.duration,
                ease: step.ease,
                repeat: step.cycle.repeat,
                yoyo: step.cycle.yoyo,
                immediate: step.immediate,
            };
            prev_end = tween.scheduled_end();
            timeline_end = timeline_end.max(prev_end);
            tweens.push(tween);
        }

        MutationPlan {
            tweens,
            driver: Driver::Clock,
        }
    }

    /// Compose and bind to `target` as a timeline instance (state Created).
    pub fn instantiate(
        steps: &[TimelineStep],
        target: &ElementRef,
        scheduler: &Scheduler,
        on_complete: Option<OnComplete>,
    ) -> AnimationInstance {
        AnimationInstance::new(
            Self::compose(steps),
            InstanceKind::Timeline,
            target.clone(),
            scheduler,
            on_complete,
        )
    }
}
