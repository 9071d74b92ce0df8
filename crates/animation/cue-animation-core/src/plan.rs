//! Mutation plans: the concrete tweens an instance executes.
//!
//! A plan is pure data with absolute start times already resolved. Endpoints that
//! depend on the element (`Current`, `Relative`) are captured when each tween first
//! becomes active, so replays and restarts reuse the same captured values.

use serde::Serialize;

use crate::data::ScrollCfg;
use crate::element::Property;
use crate::interp::Ease;
use crate::value::Value;

/// Which element a tween writes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TargetSel {
    /// The element the instance is bound to.
    Root,
    /// The n-th child of the bound element.
    Child(usize),
}

/// One end of a tween.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum Endpoint {
    /// Whatever the element holds when the tween starts.
    Current,
    /// Current value plus a delta (scalars only).
    Relative(f32),
    Absolute(Value),
}

impl Endpoint {
    pub fn resolve(&self, current: Value) -> Value {
        match self {
            Endpoint::Current => current,
            Endpoint::Relative(delta) => current.offset(*delta),
            Endpoint::Absolute(v) => *v,
        }
    }
}

/// A single property interpolation with resolved absolute start.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tween {
    pub target: TargetSel,
    pub property: Property,
    pub from: Endpoint,
    pub to: Endpoint,
    /// Absolute start on the instance's local time axis.
    pub start: f32,
    /// Length of one cycle.
    pub duration: f32,
    pub ease: Ease,
    /// Extra cycles after the first; negative repeats forever.
    pub repeat: i32,
    pub yoyo: bool,
    /// Write an absolute `from` before the tween starts (entrance tweens hide the
    /// element during their delay).
    pub immediate: bool,
}

impl Tween {
    /// Total active span, infinite for endless repeats.
    pub fn span(&self) -> f32 {
        if self.repeat < 0 {
            f32::INFINITY
        } else {
            self.duration * (self.repeat as f32 + 1.0)
        }
    }

    /// End time used for scheduling following steps. Endless tweens count one cycle.
    pub fn scheduled_end(&self) -> f32 {
        let cycles = if self.repeat < 0 {
            1.0
        } else {
            self.repeat as f32 + 1.0
        };
        self.start + self.duration * cycles
    }
}

/// How an instance's playhead moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Driver {
    /// Advanced by the scheduler every tick.
    Clock,
    /// Positioned explicitly via `seek` (scroll scrubbing); ticks do not move it.
    Scroll,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutationPlan {
    pub tweens: Vec<Tween>,
    pub driver: Driver,
}

impl MutationPlan {
    pub fn empty() -> Self {
        Self {
            tweens: Vec::new(),
            driver: Driver::Clock,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// End of the last tween; infinite when any tween repeats forever.
    pub fn total_duration(&self) -> f32 {
        self.tweens
            .iter()
            .map(|t| t.start + t.span())
            .fold(0.0, f32::max)
    }
}

/// How an instance gets started once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TriggerPlan {
    /// Start immediately on attach.
    Autoplay,
    /// hoverEnter plays forward, hoverLeave reverses.
    Hover,
    /// Each click restarts.
    Click,
    /// Play when the trigger element crosses the scroll start.
    ScrollReveal(ScrollCfg),
    /// Playhead follows scroll progress.
    ScrollScrub(ScrollCfg),
}
