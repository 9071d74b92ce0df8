//! Animation instances: one running plan bound to one element.
//!
//! State machine:
//!
//! ```text
//! Created ──play──▶ Running ──end──▶ Completed (terminal, fires on_complete once)
//!                    │  ▲
//!               pause│  │play / reverse
//!                    ▼  │
//!                   Paused
//! any non-terminal ──kill──▶ Killed (terminal)
//! restart: Created | Running | Paused | Completed | Killed ──▶ Running at progress 0
//! ```
//!
//! A reversed instance that runs back to progress 0 parks as `Paused` without firing
//! its callback. Plans flagged `hold_at_end` (hover reactions) park at the end the
//! same way instead of completing, so they can be reversed again.
//!
//! The mutable core lives behind `Rc<RefCell<_>>` shared with the scheduler. Every
//! public operation releases its borrow before touching the scheduler, which keeps
//! kill/restart safe to call from inside completion callbacks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::data::OnComplete;
use crate::element::{current_value, ElementRef, Property};
use crate::error::AnimationError;
use crate::events::CoreEvent;
use crate::ids::{ElementId, InstId};
use crate::plan::{Driver, Endpoint, MutationPlan, TargetSel, Tween};
use crate::scheduler::Scheduler;
use crate::value::Value;

const END_EPSILON: f32 = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    Created,
    Running,
    Paused,
    Completed,
    Killed,
}

impl InstanceState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Killed => "killed",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Killed)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceKind {
    Single,
    Timeline,
}

/// Values captured for one tween the first time it becomes active.
#[derive(Clone, Debug, Default)]
struct TrackState {
    from: Option<Value>,
    to: Option<Value>,
    completed: bool,
}

pub(crate) enum Transition {
    None,
    Completed(Option<OnComplete>),
    /// Reached an end it holds at (progress 0 while reversed, or the end of a
    /// `hold_at_end` plan).
    Parked(Option<OnComplete>),
}

pub(crate) struct Advance {
    pub(crate) writes: Vec<(ElementRef, Property, Value)>,
    pub(crate) transition: Transition,
}

pub(crate) struct InstanceCore {
    id: InstId,
    element: ElementId,
    kind: InstanceKind,
    plan: MutationPlan,
    hold_at_end: bool,
    targets: Vec<ElementRef>,
    tracks: Vec<TrackState>,
    total: f32,
    time: f32,
    reversed: bool,
    primed: bool,
    dirty: bool,
    state: InstanceState,
    on_complete: Option<OnComplete>,
}

impl InstanceCore {
    fn new(
        id: InstId,
        plan: MutationPlan,
        kind: InstanceKind,
        target: &ElementRef,
        on_complete: Option<OnComplete>,
    ) -> Self {
        let children = if plan
            .tweens
            .iter()
            .any(|t| matches!(t.target, TargetSel::Child(_)))
        {
            target.children()
        } else {
            Vec::new()
        };
        let targets = plan
            .tweens
            .iter()
            .map(|t| match t.target {
                TargetSel::Root => target.clone(),
                TargetSel::Child(i) => children.get(i).cloned().unwrap_or_else(|| target.clone()),
            })
            .collect();
        let tracks = vec![TrackState::default(); plan.tweens.len()];
        let total = plan.total_duration();
        Self {
            id,
            element: target.id(),
            kind,
            plan,
            hold_at_end: false,
            targets,
            tracks,
            total,
            time: 0.0,
            reversed: false,
            primed: false,
            dirty: false,
            state: InstanceState::Created,
            on_complete,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> InstanceState {
        self.state
    }

    /// Move the playhead by `dt` (clock-driven) and sample every tween.
    pub(crate) fn advance(&mut self, dt: f32) -> Advance {
        let mut transition = Transition::None;

        match self.plan.driver {
            Driver::Clock => {
                if self.reversed {
                    self.time -= dt;
                    if self.time <= END_EPSILON {
                        self.time = 0.0;
                        self.state = InstanceState::Paused;
                        transition = Transition::Parked(None);
                    }
                } else {
                    self.time += dt;
                    if self.total.is_finite() && self.time >= self.total - END_EPSILON {
                        self.time = self.total;
                        let cb = self.on_complete.take();
                        if self.hold_at_end {
                            self.state = InstanceState::Paused;
                            transition = Transition::Parked(cb);
                        } else {
                            self.state = InstanceState::Completed;
                            transition = Transition::Completed(cb);
                        }
                    }
                }
            }
            Driver::Scroll => {
                if !self.dirty && self.primed {
                    return Advance {
                        writes: Vec::new(),
                        transition,
                    };
                }
            }
        }
        self.dirty = false;

        Advance {
            writes: self.sample(),
            transition,
        }
    }

    /// Explicit start values of tweens that have not begun yet. Produced once per run.
    pub(crate) fn prime(&mut self) -> Vec<(ElementRef, Property, Value)> {
        let mut writes = Vec::new();
        if self.primed {
            return writes;
        }
        self.primed = true;
        for (tween, target) in self.plan.tweens.iter().zip(&self.targets) {
            if let (true, Endpoint::Absolute(v)) = (tween.immediate, tween.from) {
                if self.time < tween.start || self.state == InstanceState::Created {
                    writes.push((target.clone(), tween.property, v));
                }
            }
        }
        writes
    }

    /// Writes for the current playhead. Restores of tweens the playhead sits before
    /// come first and are dropped where a started tween drives the same property, so
    /// later steps never mask earlier ones after a restart or reverse.
    fn sample(&mut self) -> Vec<(ElementRef, Property, Value)> {
        let mut writes = self.prime();
        let mut restores: Vec<(ElementRef, Property, Value)> = Vec::new();

        for ((tween, target), track) in self
            .plan
            .tweens
            .iter()
            .zip(&self.targets)
            .zip(self.tracks.iter_mut())
        {
            let local = self.time - tween.start;
            if local < 0.0 {
                // rewound before this tween: restore its captured start, earliest wins
                if let Some(from) = track.from {
                    if pending(&restores, target.id(), tween.property).is_none() {
                        restores.push((target.clone(), tween.property, from));
                    }
                }
                continue;
            }
            let (from, to) = match (track.from, track.to) {
                (Some(f), Some(t)) => (f, t),
                _ => {
                    // an earlier step may have written this property in the same pass
                    let current = pending(&writes, target.id(), tween.property)
                        .unwrap_or_else(|| current_value(target.as_ref(), tween.property));
                    let f = tween.from.resolve(current);
                    let t = tween.to.resolve(current);
                    track.from = Some(f);
                    track.to = Some(t);
                    (f, t)
                }
            };
            let (p, done) = tween_progress(tween, local);
            if done {
                track.completed = true;
            }
            let mut value = from.lerp(&to, tween.ease.apply(p));
            if tween.property.is_discrete() {
                if let Value::Float(f) = value {
                    value = Value::Float(f.floor());
                }
            }
            writes.push((target.clone(), tween.property, value));
        }

        if restores.is_empty() {
            return writes;
        }
        restores.retain(|(element, property, _)| {
            pending(&writes, element.id(), *property).is_none()
        });
        restores.extend(writes);
        restores
    }

    fn play(&mut self) -> Option<CoreEvent> {
        let event = match self.state {
            InstanceState::Created => CoreEvent::Started {
                inst: self.id,
                element: self.element,
            },
            InstanceState::Paused => CoreEvent::Resumed { inst: self.id },
            InstanceState::Running if self.reversed => CoreEvent::Reversed {
                inst: self.id,
                reversed: false,
            },
            _ => return None,
        };
        if self.hold_at_end && self.time >= self.total - END_EPSILON && !self.reversed {
            // already resting at the end
            return None;
        }
        self.state = InstanceState::Running;
        self.reversed = false;
        Some(event)
    }

    fn pause(&mut self) -> Option<CoreEvent> {
        if self.state != InstanceState::Running {
            return None;
        }
        self.state = InstanceState::Paused;
        Some(CoreEvent::Paused { inst: self.id })
    }

    fn reverse(&mut self) -> Option<CoreEvent> {
        match self.state {
            InstanceState::Running => {}
            InstanceState::Paused => {
                if !self.reversed && self.time <= END_EPSILON {
                    // nothing to rewind
                    return None;
                }
                self.state = InstanceState::Running;
            }
            _ => return None,
        }
        self.reversed = !self.reversed;
        Some(CoreEvent::Reversed {
            inst: self.id,
            reversed: self.reversed,
        })
    }

    fn restart(&mut self) -> CoreEvent {
        self.time = 0.0;
        self.reversed = false;
        self.primed = false;
        self.dirty = true;
        for track in &mut self.tracks {
            track.completed = false;
        }
        self.state = InstanceState::Running;
        CoreEvent::Restarted { inst: self.id }
    }

    fn kill(&mut self) -> Result<CoreEvent, AnimationError> {
        if self.state.is_terminal() {
            return Err(AnimationError::RedundantKill {
                inst: self.id,
                state: self.state,
            });
        }
        self.state = InstanceState::Killed;
        // never fires after a kill, even if restarted later
        self.on_complete = None;
        Ok(CoreEvent::Killed { inst: self.id })
    }

    pub(crate) fn kill_for_shutdown(&mut self) -> Option<CoreEvent> {
        self.kill().ok()
    }

    fn seek(&mut self, progress: f32) -> Option<CoreEvent> {
        if self.state.is_terminal() || !self.total.is_finite() {
            return None;
        }
        let progress = progress.clamp(0.0, 1.0);
        self.time = self.total * progress;
        self.dirty = true;
        Some(CoreEvent::Seeked {
            inst: self.id,
            progress,
        })
    }
}

/// Latest value queued for `(element, property)`.
fn pending(
    writes: &[(ElementRef, Property, Value)],
    element: ElementId,
    property: Property,
) -> Option<Value> {
    writes
        .iter()
        .rev()
        .find(|(e, p, _)| e.id() == element && *p == property)
        .map(|(_, _, v)| *v)
}

/// Progress within the current cycle of `tween` at local time `local` (>= 0), and
/// whether the tween has finished all its cycles.
fn tween_progress(tween: &Tween, local: f32) -> (f32, bool) {
    if tween.duration <= 0.0 {
        let last_cycle = tween.repeat.max(0);
        let p = if tween.yoyo && last_cycle % 2 == 1 {
            0.0
        } else {
            1.0
        };
        return (p, tween.repeat >= 0);
    }
    let span = tween.span();
    let (cycle, within, done) = if local >= span - END_EPSILON {
        (tween.repeat.max(0) as i64, 1.0, true)
    } else {
        let cycles = local / tween.duration;
        let cycle = cycles.floor();
        (cycle as i64, cycles - cycle, false)
    };
    let p = if tween.yoyo && cycle % 2 == 1 {
        1.0 - within
    } else {
        within
    };
    (p, done)
}

/// Handle to one instance. Owned by exactly one controller (or the caller that built
/// it); the scheduler only keeps the core attached while it is non-terminal.
pub struct AnimationInstance {
    core: Rc<RefCell<InstanceCore>>,
    scheduler: Scheduler,
}

impl fmt::Debug for AnimationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.core.borrow();
        f.debug_struct("AnimationInstance")
            .field("id", &c.id)
            .field("element", &c.element)
            .field("kind", &c.kind)
            .field("state", &c.state)
            .field("time", &c.time)
            .finish()
    }
}

impl AnimationInstance {
    /// Bind `plan` to `target` and register with the scheduler in state `Created`.
    pub fn new(
        plan: MutationPlan,
        kind: InstanceKind,
        target: ElementRef,
        scheduler: &Scheduler,
        on_complete: Option<OnComplete>,
    ) -> Self {
        let id = scheduler.alloc_inst();
        let core = Rc::new(RefCell::new(InstanceCore::new(
            id,
            plan,
            kind,
            &target,
            on_complete,
        )));
        scheduler.attach(id, core.clone());
        scheduler.record(CoreEvent::Created {
            inst: id,
            element: target.id(),
        });
        Self {
            core,
            scheduler: scheduler.clone(),
        }
    }

    /// Instance with nothing to animate; completes on its first tick.
    pub fn noop(target: ElementRef, scheduler: &Scheduler) -> Self {
        Self::new(MutationPlan::empty(), InstanceKind::Single, target, scheduler, None)
    }

    /// Second handle to the same instance, for callers that must not hold a borrow
    /// of the owner while operating on it.
    pub(crate) fn share(&self) -> Self {
        Self {
            core: self.core.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    /// Park at the end instead of completing (reversible reactions).
    pub fn hold_at_end(self) -> Self {
        self.core.borrow_mut().hold_at_end = true;
        self
    }

    pub fn id(&self) -> InstId {
        self.core.borrow().id
    }

    pub fn element(&self) -> ElementId {
        self.core.borrow().element
    }

    pub fn kind(&self) -> InstanceKind {
        self.core.borrow().kind
    }

    pub fn state(&self) -> InstanceState {
        self.core.borrow().state
    }

    /// Playhead in time units, including delays.
    pub fn time(&self) -> f32 {
        self.core.borrow().time
    }

    /// Total length; infinite for endless repeats.
    pub fn total_duration(&self) -> f32 {
        self.core.borrow().total
    }

    /// Fraction of the total length played, `None` for endless instances.
    pub fn progress(&self) -> Option<f32> {
        let c = self.core.borrow();
        if !c.total.is_finite() {
            None
        } else if c.total <= 0.0 {
            Some(if c.time > 0.0 || c.state == InstanceState::Completed {
                1.0
            } else {
                0.0
            })
        } else {
            Some((c.time / c.total).clamp(0.0, 1.0))
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.core.borrow().reversed
    }

    /// Resolved absolute start of each step.
    pub fn step_starts(&self) -> Vec<f32> {
        self.core.borrow().plan.tweens.iter().map(|t| t.start).collect()
    }

    pub fn step_count(&self) -> usize {
        self.core.borrow().plan.tweens.len()
    }

    /// Number of steps that finished all their cycles.
    pub fn completed_steps(&self) -> usize {
        self.core
            .borrow()
            .tracks
            .iter()
            .filter(|t| t.completed)
            .count()
    }

    /// Created/Paused → Running; a reversed Running instance turns forward again.
    pub fn play(&self) -> bool {
        let event = self.core.borrow_mut().play();
        self.emit(event)
    }

    pub fn pause(&self) -> bool {
        let event = self.core.borrow_mut().pause();
        self.emit(event)
    }

    /// Flip direction while Running (or resume a Paused instance backwards).
    pub fn reverse(&self) -> bool {
        let event = self.core.borrow_mut().reverse();
        self.emit(event)
    }

    /// Back to progress 0 and Running, from any state. Terminal instances re-attach
    /// to the scheduler.
    pub fn restart(&self) {
        let (id, event) = {
            let mut c = self.core.borrow_mut();
            (c.id, c.restart())
        };
        if !self.scheduler.is_attached(id) {
            self.scheduler.attach(id, self.core.clone());
        }
        self.scheduler.record(event);
    }

    /// Stop and detach synchronously. Already-applied values stay as they are.
    pub fn kill(&self) -> Result<(), AnimationError> {
        let (id, result) = {
            let mut c = self.core.borrow_mut();
            (c.id, c.kill())
        };
        let event = result?;
        self.scheduler.detach(id);
        self.scheduler.record(event);
        Ok(())
    }

    /// Write explicit start values now, before the first tick. Used for instances
    /// that wait on a trigger so the element does not flash its end state.
    pub fn render_initial(&self) {
        let writes = self.core.borrow_mut().prime();
        for (element, property, value) in writes {
            element.set(property, value);
        }
    }

    /// Position a scroll-driven instance; applied on the next tick.
    pub fn seek(&self, progress: f32) -> bool {
        let event = self.core.borrow_mut().seek(progress);
        self.emit(event)
    }

    fn emit(&self, event: Option<CoreEvent>) -> bool {
        match event {
            Some(e) => {
                self.scheduler.record(e);
                true
            }
            None => false,
        }
    }
}
