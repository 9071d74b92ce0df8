//! Frame-clock scheduler.
//!
//! Single-threaded: all state sits behind `Rc<RefCell<_>>` and the handle is cheap to
//! clone. `tick(dt)` advances every Running instance in registration order. It
//! snapshots the active set first and holds no scheduler or instance borrow while
//! writing to elements or invoking completion callbacks, so callbacks may kill,
//! restart or create instances. Instances created during a tick first advance on the
//! following tick; instances killed during a tick are skipped if not yet visited.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::Config;
use crate::events::CoreEvent;
use crate::ids::{IdAllocator, InstId};
use crate::instance::{InstanceCore, InstanceState, Transition};

struct SchedulerInner {
    cfg: Config,
    ids: IdAllocator,
    active: IndexMap<InstId, Rc<RefCell<InstanceCore>>>,
    events: VecDeque<CoreEvent>,
    now: f32,
    frame: u64,
    shut_down: bool,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &inner.now)
            .field("frame", &inner.frame)
            .field("active", &inner.active.len())
            .field("shut_down", &inner.shut_down)
            .finish()
    }
}

impl Scheduler {
    pub fn new(cfg: Config) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                cfg,
                ids: IdAllocator::new(),
                active: IndexMap::new(),
                events: VecDeque::new(),
                now: 0.0,
                frame: 0,
                shut_down: false,
            })),
        }
    }

    pub fn config(&self) -> Config {
        self.inner.borrow().cfg.clone()
    }

    /// Accumulated clock time.
    pub fn now(&self) -> f32 {
        self.inner.borrow().now
    }

    /// Number of ticks processed.
    pub fn frame(&self) -> u64 {
        self.inner.borrow().frame
    }

    /// Advance the clock by `dt` and step every Running instance. Returns the number
    /// of instances advanced.
    pub fn tick(&self, dt: f32) -> usize {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let batch: Vec<(InstId, Rc<RefCell<InstanceCore>>)> = {
            let mut inner = self.inner.borrow_mut();
            if inner.shut_down {
                return 0;
            }
            inner.now += dt;
            inner.frame += 1;
            inner
                .active
                .iter()
                .map(|(id, core)| (*id, core.clone()))
                .collect()
        };

        let mut advanced = 0;
        for (id, core) in batch {
            let step = {
                let mut c = core.borrow_mut();
                if c.state() != InstanceState::Running {
                    continue;
                }
                c.advance(dt)
            };
            advanced += 1;

            for (element, property, value) in step.writes {
                element.set(property, value);
            }

            match step.transition {
                Transition::None => {}
                Transition::Completed(callback) => {
                    self.detach(id);
                    self.record(CoreEvent::Completed { inst: id });
                    log::debug!("{id} completed");
                    if let Some(cb) = callback {
                        cb.call();
                    }
                }
                Transition::Parked(callback) => {
                    self.record(CoreEvent::Paused { inst: id });
                    if let Some(cb) = callback {
                        cb.call();
                    }
                }
            }
        }
        advanced
    }

    /// Number of attached (non-terminal) instances.
    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    /// Number of attached instances currently Running.
    pub fn running_count(&self) -> usize {
        self.inner
            .borrow()
            .active
            .values()
            .filter(|c| c.borrow().state() == InstanceState::Running)
            .count()
    }

    pub fn is_attached(&self, id: InstId) -> bool {
        self.inner.borrow().active.contains_key(&id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.borrow().shut_down
    }

    /// Snapshot of recorded lifecycle events, oldest first.
    pub fn events(&self) -> Vec<CoreEvent> {
        self.inner.borrow().events.iter().cloned().collect()
    }

    pub fn drain_events(&self) -> Vec<CoreEvent> {
        self.inner.borrow_mut().events.drain(..).collect()
    }

    /// Kill every attached instance and stop ticking. Callbacks never fire afterwards.
    pub fn shutdown(&self) {
        let cores: Vec<Rc<RefCell<InstanceCore>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.shut_down = true;
            inner.active.drain(..).map(|(_, c)| c).collect()
        };
        let mut killed = 0;
        for core in cores {
            let result = core.borrow_mut().kill_for_shutdown();
            if let Some(event) = result {
                self.record(event);
                killed += 1;
            }
        }
        log::debug!("scheduler shut down, {killed} instance(s) killed");
    }

    pub(crate) fn alloc_inst(&self) -> InstId {
        self.inner.borrow_mut().ids.alloc_inst()
    }

    pub(crate) fn attach(&self, id: InstId, core: Rc<RefCell<InstanceCore>>) {
        let mut inner = self.inner.borrow_mut();
        if inner.shut_down {
            log::warn!("scheduler is shut down, {id} will not be ticked");
            return;
        }
        inner.active.insert(id, core);
    }

    pub(crate) fn detach(&self, id: InstId) {
        // shift_remove keeps the registration order of the remaining instances
        self.inner.borrow_mut().active.shift_remove(&id);
    }

    pub(crate) fn record(&self, event: CoreEvent) {
        let mut inner = self.inner.borrow_mut();
        let cap = inner.cfg.max_events;
        if cap == 0 {
            return;
        }
        while inner.events.len() >= cap {
            inner.events.pop_front();
        }
        inner.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::test_support::TestElement;
    use crate::element::Property;
    use crate::instance::{AnimationInstance, InstanceKind};
    use crate::interp::Ease;
    use crate::plan::{Driver, Endpoint, MutationPlan, TargetSel, Tween};
    use crate::value::Value;

    fn fade(duration: f32) -> MutationPlan {
        MutationPlan {
            tweens: vec![Tween {
                target: TargetSel::Root,
                property: Property::Opacity,
                from: Endpoint::Absolute(Value::Float(0.0)),
                to: Endpoint::Absolute(Value::Float(1.0)),
                start: 0.0,
                duration,
                ease: Ease::Linear,
                repeat: 0,
                yoyo: false,
                immediate: false,
            }],
            driver: Driver::Clock,
        }
    }

    #[test]
    fn tick_advances_clock_and_running_instances() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let a = AnimationInstance::new(fade(1.0), InstanceKind::Single, el.clone(), &sched, None);
        let _idle = AnimationInstance::new(fade(1.0), InstanceKind::Single, el, &sched, None);
        a.play();
        assert_eq!(sched.tick(0.25), 1);
        assert_eq!(sched.frame(), 1);
        assert!((sched.now() - 0.25).abs() < 1e-6);
        assert_eq!(sched.active_count(), 2);
        assert_eq!(sched.running_count(), 1);
    }

    #[test]
    fn negative_or_nan_dt_does_not_rewind() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let a = AnimationInstance::new(fade(1.0), InstanceKind::Single, el, &sched, None);
        a.play();
        sched.tick(0.5);
        sched.tick(-1.0);
        sched.tick(f32::NAN);
        assert!((a.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn event_log_is_bounded() {
        let cfg = Config {
            max_events: 3,
            ..Config::default()
        };
        let sched = Scheduler::new(cfg);
        let el = TestElement::new(1);
        for _ in 0..5 {
            AnimationInstance::new(fade(1.0), InstanceKind::Single, el.clone(), &sched, None);
        }
        let events = sched.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].inst(), InstId(2));
        assert_eq!(sched.drain_events().len(), 3);
        assert!(sched.events().is_empty());
    }

    #[test]
    fn shutdown_kills_everything_and_stops_ticking() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let a = AnimationInstance::new(fade(1.0), InstanceKind::Single, el.clone(), &sched, None);
        a.play();
        sched.shutdown();
        assert_eq!(a.state(), InstanceState::Killed);
        assert_eq!(sched.active_count(), 0);
        assert_eq!(sched.tick(1.0), 0);
        assert!(el.value(Property::Opacity).is_none());
    }
}
