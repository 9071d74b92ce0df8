//! Per-element animation controller.
//!
//! A controller owns at most one instance. Starting or installing a new one kills
//! the previous instance first, so a superseded instance's `Killed` event always
//! precedes its successor's `Started`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::catalog::AnimationFactory;
use crate::element::ElementRef;
use crate::ids::{ElementId, InstId};
use crate::instance::{AnimationInstance, InstanceState};
use crate::scheduler::Scheduler;

struct ControllerInner {
    element: ElementRef,
    scheduler: Scheduler,
    active: Option<AnimationInstance>,
}

impl ControllerInner {
    fn supersede(&mut self) -> Option<AnimationInstance> {
        self.active.take()
    }
}

pub struct AnimationController {
    inner: Rc<RefCell<ControllerInner>>,
}

impl AnimationController {
    pub fn new(element: ElementRef, scheduler: &Scheduler) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                element,
                scheduler: scheduler.clone(),
                active: None,
            })),
        }
    }

    pub fn element(&self) -> ElementId {
        self.inner.borrow().element.id()
    }

    /// Kill the current instance, build a new one and run it.
    pub fn start(&self, factory: &AnimationFactory) -> InstId {
        let id = self.install(factory);
        self.play();
        id
    }

    /// Kill the current instance and build a new one without running it. Explicit
    /// start values are rendered immediately.
    pub fn install(&self, factory: &AnimationFactory) -> InstId {
        let previous = self.inner.borrow_mut().supersede();
        if let Some(old) = previous {
            // terminal instances are already detached
            let _ = old.kill();
        }
        let (element, scheduler) = {
            let inner = self.inner.borrow();
            (inner.element.clone(), inner.scheduler.clone())
        };
        let instance = factory.build(&element, &scheduler);
        instance.render_initial();
        let id = instance.id();
        log::debug!("{} installed {id}", element.id());
        self.inner.borrow_mut().active = Some(instance);
        id
    }

    pub fn play(&self) -> bool {
        self.with_active(|i| i.play()).unwrap_or(false)
    }

    pub fn pause(&self) -> bool {
        self.with_active(|i| i.pause()).unwrap_or(false)
    }

    /// Back to progress 0 and run. False when there is no instance.
    pub fn restart(&self) -> bool {
        self.with_active(|i| i.restart()).is_some()
    }

    pub fn reverse(&self) -> bool {
        self.with_active(|i| i.reverse()).unwrap_or(false)
    }

    /// Kill the current instance. Returns false when there was nothing live to kill;
    /// repeated calls are harmless.
    pub fn kill(&self) -> bool {
        match self.with_active(|i| i.kill()) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                log::debug!("{e}");
                false
            }
            None => false,
        }
    }

    /// Position a scroll-scrubbed instance at `progress` (0..1).
    pub fn seek(&self, progress: f32) -> bool {
        self.with_active(|i| i.seek(progress)).unwrap_or(false)
    }

    pub fn state(&self) -> Option<InstanceState> {
        self.with_active(|i| i.state())
    }

    /// True while the instance is Running or Paused.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            Some(InstanceState::Running) | Some(InstanceState::Paused)
        )
    }

    pub fn active_id(&self) -> Option<InstId> {
        self.with_active(|i| i.id())
    }

    pub fn progress(&self) -> Option<f32> {
        self.with_active(|i| i.progress()).flatten()
    }

    /// Imperative handle for host code. Operations become no-ops once the controller
    /// is dropped.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // The instance is cloned out of the borrow so that operations may re-enter the
    // controller through callbacks.
    fn with_active<R>(&self, f: impl FnOnce(&AnimationInstance) -> R) -> Option<R> {
        let instance = self.inner.borrow().active.as_ref().map(AnimationInstance::share);
        instance.map(|i| f(&i))
    }
}

/// Host-facing control surface: play, pause, restart, reverse, kill.
#[derive(Clone)]
pub struct ControlHandle {
    inner: Weak<RefCell<ControllerInner>>,
}

impl ControlHandle {
    fn controller(&self) -> Option<AnimationController> {
        self.inner
            .upgrade()
            .map(|inner| AnimationController { inner })
    }

    pub fn play(&self) -> bool {
        self.controller().map(|c| c.play()).unwrap_or(false)
    }

    pub fn pause(&self) -> bool {
        self.controller().map(|c| c.pause()).unwrap_or(false)
    }

    pub fn restart(&self) -> bool {
        self.controller().map(|c| c.restart()).unwrap_or(false)
    }

    pub fn reverse(&self) -> bool {
        self.controller().map(|c| c.reverse()).unwrap_or(false)
    }

    pub fn kill(&self) -> bool {
        self.controller().map(|c| c.kill()).unwrap_or(false)
    }

    pub fn state(&self) -> Option<InstanceState> {
        self.controller().and_then(|c| c.state())
    }

    /// False once the owning controller is gone.
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AnimationCatalog;
    use crate::data::AnimationOptions;
    use crate::element::test_support::TestElement;
    use crate::element::Property;
    use crate::events::CoreEvent;
    use std::cell::Cell;

    fn factory(opts: AnimationOptions) -> AnimationFactory {
        AnimationCatalog::default().resolve(&opts).factory
    }

    #[test]
    fn start_supersedes_previous_instance() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let ctl = AnimationController::new(el, &sched);
        let a = ctl.start(&factory(AnimationOptions::new("float")));
        sched.tick(0.1);
        let b = ctl.start(&factory(AnimationOptions::new("rotate")));
        assert_ne!(a, b);
        assert_eq!(sched.active_count(), 1);
        assert_eq!(ctl.active_id(), Some(b));

        let events = sched.events();
        let killed_a = events
            .iter()
            .position(|e| *e == CoreEvent::Killed { inst: a })
            .expect("a killed");
        let started_b = events
            .iter()
            .position(|e| e.is_started() && e.inst() == b)
            .expect("b started");
        assert!(killed_a < started_b);
    }

    #[test]
    fn kill_is_idempotent() {
        let sched = Scheduler::default();
        let ctl = AnimationController::new(TestElement::new(1), &sched);
        assert!(!ctl.kill(), "nothing to kill yet");
        ctl.start(&factory(AnimationOptions::new("float")));
        assert!(ctl.kill());
        assert!(!ctl.kill());
        assert!(!ctl.kill());
        assert_eq!(ctl.state(), Some(InstanceState::Killed));
        assert!(!ctl.is_active());
    }

    #[test]
    fn callback_fires_once_on_natural_completion() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let ctl = AnimationController::new(el.clone(), &sched);
        ctl.start(&factory(
            AnimationOptions::new("fadeIn")
                .with_duration(1.0)
                .with_on_complete(move || c.set(c.get() + 1)),
        ));
        assert_eq!(ctl.state(), Some(InstanceState::Running));
        assert_eq!(el.value(Property::Opacity), Some(0.0));
        for _ in 0..20 {
            sched.tick(0.1);
        }
        assert_eq!(ctl.state(), Some(InstanceState::Completed));
        assert_eq!(count.get(), 1);
        assert_eq!(el.value(Property::Opacity), Some(1.0));
    }

    #[test]
    fn handle_outlives_controller_safely() {
        let sched = Scheduler::default();
        let ctl = AnimationController::new(TestElement::new(1), &sched);
        ctl.start(&factory(AnimationOptions::new("pulse")));
        let handle = ctl.handle();
        assert!(handle.pause());
        assert_eq!(handle.state(), Some(InstanceState::Paused));
        assert!(handle.play());
        drop(ctl);
        assert!(!handle.is_live());
        assert!(!handle.play());
        assert!(!handle.kill());
        assert_eq!(handle.state(), None);
    }

    #[test]
    fn install_waits_for_play() {
        let sched = Scheduler::default();
        let el = TestElement::new(1);
        let ctl = AnimationController::new(el.clone(), &sched);
        ctl.install(&factory(AnimationOptions::new("scrollReveal")));
        assert_eq!(ctl.state(), Some(InstanceState::Created));
        // hidden until triggered
        assert_eq!(el.value(Property::Opacity), Some(0.0));
        assert_eq!(el.value(Property::Y), Some(50.0));
        sched.tick(1.0);
        assert_eq!(el.value(Property::Opacity), Some(0.0));
        assert!(ctl.play());
        sched.tick(2.0);
        assert_eq!(ctl.state(), Some(InstanceState::Completed));
        assert_eq!(el.value(Property::Opacity), Some(1.0));
    }

    #[test]
    fn kill_from_completion_callback_of_another_instance() {
        let sched = Scheduler::default();
        let first = Rc::new(AnimationController::new(TestElement::new(1), &sched));
        let second = Rc::new(AnimationController::new(TestElement::new(2), &sched));
        second.start(&factory(AnimationOptions::new("float")));
        let victim = second.handle();
        first.start(&factory(
            AnimationOptions::new("fadeOut")
                .with_duration(0.5)
                .with_on_complete(move || {
                    victim.kill();
                }),
        ));
        sched.tick(1.0);
        assert_eq!(first.state(), Some(InstanceState::Completed));
        assert_eq!(second.state(), Some(InstanceState::Killed));
        assert_eq!(sched.active_count(), 0);
    }
}
