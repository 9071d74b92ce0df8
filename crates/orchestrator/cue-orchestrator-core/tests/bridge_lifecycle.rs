use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cue_animation_core::{
    AnimationOptions, ControlHandle, CoreEvent, ElementId, EventSource, InstanceState, ListenerId,
    Property, Scheduler, TriggerKind,
};
use cue_orchestrator::{ControlOp, DiagnosticsCfg, LifecycleBridge, Viewport};
use cue_test_fixtures::{options, FakeElement, FakeEventSource};

const VIEWPORT: Viewport = Viewport { height: 1000.0 };

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn setup() -> (Scheduler, Rc<FakeEventSource>, LifecycleBridge) {
    let sched = Scheduler::default();
    let src = FakeEventSource::new();
    let bridge = LifecycleBridge::new(&sched, src.clone(), DiagnosticsCfg::default());
    (sched, src, bridge)
}

fn run(bridge: &mut LifecycleBridge, seconds: f32, dt: f32) {
    let steps = (seconds / dt).round() as usize;
    for _ in 0..steps {
        bridge.tick(dt);
    }
}

fn fire(bridge: &mut LifecycleBridge, src: &FakeEventSource, el: u32, kind: TriggerKind) {
    let listener = src
        .listener(ElementId(el), kind)
        .unwrap_or_else(|| panic!("no {kind:?} listener on {el}"));
    assert!(bridge.handle_event(listener));
}

#[test]
fn detach_kills_a_running_loop() {
    let (sched, src, mut bridge) = setup();
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("float-forever").unwrap());
    run(&mut bridge, 1.0, 0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));

    assert!(bridge.detach(ElementId(1)));
    assert!(!bridge.is_mounted(ElementId(1)));
    assert_eq!(bridge.state(ElementId(1)), None);
    assert_eq!(sched.active_count(), 0);
    assert!(matches!(sched.events().last(), Some(CoreEvent::Killed { .. })));
    assert_eq!(src.live_count(), 0);

    let writes = el.writes();
    run(&mut bridge, 1.0, 0.1);
    assert_eq!(el.writes(), writes);
}

#[test]
fn hover_plays_forward_then_reverses() {
    let (_sched, src, mut bridge) = setup();
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("hover-scale").unwrap());
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Created));

    fire(&mut bridge, &src, 1, TriggerKind::HoverEnter);
    run(&mut bridge, 0.4, 0.05);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Paused));
    assert!(approx(el.value(Property::Scale).unwrap(), 1.1));

    fire(&mut bridge, &src, 1, TriggerKind::HoverLeave);
    run(&mut bridge, 0.4, 0.05);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Paused));
    assert!(approx(el.value(Property::Scale).unwrap(), 1.0));

    // enter again after a full leave
    fire(&mut bridge, &src, 1, TriggerKind::HoverEnter);
    run(&mut bridge, 0.4, 0.05);
    assert!(approx(el.value(Property::Scale).unwrap(), 1.1));
}

#[test]
fn every_click_restarts() {
    let (sched, src, mut bridge) = setup();
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("click-bounce").unwrap());

    fire(&mut bridge, &src, 1, TriggerKind::Click);
    run(&mut bridge, 3.0, 0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Completed));
    assert!(approx(el.value(Property::Scale).unwrap(), 1.0));

    fire(&mut bridge, &src, 1, TriggerKind::Click);
    bridge.tick(0.01);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));
    let restarts = sched
        .events()
        .iter()
        .filter(|e| matches!(e, CoreEvent::Restarted { .. }))
        .count();
    assert_eq!(restarts, 2);
}

#[test]
fn scroll_reveal_fires_once_per_mount() {
    let (sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    el.set_top(1000.0);
    bridge.attach(el.element_ref(), &options::load("scroll-reveal").unwrap());
    assert_eq!(el.value(Property::Opacity), Some(0.0), "hidden until revealed");

    assert_eq!(bridge.observe_scroll(VIEWPORT), 0);
    el.set_top(850.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 0);
    el.set_top(700.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    run(&mut bridge, 1.0, 0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Completed));
    assert!(approx(el.value(Property::Opacity).unwrap(), 1.0));

    el.set_top(950.0);
    bridge.observe_scroll(VIEWPORT);
    el.set_top(300.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 0);
    bridge.tick(0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Completed));
    assert_eq!(sched.events().iter().filter(|e| e.is_started()).count(), 1);
}

#[test]
fn scroll_reveal_replay_restarts_on_reentry() {
    let (_sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    el.set_top(1000.0);
    bridge.attach(el.element_ref(), &options::load("scroll-reveal-replay").unwrap());
    bridge.observe_scroll(VIEWPORT);
    el.set_top(600.0);
    bridge.observe_scroll(VIEWPORT);
    run(&mut bridge, 1.0, 0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Completed));

    el.set_top(950.0);
    bridge.observe_scroll(VIEWPORT);
    el.set_top(600.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    bridge.tick(0.05);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));
    assert!(el.value(Property::Opacity).unwrap() < 1.0);
}

#[test]
fn parallax_follows_the_trigger_element() {
    let (_sched, src, mut bridge) = setup();
    let hero = FakeElement::new(2);
    hero.set_top(1000.0);
    src.register("#hero", hero.element_ref());
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("parallax").unwrap());
    assert_eq!(
        bridge.binder().binding(ElementId(1), TriggerKind::ScrollScrub).unwrap().target(),
        ElementId(2)
    );

    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    bridge.tick(0.016);
    assert!(approx(el.value(Property::Y).unwrap(), 0.0));

    // (1000 - 450) / (1000 + 100) = 0.5
    hero.set_top(450.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    bridge.tick(0.016);
    assert!(approx(el.value(Property::Y).unwrap(), -25.0));

    // no scroll, no movement
    run(&mut bridge, 1.0, 0.1);
    assert!(approx(el.value(Property::Y).unwrap(), -25.0));
    assert!(bridge.diagnostics().is_empty());
}

#[test]
fn missing_trigger_element_falls_back_to_self() {
    let (_sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("parallax").unwrap());
    assert_eq!(bridge.diagnostics().count("MissingTarget"), 1);
    assert_eq!(
        bridge.binder().binding(ElementId(1), TriggerKind::ScrollScrub).unwrap().target(),
        ElementId(1)
    );
}

#[test]
fn unknown_type_records_a_diagnostic_and_animates_nothing() {
    let (_sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    assert!(bridge
        .attach(el.element_ref(), &options::load("unknown-type").unwrap())
        .is_some());
    run(&mut bridge, 1.0, 0.1);
    assert_eq!(el.writes(), 0);

    let entries: Vec<_> = bridge.diagnostics().entries().cloned().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "UnknownAnimationType");
    assert_eq!(entries[0].requested_type.as_deref(), Some("explode"));
    assert_eq!(entries[0].params["type"], "explode");
}

#[test]
fn same_options_keep_the_scope_and_changes_replace_it() {
    let (sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    let first = bridge
        .attach(el.element_ref(), &options::load("fade-in-1s").unwrap())
        .unwrap();
    bridge.tick(0.1);

    let same = options::load("fade-in-1s").unwrap().with_on_complete(|| {});
    assert_eq!(bridge.update(ElementId(1), &same), Some(first));
    assert_eq!(sched.events().iter().filter(|e| e.is_killed()).count(), 0);

    let changed = options::load("fade-in-1s").unwrap().with_duration(2.0);
    let second = bridge.update(ElementId(1), &changed).unwrap();
    assert_ne!(first, second);
    assert_eq!(sched.events().iter().filter(|e| e.is_killed()).count(), 1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));

    assert_eq!(bridge.update(ElementId(1), &AnimationOptions::default()), None);
    assert!(bridge.is_mounted(ElementId(1)));
    assert_eq!(bridge.scope_count(), 0);
    assert_eq!(sched.active_count(), 0);
}

#[test]
fn reattach_behaves_like_update() {
    let (_sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    let opts = options::load("float-forever").unwrap();
    let first = bridge.attach(el.element_ref(), &opts);
    assert_eq!(bridge.attach(el.element_ref(), &opts), first);
    assert_eq!(bridge.scope_count(), 1);
    assert_eq!(bridge.update(ElementId(9), &opts), None);
}

#[test]
fn reattach_with_a_new_handle_opens_a_fresh_scope() {
    let (sched, _src, mut bridge) = setup();
    let old = FakeElement::new(1);
    let opts = options::load("float-forever").unwrap();
    let first = bridge.attach(old.element_ref(), &opts).unwrap();
    run(&mut bridge, 0.5, 0.1);

    let fresh = FakeElement::new(1);
    let second = bridge.attach(fresh.element_ref(), &opts).unwrap();
    assert_ne!(first, second);
    assert_eq!(bridge.scope_count(), 1);
    assert_eq!(sched.active_count(), 1);

    let frozen = old.writes();
    run(&mut bridge, 0.5, 0.1);
    assert_eq!(old.writes(), frozen);
    assert!(fresh.writes() > 0);
}

/// Card (1) reveals when section (2), which has its own animation, scrolls in.
fn reveal_watching_section(
    src: &FakeEventSource,
    bridge: &mut LifecycleBridge,
) -> (Rc<FakeElement>, Rc<FakeElement>) {
    let section = FakeElement::new(2);
    section.set_top(1000.0);
    src.register("#section", section.element_ref());
    bridge.attach(section.element_ref(), &options::load("fade-in-1s").unwrap());

    let card = FakeElement::new(1);
    card.set_top(3000.0);
    let mut reveal = options::load("scroll-reveal").unwrap();
    reveal.trigger_element = Some("#section".to_string());
    bridge.attach(card.element_ref(), &reveal);
    assert_eq!(
        bridge.binder().binding(ElementId(1), TriggerKind::ScrollIntersect).unwrap().target(),
        ElementId(2)
    );
    (card, section)
}

#[test]
fn updating_a_trigger_element_keeps_other_scopes_bound() {
    let (_sched, src, mut bridge) = setup();
    let (_card, section) = reveal_watching_section(&src, &mut bridge);

    bridge.update(ElementId(2), &options::load("float-forever").unwrap());
    assert!(bridge.binder().is_bound(ElementId(1), TriggerKind::ScrollIntersect));
    assert_eq!(src.live_for(ElementId(2)), 1);

    assert_eq!(bridge.observe_scroll(VIEWPORT), 0);
    section.set_top(500.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    bridge.tick(0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));
    assert!(bridge.diagnostics().is_empty());
}

#[test]
fn detaching_a_trigger_element_falls_back_to_the_owner() {
    let (_sched, src, mut bridge) = setup();
    let (card, _section) = reveal_watching_section(&src, &mut bridge);

    bridge.detach(ElementId(2));
    assert_eq!(
        bridge.binder().binding(ElementId(1), TriggerKind::ScrollIntersect).unwrap().target(),
        ElementId(1)
    );
    assert_eq!(src.live_for(ElementId(2)), 0);
    assert_eq!(src.live_for(ElementId(1)), 1);

    let entries: Vec<_> = bridge.diagnostics().entries().cloned().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "MissingTarget");
    assert_eq!(entries[0].element, ElementId(1));
    assert_eq!(entries[0].requested_type.as_deref(), Some("scrollReveal"));

    assert_eq!(bridge.observe_scroll(VIEWPORT), 0);
    card.set_top(500.0);
    assert_eq!(bridge.observe_scroll(VIEWPORT), 1);
    bridge.tick(0.1);
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Running));
}

#[test]
fn detach_leaves_no_listeners_and_remount_binds_once() {
    let (_sched, src, mut bridge) = setup();
    let el = FakeElement::new(1);
    let opts = options::load("hover-scale").unwrap();
    bridge.attach(el.element_ref(), &opts);
    assert_eq!(src.live_for(ElementId(1)), 2);
    let stale = src.listener(ElementId(1), TriggerKind::HoverEnter).unwrap();

    bridge.detach(ElementId(1));
    assert_eq!(src.live_count(), 0);
    assert!(bridge.binder().is_empty());
    assert!(!bridge.handle_event(stale));

    bridge.attach(el.element_ref(), &opts);
    assert_eq!(src.live_for(ElementId(1)), 2);
    assert_eq!(src.installed(), 4);
    assert!(src.listener(ElementId(1), TriggerKind::HoverEnter).is_some());
    assert!(src.listener(ElementId(1), TriggerKind::HoverLeave).is_some());
}

#[test]
fn ops_before_attach_are_replayed() {
    let (_sched, _src, mut bridge) = setup();
    assert!(!bridge.control(ElementId(5), ControlOp::Pause));
    assert_eq!(bridge.pending_ops(ElementId(5)), 1);
    assert_eq!(bridge.diagnostics().count("MissingTarget"), 1);

    let el = FakeElement::new(5);
    bridge.attach(el.element_ref(), &options::load("float-forever").unwrap());
    assert_eq!(bridge.pending_ops(ElementId(5)), 0);
    assert_eq!(bridge.state(ElementId(5)), Some(InstanceState::Paused));

    assert!(bridge.control(ElementId(5), ControlOp::Play));
    assert_eq!(bridge.state(ElementId(5)), Some(InstanceState::Running));
}

#[test]
fn repeated_kill_is_diagnosed_not_fatal() {
    let (_sched, _src, mut bridge) = setup();
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("float-forever").unwrap());
    assert!(bridge.control(ElementId(1), ControlOp::Kill));
    assert!(!bridge.control(ElementId(1), ControlOp::Kill));
    assert_eq!(bridge.state(ElementId(1)), Some(InstanceState::Killed));
    assert_eq!(bridge.diagnostics().count("RedundantKill"), 1);
}

#[test]
fn control_ops_deserialize_from_host_json() {
    let ops: Vec<ControlOp> =
        serde_json::from_str(r#"[{"op":"play"},{"op":"seek","value":0.25},{"op":"kill"}]"#).unwrap();
    assert_eq!(ops, vec![ControlOp::Play, ControlOp::Seek(0.25), ControlOp::Kill]);
}

#[test]
fn shutdown_releases_everything_but_the_clock() {
    let (sched, src, mut bridge) = setup();
    let a = FakeElement::new(1);
    let b = FakeElement::new(2);
    bridge.attach(a.element_ref(), &options::load("float-forever").unwrap());
    bridge.attach(b.element_ref(), &options::load("hover-scale").unwrap());
    bridge.control(ElementId(3), ControlOp::Play);

    bridge.shutdown();
    assert_eq!(bridge.scope_count(), 0);
    assert!(!bridge.is_mounted(ElementId(1)));
    assert_eq!(bridge.pending_ops(ElementId(3)), 0);
    assert_eq!(src.live_count(), 0);
    assert_eq!(sched.active_count(), 0);
    assert!(!sched.is_shut_down());
}

/// Event source that records the owner's instance state whenever a listener is
/// removed.
#[derive(Default)]
struct UnlistenRecorder {
    next: Cell<u32>,
    handle: RefCell<Option<ControlHandle>>,
    seen: RefCell<Vec<Option<InstanceState>>>,
}

impl EventSource for UnlistenRecorder {
    fn listen(&self, _element: ElementId, _kind: TriggerKind) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(id.0 + 1);
        id
    }

    fn unlisten(&self, _listener: ListenerId) {
        let state = self.handle.borrow().as_ref().and_then(ControlHandle::state);
        self.seen.borrow_mut().push(state);
    }
}

#[test]
fn instance_is_killed_before_listeners_are_removed() {
    let sched = Scheduler::default();
    let recorder = Rc::new(UnlistenRecorder::default());
    let mut bridge = LifecycleBridge::new(&sched, recorder.clone(), DiagnosticsCfg::default());
    let el = FakeElement::new(1);
    bridge.attach(el.element_ref(), &options::load("hover-scale").unwrap());
    *recorder.handle.borrow_mut() = bridge.handle(ElementId(1));

    bridge.detach(ElementId(1));
    assert_eq!(
        *recorder.seen.borrow(),
        vec![Some(InstanceState::Killed), Some(InstanceState::Killed)]
    );
}
