//! Trigger binder: owns input and scroll listener registrations and turns host
//! events into queued `TriggerFired` messages.
//!
//! Bindings are keyed by (owner element, trigger kind). Binding the same key again
//! replaces the previous registration and unlistens its host listener first, so an
//! element never accumulates duplicate listeners. The listened-to element may differ
//! from the owner (scroll triggers resolved from a selector).

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cue_animation_core::{
    AnimationController, Element, ElementId, ElementRef, EventSource, ListenerId, ScrollEdge, ScrollStart,
    TriggerKind,
};

/// What a fired trigger does to the owner's controller.
#[derive(Clone)]
pub enum TriggerAction {
    Play,
    Pause,
    Restart,
    Reverse,
    Kill,
    /// Seek to the scroll progress carried by the message.
    Scrub,
    Callback(Rc<dyn Fn()>),
}

impl TriggerAction {
    pub fn callback(f: impl Fn() + 'static) -> Self {
        TriggerAction::Callback(Rc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TriggerAction::Play => "play",
            TriggerAction::Pause => "pause",
            TriggerAction::Restart => "restart",
            TriggerAction::Reverse => "reverse",
            TriggerAction::Kill => "kill",
            TriggerAction::Scrub => "scrub",
            TriggerAction::Callback(_) => "callback",
        }
    }
}

impl fmt::Debug for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens when a scroll-revealed element leaves the viewport again.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitBehavior {
    /// Play once, forward only.
    #[default]
    Hold,
    /// Re-arm on exit and restart on every re-entry.
    Replay,
}

impl ExitBehavior {
    pub fn from_replay(replay: bool) -> Self {
        if replay {
            ExitBehavior::Replay
        } else {
            ExitBehavior::Hold
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub height: f32,
}

#[derive(Clone, Debug)]
struct ScrollWatch {
    start: ScrollStart,
    exit: ExitBehavior,
    observed: bool,
    inside: bool,
    entries: u32,
    last_progress: Option<f32>,
}

impl ScrollWatch {
    fn new(start: ScrollStart, exit: ExitBehavior) -> Self {
        Self {
            start,
            exit,
            observed: false,
            inside: false,
            entries: 0,
            last_progress: None,
        }
    }
}

#[derive(Clone)]
pub struct TriggerBinding {
    pub owner: ElementId,
    pub kind: TriggerKind,
    pub action: TriggerAction,
    pub listener: ListenerId,
    target: ElementRef,
    scroll: Option<ScrollWatch>,
}

impl fmt::Debug for TriggerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerBinding")
            .field("owner", &self.owner)
            .field("target", &self.target.id())
            .field("kind", &self.kind)
            .field("action", &self.action)
            .field("listener", &self.listener)
            .finish()
    }
}

impl TriggerBinding {
    /// Element whose events or geometry drive this binding.
    pub fn target(&self) -> ElementId {
        self.target.id()
    }
}

/// One fired trigger, addressed to the owner element's controller.
#[derive(Clone, Debug)]
pub struct TriggerFired {
    pub owner: ElementId,
    pub kind: TriggerKind,
    pub action: TriggerAction,
    /// Scroll progress for scrub messages.
    pub progress: Option<f32>,
}

impl TriggerFired {
    /// Apply the action to `controller`. Returns whether anything changed.
    pub fn dispatch(&self, controller: &AnimationController) -> bool {
        match &self.action {
            TriggerAction::Play => controller.play(),
            TriggerAction::Pause => controller.pause(),
            TriggerAction::Restart => controller.restart(),
            TriggerAction::Reverse => controller.reverse(),
            TriggerAction::Kill => controller.kill(),
            TriggerAction::Scrub => match self.progress {
                Some(p) => controller.seek(p),
                None => false,
            },
            TriggerAction::Callback(f) => {
                f();
                true
            }
        }
    }
}

pub struct TriggerBinder {
    source: Rc<dyn EventSource>,
    bindings: IndexMap<(ElementId, TriggerKind), TriggerBinding>,
    by_listener: HashMap<ListenerId, (ElementId, TriggerKind)>,
    queue: VecDeque<TriggerFired>,
}

impl TriggerBinder {
    pub fn new(source: Rc<dyn EventSource>) -> Self {
        Self {
            source,
            bindings: IndexMap::new(),
            by_listener: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &Rc<dyn EventSource> {
        &self.source
    }

    /// Bind `kind` events on `target` to `action` for `owner`, replacing any previous
    /// binding of the same kind.
    pub fn bind(
        &mut self,
        owner: ElementId,
        target: &ElementRef,
        kind: TriggerKind,
        action: TriggerAction,
    ) -> ListenerId {
        self.install(owner, target, kind, action, None)
    }

    /// Fire `action` when `target` crosses `start` scrolling down.
    pub fn bind_scroll(
        &mut self,
        owner: ElementId,
        target: &ElementRef,
        start: ScrollStart,
        exit: ExitBehavior,
        action: TriggerAction,
    ) -> ListenerId {
        let watch = ScrollWatch::new(start, exit);
        self.install(owner, target, TriggerKind::ScrollIntersect, action, Some(watch))
    }

    /// Emit `action` with the scroll progress of `target` whenever it changes.
    pub fn bind_scrub(&mut self, owner: ElementId, target: &ElementRef, action: TriggerAction) -> ListenerId {
        let watch = ScrollWatch::new(ScrollStart::default(), ExitBehavior::Hold);
        self.install(owner, target, TriggerKind::ScrollScrub, action, Some(watch))
    }

    fn install(
        &mut self,
        owner: ElementId,
        target: &ElementRef,
        kind: TriggerKind,
        action: TriggerAction,
        scroll: Option<ScrollWatch>,
    ) -> ListenerId {
        if self.unbind(owner, kind) {
            log::debug!("replacing {kind} binding of {owner}");
        }
        let listener = self.source.listen(target.id(), kind);
        self.by_listener.insert(listener, (owner, kind));
        self.bindings.insert(
            (owner, kind),
            TriggerBinding {
                owner,
                kind,
                action,
                listener,
                target: target.clone(),
                scroll,
            },
        );
        listener
    }

    /// Remove the binding of `kind` owned by `owner`. Unbinding twice is harmless.
    pub fn unbind(&mut self, owner: ElementId, kind: TriggerKind) -> bool {
        match self.bindings.shift_remove(&(owner, kind)) {
            Some(binding) => {
                self.by_listener.remove(&binding.listener);
                self.source.unlisten(binding.listener);
                true
            }
            None => false,
        }
    }

    /// Remove every binding owned by `element` or listening on it. Returns how many
    /// were removed.
    pub fn unbind_all(&mut self, element: ElementId) -> usize {
        let keys: Vec<(ElementId, TriggerKind)> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.owner == element || b.target.id() == element)
            .map(|(k, _)| *k)
            .collect();
        for (owner, kind) in &keys {
            self.unbind(*owner, *kind);
        }
        // drop undelivered messages for the element
        self.queue.retain(|m| m.owner != element);
        keys.len()
    }

    /// Remove the bindings owned by `owner` and its undelivered messages. Bindings of
    /// other elements that listen on `owner` are left alone.
    pub fn unbind_owned(&mut self, owner: ElementId) -> usize {
        let kinds: Vec<TriggerKind> = self
            .bindings
            .values()
            .filter(|b| b.owner == owner)
            .map(|b| b.kind)
            .collect();
        for kind in &kinds {
            self.unbind(owner, *kind);
        }
        self.queue.retain(|m| m.owner != owner);
        kinds.len()
    }

    /// Bindings owned by other elements that listen on `target`.
    pub fn watching(&self, target: ElementId) -> Vec<(ElementId, TriggerKind)> {
        self.bindings
            .iter()
            .filter(|(_, b)| b.owner != target && b.target.id() == target)
            .map(|(k, _)| *k)
            .collect()
    }

    /// Move an existing binding onto `target`. Action and scroll settings are kept;
    /// the new target is observed afresh. Returns the new listener.
    pub fn retarget(
        &mut self,
        owner: ElementId,
        kind: TriggerKind,
        target: &ElementRef,
    ) -> Option<ListenerId> {
        let binding = self.bindings.get_mut(&(owner, kind))?;
        let old = binding.listener;
        let listener = self.source.listen(target.id(), kind);
        binding.listener = listener;
        binding.target = target.clone();
        if let Some(watch) = binding.scroll.as_mut() {
            watch.observed = false;
            watch.inside = false;
            watch.last_progress = None;
        }
        self.by_listener.remove(&old);
        self.source.unlisten(old);
        self.by_listener.insert(listener, (owner, kind));
        log::debug!("{kind} binding of {owner} now listens on {}", target.id());
        Some(listener)
    }

    /// Host reports that `listener` fired. Stale or unknown ids are ignored.
    pub fn notify(&mut self, listener: ListenerId) -> bool {
        let Some(key) = self.by_listener.get(&listener) else {
            log::debug!("ignoring stale {listener}");
            return false;
        };
        let Some(binding) = self.bindings.get(key) else {
            return false;
        };
        if binding.kind.is_scroll() {
            // scroll bindings are driven by observe_scroll
            return false;
        }
        self.queue.push_back(TriggerFired {
            owner: binding.owner,
            kind: binding.kind,
            action: binding.action.clone(),
            progress: None,
        });
        true
    }

    /// Re-read the geometry of every scroll-bound element and queue the triggers
    /// that crossed. Returns the number of messages queued.
    pub fn observe_scroll(&mut self, viewport: Viewport) -> usize {
        let mut fired = Vec::new();
        for binding in self.bindings.values_mut() {
            let bounds = binding.target.bounds();
            let Some(watch) = binding.scroll.as_mut() else {
                continue;
            };
            match binding.kind {
                TriggerKind::ScrollIntersect => {
                    let edge = match watch.start.edge {
                        ScrollEdge::Top => bounds.top(),
                        ScrollEdge::Center => bounds.center_y(),
                        ScrollEdge::Bottom => bounds.bottom(),
                    };
                    let line = viewport.height * watch.start.viewport_fraction;
                    let inside = edge <= line;
                    // an element already past the line on first sight counts as entered
                    let entered = inside && (!watch.observed || !watch.inside);
                    watch.observed = true;
                    watch.inside = inside;
                    if !entered {
                        continue;
                    }
                    watch.entries += 1;
                    let action = match (watch.exit, watch.entries) {
                        (_, 1) => binding.action.clone(),
                        (ExitBehavior::Replay, _) => TriggerAction::Restart,
                        (ExitBehavior::Hold, _) => continue,
                    };
                    fired.push(TriggerFired {
                        owner: binding.owner,
                        kind: binding.kind,
                        action,
                        progress: None,
                    });
                }
                TriggerKind::ScrollScrub => {
                    let span = viewport.height + bounds.height;
                    let progress = if span > 0.0 {
                        ((viewport.height - bounds.top()) / span).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    if watch.last_progress == Some(progress) {
                        continue;
                    }
                    watch.last_progress = Some(progress);
                    fired.push(TriggerFired {
                        owner: binding.owner,
                        kind: binding.kind,
                        action: binding.action.clone(),
                        progress: Some(progress),
                    });
                }
                _ => {}
            }
        }
        let count = fired.len();
        self.queue.extend(fired);
        count
    }

    /// Take every queued message, oldest first.
    pub fn drain(&mut self) -> Vec<TriggerFired> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn binding(&self, owner: ElementId, kind: TriggerKind) -> Option<&TriggerBinding> {
        self.bindings.get(&(owner, kind))
    }

    pub fn is_bound(&self, owner: ElementId, kind: TriggerKind) -> bool {
        self.bindings.contains_key(&(owner, kind))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings owned by `owner`.
    pub fn bindings_for(&self, owner: ElementId) -> usize {
        self.bindings.values().filter(|b| b.owner == owner).count()
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        let keys: Vec<_> = self.bindings.keys().copied().collect();
        for (owner, kind) in keys {
            self.unbind(owner, kind);
        }
        self.queue.clear();
    }
}
