//! Lifecycle bridge: maps host attach/update/detach notifications onto controller
//! scopes.
//!
//! A scope is the controller plus trigger bindings created for one element. There is
//! at most one scope per element. Closing a scope kills its instance before any of
//! its bindings are removed.

use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cue_animation_core::{
    AnimationCatalog, AnimationController, AnimationError, AnimationFactory, AnimationOptions,
    ControlHandle, ElementId, ElementRef, EventSource, IdAllocator, Identity, InstanceState,
    ListenerId, Scheduler, ScopeId, TriggerKind, TriggerPlan,
};

use crate::diagnostics::{Diagnostic, DiagnosticLog, DiagnosticsCfg};
use crate::triggers::{ExitBehavior, TriggerAction, TriggerBinder, Viewport};

/// Imperative control requested by host code.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum ControlOp {
    Play,
    Pause,
    Restart,
    Reverse,
    Kill,
    Seek(f32),
}

struct Scope {
    id: ScopeId,
    identity: Identity,
    type_id: String,
    controller: AnimationController,
}

struct Mount {
    element: ElementRef,
    scope: Option<Scope>,
}

pub struct LifecycleBridge {
    scheduler: Scheduler,
    catalog: AnimationCatalog,
    binder: TriggerBinder,
    diagnostics: DiagnosticLog,
    ids: IdAllocator,
    mounts: IndexMap<ElementId, Mount>,
    pending: HashMap<ElementId, Vec<ControlOp>>,
}

impl LifecycleBridge {
    /// Bridge driving `scheduler`. The catalog uses the scheduler's config.
    pub fn new(
        scheduler: &Scheduler,
        source: Rc<dyn EventSource>,
        diagnostics: DiagnosticsCfg,
    ) -> Self {
        Self {
            catalog: AnimationCatalog::new(scheduler.config()),
            scheduler: scheduler.clone(),
            binder: TriggerBinder::new(source),
            diagnostics: DiagnosticLog::new(diagnostics),
            ids: IdAllocator::new(),
            mounts: IndexMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Element mounted. Opens a scope unless `options` is empty. Attaching an element
    /// that is already mounted behaves like `update`, except that a new element handle
    /// always gets a fresh scope bound to it.
    pub fn attach(&mut self, element: ElementRef, options: &AnimationOptions) -> Option<ScopeId> {
        let id = element.id();
        if let Some(mount) = self.mounts.get_mut(&id) {
            if same_handle(&mount.element, &element) {
                return self.update(id, options);
            }
            mount.element = element;
            log::debug!("{id} re-attached with a new handle");
            self.close_scope(id);
            if options.is_empty() {
                return None;
            }
            let scope = self.open_scope(id, options)?;
            self.replay_pending(id);
            return Some(scope);
        }
        self.mounts.insert(
            id,
            Mount {
                element,
                scope: None,
            },
        );
        if options.is_empty() {
            return None;
        }
        let scope = self.open_scope(id, options)?;
        self.replay_pending(id);
        Some(scope)
    }

    /// Options changed. Keeps the scope when the animation identity is unchanged,
    /// otherwise replaces it with a fresh one.
    pub fn update(&mut self, id: ElementId, options: &AnimationOptions) -> Option<ScopeId> {
        let Some(mount) = self.mounts.get(&id) else {
            log::debug!("update for unmounted {id} ignored");
            return None;
        };
        let identity = self.catalog.identity(options);
        if let Some(scope) = &mount.scope {
            if scope.identity == identity {
                return Some(scope.id);
            }
        }
        self.close_scope(id);
        if options.is_empty() {
            return None;
        }
        let scope = self.open_scope(id, options)?;
        self.replay_pending(id);
        Some(scope)
    }

    /// Element unmounted: kill, unbind its triggers, release. Other elements' triggers
    /// that watched it fall back to watching their own element.
    pub fn detach(&mut self, id: ElementId) -> bool {
        self.close_scope(id);
        self.release_watchers(id);
        self.pending.remove(&id);
        self.mounts.shift_remove(&id).is_some()
    }

    /// Apply `op` to the element's controller, or queue it until a scope exists.
    pub fn control(&mut self, id: ElementId, op: ControlOp) -> bool {
        let Some(controller) = self.controller(id) else {
            self.pending.entry(id).or_default().push(op);
            self.diagnostics.record(Diagnostic {
                kind: "MissingTarget".to_string(),
                element: id,
                requested_type: None,
                params: serde_json::to_value(op).unwrap_or(serde_json::Value::Null),
                message: format!("{op:?} deferred until {id} has an animation"),
            });
            return false;
        };
        match op {
            ControlOp::Play => controller.play(),
            ControlOp::Pause => controller.pause(),
            ControlOp::Restart => controller.restart(),
            ControlOp::Reverse => controller.reverse(),
            ControlOp::Seek(p) => controller.seek(p),
            ControlOp::Kill => {
                let state = controller.state();
                let inst = controller.active_id();
                if controller.kill() {
                    return true;
                }
                if let (Some(inst), Some(state)) = (inst, state) {
                    let error = AnimationError::RedundantKill { inst, state };
                    let requested = self.type_id(id);
                    self.diagnostics.record(Diagnostic::from_error(
                        &error,
                        id,
                        requested,
                        serde_json::Value::Null,
                    ));
                }
                false
            }
        }
    }

    /// Control handle for the element's current scope.
    pub fn handle(&self, id: ElementId) -> Option<ControlHandle> {
        self.controller(id).map(AnimationController::handle)
    }

    /// Host reports a fired listener.
    pub fn handle_event(&mut self, listener: ListenerId) -> bool {
        self.binder.notify(listener)
    }

    pub fn observe_scroll(&mut self, viewport: Viewport) -> usize {
        self.binder.observe_scroll(viewport)
    }

    /// Dispatch queued trigger messages to their controllers. Messages for elements
    /// without a scope are dropped.
    pub fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        for msg in self.binder.drain() {
            match self.controller(msg.owner) {
                Some(controller) => {
                    msg.dispatch(controller);
                    dispatched += 1;
                }
                None => log::debug!("dropping {:?} for {}", msg.action, msg.owner),
            }
        }
        dispatched
    }

    /// Dispatch trigger messages, then advance the clock.
    pub fn tick(&mut self, dt: f32) -> usize {
        self.pump();
        self.scheduler.tick(dt)
    }

    /// Release every scope. The scheduler itself stays usable.
    pub fn shutdown(&mut self) {
        let ids: Vec<ElementId> = self.mounts.keys().copied().collect();
        for id in ids {
            self.close_scope(id);
        }
        self.mounts.clear();
        self.binder.clear();
        self.pending.clear();
        log::debug!("lifecycle bridge shut down");
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn catalog(&self) -> &AnimationCatalog {
        &self.catalog
    }

    pub fn binder(&self) -> &TriggerBinder {
        &self.binder
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    pub fn is_mounted(&self, id: ElementId) -> bool {
        self.mounts.contains_key(&id)
    }

    pub fn scope_id(&self, id: ElementId) -> Option<ScopeId> {
        self.mounts.get(&id)?.scope.as_ref().map(|s| s.id)
    }

    pub fn scope_count(&self) -> usize {
        self.mounts.values().filter(|m| m.scope.is_some()).count()
    }

    pub fn state(&self, id: ElementId) -> Option<InstanceState> {
        self.controller(id)?.state()
    }

    pub fn pending_ops(&self, id: ElementId) -> usize {
        self.pending.get(&id).map_or(0, Vec::len)
    }

    fn controller(&self, id: ElementId) -> Option<&AnimationController> {
        self.mounts
            .get(&id)?
            .scope
            .as_ref()
            .map(|s| &s.controller)
    }

    fn type_id(&self, id: ElementId) -> Option<String> {
        self.mounts.get(&id)?.scope.as_ref().map(|s| s.type_id.clone())
    }

    fn open_scope(&mut self, id: ElementId, options: &AnimationOptions) -> Option<ScopeId> {
        let element = self.mounts.get(&id)?.element.clone();
        let resolution = self.catalog.resolve(options);
        if let Some(error) = &resolution.error {
            self.diagnostics.record(Diagnostic::from_error(
                error,
                id,
                Some(options.kind.clone()),
                serde_json::to_value(options).unwrap_or(serde_json::Value::Null),
            ));
        }
        let factory = resolution.factory;
        let controller = AnimationController::new(element.clone(), &self.scheduler);
        self.wire(&element, &controller, &factory, options);

        let scope = Scope {
            id: self.ids.alloc_scope(),
            identity: factory.identity().clone(),
            type_id: options.kind.clone(),
            controller,
        };
        let scope_id = scope.id;
        log::debug!("{scope_id} opened for {id} ('{}')", scope.type_id);
        if let Some(mount) = self.mounts.get_mut(&id) {
            mount.scope = Some(scope);
        }
        Some(scope_id)
    }

    /// Start or install the instance and bind the triggers its plan asks for.
    fn wire(
        &mut self,
        element: &ElementRef,
        controller: &AnimationController,
        factory: &AnimationFactory,
        options: &AnimationOptions,
    ) {
        let owner = element.id();
        match factory.trigger_plan() {
            TriggerPlan::Autoplay => {
                controller.start(factory);
            }
            TriggerPlan::Hover => {
                controller.install(factory);
                self.binder
                    .bind(owner, element, TriggerKind::HoverEnter, TriggerAction::Play);
                self.binder
                    .bind(owner, element, TriggerKind::HoverLeave, TriggerAction::Reverse);
            }
            TriggerPlan::Click => {
                controller.install(factory);
                self.binder
                    .bind(owner, element, TriggerKind::Click, TriggerAction::Restart);
            }
            TriggerPlan::ScrollReveal(scroll) => {
                controller.install(factory);
                let target = self.trigger_target(element, scroll.trigger.as_deref(), options);
                self.binder.bind_scroll(
                    owner,
                    &target,
                    scroll.start,
                    ExitBehavior::from_replay(scroll.replay),
                    TriggerAction::Play,
                );
            }
            TriggerPlan::ScrollScrub(scroll) => {
                controller.start(factory);
                let target = self.trigger_target(element, scroll.trigger.as_deref(), options);
                self.binder.bind_scrub(owner, &target, TriggerAction::Scrub);
            }
        }
    }

    /// Element named by `selector`, or the animated element itself.
    fn trigger_target(
        &mut self,
        element: &ElementRef,
        selector: Option<&str>,
        options: &AnimationOptions,
    ) -> ElementRef {
        let Some(selector) = selector else {
            return element.clone();
        };
        match self.binder.source().query(selector) {
            Some(found) => found,
            None => {
                self.diagnostics.record(Diagnostic {
                    kind: "MissingTarget".to_string(),
                    element: element.id(),
                    requested_type: Some(options.kind.clone()),
                    params: serde_json::json!({ "triggerElement": selector }),
                    message: format!(
                        "trigger element '{selector}' not found, watching {}",
                        element.id()
                    ),
                });
                element.clone()
            }
        }
    }

    fn close_scope(&mut self, id: ElementId) {
        let Some(scope) = self.mounts.get_mut(&id).and_then(|m| m.scope.take()) else {
            return;
        };
        scope.controller.kill();
        let removed = self.binder.unbind_owned(id);
        log::debug!("{} closed for {id}, {removed} binding(s) removed", scope.id);
    }

    /// Retarget bindings of other scopes that listen on the departing `id`.
    fn release_watchers(&mut self, id: ElementId) {
        for (owner, kind) in self.binder.watching(id) {
            let Some(element) = self.mounts.get(&owner).map(|m| m.element.clone()) else {
                self.binder.unbind(owner, kind);
                continue;
            };
            self.binder.retarget(owner, kind, &element);
            let requested = self.type_id(owner);
            self.diagnostics.record(Diagnostic {
                kind: "MissingTarget".to_string(),
                element: owner,
                requested_type: requested,
                params: serde_json::json!({ "triggerElement": id.0 }),
                message: format!("trigger element {id} detached, watching {owner}"),
            });
        }
    }

    fn replay_pending(&mut self, id: ElementId) {
        let Some(ops) = self.pending.remove(&id) else {
            return;
        };
        log::debug!("replaying {} deferred op(s) for {id}", ops.len());
        for op in ops {
            self.control(id, op);
        }
    }
}

fn same_handle(a: &ElementRef, b: &ElementRef) -> bool {
    // data pointers only
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}
