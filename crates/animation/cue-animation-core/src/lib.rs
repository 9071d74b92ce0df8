//! Cue Animation Core (host-agnostic)
//!
//! Maps semantic animation requests (fades, slides, loops, staggers, scroll and
//! pointer reactions) onto time-based property mutations of host elements:
//!
//! - `catalog` resolves `AnimationOptions` into factories and plans
//! - `timeline` composes ordered steps with relative offsets
//! - `instance` runs one plan against one element
//! - `scheduler` is the injected frame clock that advances every running instance
//! - `controller` owns the single active instance of an element
//!
//! Everything is single-threaded and driven by explicit `Scheduler::tick` calls.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod data;
pub mod element;
pub mod error;
pub mod events;
pub mod ids;
pub mod instance;
pub mod interp;
pub mod plan;
pub mod scheduler;
pub mod timeline;
pub mod value;

// Re-exports for consumers (orchestrator, hosts)
pub use catalog::{AnimationCatalog, AnimationFactory, Identity, Resolution};
pub use config::Config;
pub use controller::{AnimationController, ControlHandle};
pub use data::{
    AnimationOptions, AnimationSpec, Cycle, Direction, OnComplete, ScrollCfg, ScrollEdge,
    ScrollStart, Timing, KNOWN_TYPES,
};
pub use element::{current_value, Element, ElementRef, EventSource, Property, Rect, TriggerKind};
pub use error::AnimationError;
pub use events::CoreEvent;
pub use ids::{ElementId, IdAllocator, InstId, ListenerId, ScopeId};
pub use instance::{AnimationInstance, InstanceKind, InstanceState};
pub use interp::{Ease, EaseMode};
pub use plan::{Driver, Endpoint, MutationPlan, TargetSel, TriggerPlan, Tween};
pub use scheduler::Scheduler;
pub use timeline::{Offset, TimelineComposer, TimelineStep};
pub use value::{parse_color, Value, ValueKind};
