//! Cue Orchestrator
//!
//! Connects host element lifecycles to cue animations. The host reports mounts,
//! option changes, unmounts, input events and scroll geometry; the orchestrator
//! keeps one controller scope per element, wires the triggers its animation asks
//! for, and turns every recoverable failure into a diagnostic instead of an error
//! on the render path.

pub mod bridge;
pub mod diagnostics;
pub mod triggers;

pub use bridge::{ControlOp, LifecycleBridge};
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticsCfg};
pub use triggers::{ExitBehavior, TriggerAction, TriggerBinder, TriggerBinding, TriggerFired, Viewport};
