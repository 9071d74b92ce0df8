//! Error taxonomy for the animation runtime.
//!
//! None of these escape into the host render path: the catalog degrades to a
//! no-op instance and the lifecycle bridge records a diagnostic instead.

use serde::Serialize;

use crate::ids::{ElementId, InstId};
use crate::instance::InstanceState;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Catalog key is not a known animation type
    #[error("Unknown animation type: '{requested}'")]
    UnknownAnimationType { requested: String },

    /// Operation addressed an element that is not attached yet
    #[error("Element {element} is not attached")]
    MissingTarget { element: ElementId },

    /// Options are present but cannot be combined into the requested effect
    #[error("Invalid parameters for '{animation}': {reason}")]
    InvalidParameterCombination { animation: String, reason: String },

    /// Kill on an instance that already reached a terminal state
    #[error("Instance {inst} is already {state}")]
    RedundantKill { inst: InstId, state: InstanceState },

    /// Timeline offset string does not match the offset grammar
    #[error("Invalid timeline offset: '{offset}'")]
    InvalidOffset { offset: String },

    /// Scroll start string is not of the form "<edge> <percent>%"
    #[error("Invalid scroll start: '{value}'")]
    InvalidScrollStart { value: String },
}

impl AnimationError {
    /// Stable short name used by diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnimationError::UnknownAnimationType { .. } => "UnknownAnimationType",
            AnimationError::MissingTarget { .. } => "MissingTarget",
            AnimationError::InvalidParameterCombination { .. }
            | AnimationError::InvalidOffset { .. }
            | AnimationError::InvalidScrollStart { .. } => "InvalidParameterCombination",
            AnimationError::RedundantKill { .. } => "RedundantKill",
        }
    }
}
