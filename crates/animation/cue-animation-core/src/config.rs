//! Core configuration for cue-animation-core.

use serde::{Deserialize, Serialize};

use crate::data::ScrollStart;
use crate::interp::Ease;

/// Defaults applied when animation options omit a parameter, plus runtime sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Duration in time units (seconds) for one cycle.
    pub default_duration: f32,
    pub default_ease: Ease,
    /// Interval between children in stagger and text-reveal compositions.
    pub default_stagger: f32,
    /// Travel distance for directional fades and slides.
    pub default_distance: f32,
    /// Viewport crossing that counts as "entered" for scroll reveals.
    pub scroll_start: ScrollStart,

    /// Maximum lifecycle events retained by the scheduler before the oldest are dropped.
    pub max_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_duration: 0.8,
            default_ease: Ease::DEFAULT,
            default_stagger: 0.1,
            default_distance: 50.0,
            scroll_start: ScrollStart::default(),
            max_events: 1024,
        }
    }
}

impl Config {
    /// Parse a config from JSON; omitted keys keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
