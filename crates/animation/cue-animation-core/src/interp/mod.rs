//! Interpolation: value lerp helpers and named easing curves.

pub mod ease;
pub mod functions;

pub use ease::{Ease, EaseMode};
