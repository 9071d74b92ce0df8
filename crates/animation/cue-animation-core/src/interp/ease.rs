//! Easing curves addressed by string ids (`"power2.out"`, `"sine.inOut"`, `"none"`).
//!
//! `apply` maps linear progress in [0,1] to eased progress. Back and elastic curves
//! overshoot outside [0,1]; callers extrapolate.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EaseMode {
    In,
    Out,
    InOut,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ease {
    Linear,
    /// Polynomial ease; `degree` 1..=4 maps to exponent `degree + 1`.
    Power { degree: u8, mode: EaseMode },
    Sine(EaseMode),
    Back(EaseMode),
    ElasticOut,
    BounceOut,
}

impl Default for Ease {
    fn default() -> Self {
        Ease::DEFAULT
    }
}

impl Ease {
    /// Standard ease-out used when no curve is requested.
    pub const DEFAULT: Ease = Ease::Power {
        degree: 2,
        mode: EaseMode::Out,
    };

    /// Parse a curve id. Parameter suffixes such as `back.out(1.7)` are ignored.
    pub fn parse(id: &str) -> Option<Ease> {
        let id = id.trim();
        let id = id.split('(').next().unwrap_or(id);
        let (family, mode) = match id.split_once('.') {
            Some((f, m)) => (f, Some(m)),
            None => (id, None),
        };
        let mode = match mode {
            None | Some("out") => EaseMode::Out,
            Some("in") => EaseMode::In,
            Some("inOut") => EaseMode::InOut,
            Some(_) => return None,
        };
        let ease = match family {
            "none" | "linear" | "power0" => Ease::Linear,
            "power1" | "quad" => Ease::Power { degree: 1, mode },
            "power2" | "cubic" => Ease::Power { degree: 2, mode },
            "power3" | "quart" => Ease::Power { degree: 3, mode },
            "power4" | "quint" | "strong" => Ease::Power { degree: 4, mode },
            "sine" => Ease::Sine(mode),
            "back" => Ease::Back(mode),
            "elastic" if mode == EaseMode::Out => Ease::ElasticOut,
            "bounce" if mode == EaseMode::Out => Ease::BounceOut,
            _ => return None,
        };
        Some(ease)
    }

    /// Canonical id for this curve.
    pub fn id(&self) -> String {
        fn suffix(mode: EaseMode) -> &'static str {
            match mode {
                EaseMode::In => "in",
                EaseMode::Out => "out",
                EaseMode::InOut => "inOut",
            }
        }
        match self {
            Ease::Linear => "none".to_string(),
            Ease::Power { degree, mode } => format!("power{degree}.{}", suffix(*mode)),
            Ease::Sine(mode) => format!("sine.{}", suffix(*mode)),
            Ease::Back(mode) => format!("back.{}", suffix(*mode)),
            Ease::ElasticOut => "elastic.out".to_string(),
            Ease::BounceOut => "bounce.out".to_string(),
        }
    }

    /// Map linear progress `t` (clamped to [0,1]) to eased progress.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Ease::Linear => t,
            Ease::Power { degree, mode } => {
                let n = i32::from(degree) + 1;
                with_mode(mode, t, |x| x.powi(n))
            }
            Ease::Sine(mode) => with_mode(mode, t, |x| 1.0 - (x * PI / 2.0).cos()),
            Ease::Back(mode) => {
                const C1: f32 = 1.701_58;
                const C3: f32 = C1 + 1.0;
                with_mode(mode, t, |x| C3 * x * x * x - C1 * x * x)
            }
            Ease::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let c4 = (2.0 * PI) / 3.0;
                2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
            Ease::BounceOut => bounce_out(t),
        }
    }
}

/// Derive out/inOut variants from an ease-in curve.
#[inline]
fn with_mode(mode: EaseMode, t: f32, ease_in: impl Fn(f32) -> f32) -> f32 {
    match mode {
        EaseMode::In => ease_in(t),
        EaseMode::Out => 1.0 - ease_in(1.0 - t),
        EaseMode::InOut => {
            if t < 0.5 {
                ease_in(t * 2.0) / 2.0
            } else {
                1.0 - ease_in((1.0 - t) * 2.0) / 2.0
            }
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984_375
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Ease {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ease::parse(s).ok_or_else(|| format!("unknown ease '{s}'"))
    }
}

impl TryFrom<String> for Ease {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ease> for String {
    fn from(value: Ease) -> Self {
        value.id()
    }
}
