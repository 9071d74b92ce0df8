//! Animatable values and color parsing.

use serde::{Deserialize, Serialize};

use crate::interp::functions::{lerp_color, lerp_f32};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    ColorRgba,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Scalar float (opacity, translation, scale, degrees, character count)
    Float(f32),
    /// RGBA color, components in 0..1
    ColorRgba([f32; 4]),
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::ColorRgba(_) => ValueKind::ColorRgba,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::ColorRgba(_) => None,
        }
    }

    /// Offset a scalar by `delta`. Colors are returned unchanged.
    pub fn offset(&self, delta: f32) -> Value {
        match self {
            Value::Float(f) => Value::Float(f + delta),
            other => *other,
        }
    }

    /// Interpolate towards `to` at eased progress `t`.
    /// Mismatched kinds step at the end of the segment.
    pub fn lerp(&self, to: &Value, t: f32) -> Value {
        match (self, to) {
            (Value::Float(a), Value::Float(b)) => Value::Float(lerp_f32(*a, *b, t)),
            (Value::ColorRgba(a), Value::ColorRgba(b)) => Value::ColorRgba(lerp_color(*a, *b, t)),
            _ => {
                if t >= 1.0 {
                    *to
                } else {
                    *self
                }
            }
        }
    }
}

/// Parse a CSS-like color string: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` or
/// `rgba(r, g, b, a)`. Channel values are 0..255, alpha 0..1.
pub fn parse_color(s: &str) -> Option<[f32; 4]> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    let (body, has_alpha) = if let Some(rest) = lower.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = lower.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };
    let parts: Vec<f32> = body
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match (parts.as_slice(), has_alpha) {
        ([r, g, b], false) => Some([r / 255.0, g / 255.0, b / 255.0, 1.0]),
        ([r, g, b, a], true) => Some([r / 255.0, g / 255.0, b / 255.0, a.clamp(0.0, 1.0)]),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<[f32; 4]> {
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };
    Some([
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#fff"), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(parse_color("#000000"), Some([0.0, 0.0, 0.0, 1.0]));
        let c = parse_color("#ff000080").unwrap();
        assert_eq!(c[0], 1.0);
        assert!((c[3] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }

    #[test]
    fn parses_rgb_functions() {
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(
            parse_color("RGBA(0, 255, 0, 0.5)"),
            Some([0.0, 1.0, 0.0, 0.5])
        );
        assert_eq!(parse_color("rgba(0, 255, 0)"), None);
        assert_eq!(parse_color("hsl(0, 0%, 0%)"), None);
    }

    #[test]
    fn mismatched_kinds_step_at_end() {
        let a = Value::Float(1.0);
        let b = Value::ColorRgba([0.0; 4]);
        assert_eq!(a.lerp(&b, 0.5), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }
}
