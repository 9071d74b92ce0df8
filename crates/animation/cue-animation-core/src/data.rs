//! Animation data model: host-facing options and the typed spec resolved from them.
//!
//! `AnimationOptions` is the loose configuration surface (camelCase JSON keys, every
//! field optional). `AnimationSpec` is the closed, typed form: one variant per effect
//! family, each carrying only the parameters that effect reads. Spec equality is the
//! identity used by the lifecycle bridge to decide whether a re-render changed the
//! animation; completion callbacks are deliberately outside of it.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AnimationError;
use crate::interp::{Ease, EaseMode};
use crate::value::parse_color;

/// Per-type defaults that differ from `Config`.
pub(crate) mod defaults {
    pub const FLOAT_AMOUNT: f32 = 20.0;
    pub const FLOAT_DURATION: f32 = 2.0;
    pub const ROTATE_DEGREES: f32 = 360.0;
    pub const ROTATE_DURATION: f32 = 3.0;
    pub const PULSE_SCALE: f32 = 1.1;
    pub const SHAKE_INTENSITY: f32 = 10.0;
    pub const SHAKE_CYCLE: f32 = 0.1;
    pub const SHAKE_REPEAT: i32 = 5;
    pub const FLIP_DEGREES: f32 = 360.0;
    pub const BOUNCE_AMOUNT: f32 = 20.0;
    pub const GLOW_DURATION: f32 = 1.5;
    pub const ZOOM_IN_SCALE: f32 = 0.5;
    pub const ZOOM_OUT_SCALE: f32 = 0.5;
    pub const TEXT_STAGGER: f32 = 0.05;
    pub const TEXT_DISTANCE: f32 = 20.0;
    pub const PARALLAX_SPEED: f32 = 0.5;
    pub const HOVER_SCALE: f32 = 1.05;
    pub const HOVER_DURATION: f32 = 0.3;
    pub const CLICK_SCALE: f32 = 0.9;
    pub const CLICK_DURATION: f32 = 0.15;
}

/// Every type id accepted by [`AnimationSpec::from_options`].
pub const KNOWN_TYPES: &[&str] = &[
    "fadeIn",
    "fadeOut",
    "fadeInUp",
    "fadeInDown",
    "fadeInLeft",
    "fadeInRight",
    "slideInUp",
    "slideInDown",
    "slideInLeft",
    "slideInRight",
    "slideOutUp",
    "slideOutDown",
    "slideOutLeft",
    "slideOutRight",
    "zoomIn",
    "zoomOut",
    "float",
    "rotate",
    "pulse",
    "shake",
    "flip",
    "bounce",
    "glow",
    "textReveal",
    "typewriter",
    "scrollReveal",
    "parallax",
    "stagger",
    "hoverScale",
    "clickBounce",
];

/// Completion callback. Fires at most once, on natural completion only.
#[derive(Clone)]
pub struct OnComplete(Rc<dyn Fn()>);

impl OnComplete {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for OnComplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnComplete(..)")
    }
}

/// Host configuration surface. Unset fields fall back to `Config` or per-type defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationOptions {
    /// Animation type id (see [`KNOWN_TYPES`]). Empty means "no animation".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    /// Extra cycles after the first; `-1` repeats forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yoyo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stagger_time: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_start: Option<String>,
    /// Re-run a scroll reveal every time the element re-enters the viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glow_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f32>,
    #[serde(skip)]
    pub on_complete: Option<OnComplete>,
}

impl AnimationOptions {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind.trim().is_empty()
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_on_complete(mut self, f: impl Fn() + 'static) -> Self {
        self.on_complete = Some(OnComplete::new(f));
        self
    }
}

/// Timing shared by every effect.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub duration: f32,
    pub delay: f32,
    pub ease: Ease,
}

/// Repetition for loops and attention effects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Extra cycles after the first; negative repeats forever.
    pub repeat: i32,
    pub yoyo: bool,
}

impl Cycle {
    pub const ONCE: Cycle = Cycle {
        repeat: 0,
        yoyo: false,
    };

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.repeat < 0
    }
}

/// Side an element enters from (fade/slide in) or leaves towards (slide out).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn parse(s: &str) -> Option<Direction> {
        match s {
            "Up" => Some(Direction::Up),
            "Down" => Some(Direction::Down),
            "Left" => Some(Direction::Left),
            "Right" => Some(Direction::Right),
            _ => None,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }

    /// Signed start offset for an entrance: `*InUp` rises from below, `*InLeft` comes
    /// in from the left.
    pub fn entrance_offset(&self, distance: f32) -> (crate::element::Property, f32) {
        use crate::element::Property;
        match self {
            Direction::Up => (Property::Y, distance),
            Direction::Down => (Property::Y, -distance),
            Direction::Left => (Property::X, -distance),
            Direction::Right => (Property::X, distance),
        }
    }

    /// Signed end offset for an exit: `slideOutUp` leaves upward.
    pub fn exit_offset(&self, distance: f32) -> (crate::element::Property, f32) {
        use crate::element::Property;
        match self {
            Direction::Up => (Property::Y, -distance),
            Direction::Down => (Property::Y, distance),
            Direction::Left => (Property::X, -distance),
            Direction::Right => (Property::X, distance),
        }
    }
}

/// Element edge compared against the viewport line of a scroll start.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollEdge {
    Top,
    Center,
    Bottom,
}

/// `"<edge> <viewport>"` threshold, e.g. `"top 80%"`: the element's top edge crossing
/// 80% of the viewport height.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScrollStart {
    pub edge: ScrollEdge,
    /// Fraction of viewport height measured from the top, 0..1.
    pub viewport_fraction: f32,
}

impl Default for ScrollStart {
    fn default() -> Self {
        Self {
            edge: ScrollEdge::Top,
            viewport_fraction: 0.8,
        }
    }
}

impl FromStr for ScrollStart {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnimationError::InvalidScrollStart {
            value: s.to_string(),
        };
        let mut parts = s.split_whitespace();
        let (edge, line) = match (parts.next(), parts.next(), parts.next()) {
            (Some(e), Some(l), None) => (e, l),
            _ => return Err(invalid()),
        };
        let edge = match edge {
            "top" => ScrollEdge::Top,
            "center" => ScrollEdge::Center,
            "bottom" => ScrollEdge::Bottom,
            _ => return Err(invalid()),
        };
        let viewport_fraction = match line {
            "top" => 0.0,
            "center" => 0.5,
            "bottom" => 1.0,
            pct => {
                let n: f32 = pct
                    .strip_suffix('%')
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(invalid)?;
                if !(0.0..=100.0).contains(&n) {
                    return Err(invalid());
                }
                n / 100.0
            }
        };
        Ok(Self {
            edge,
            viewport_fraction,
        })
    }
}

impl fmt::Display for ScrollStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = match self.edge {
            ScrollEdge::Top => "top",
            ScrollEdge::Center => "center",
            ScrollEdge::Bottom => "bottom",
        };
        write!(f, "{edge} {}%", self.viewport_fraction * 100.0)
    }
}

impl TryFrom<String> for ScrollStart {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScrollStart> for String {
    fn from(value: ScrollStart) -> Self {
        value.to_string()
    }
}

/// Scroll binding parameters for reveal and scrub effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollCfg {
    pub start: ScrollStart,
    /// Selector of the element whose geometry drives the trigger; the animated
    /// element itself when unset.
    pub trigger: Option<String>,
    /// Replay on every re-entry instead of playing once forward.
    pub replay: bool,
}

/// Closed, typed animation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnimationSpec {
    FadeIn {
        from: Option<Direction>,
        distance: f32,
        timing: Timing,
    },
    FadeOut {
        timing: Timing,
    },
    SlideIn {
        from: Direction,
        distance: f32,
        timing: Timing,
    },
    SlideOut {
        to: Direction,
        distance: f32,
        timing: Timing,
    },
    ZoomIn {
        scale: f32,
        timing: Timing,
    },
    ZoomOut {
        scale: f32,
        timing: Timing,
    },
    Float {
        amount: f32,
        timing: Timing,
        cycle: Cycle,
    },
    Rotate {
        degrees: f32,
        timing: Timing,
        cycle: Cycle,
    },
    Pulse {
        scale: f32,
        timing: Timing,
        cycle: Cycle,
    },
    Shake {
        intensity: f32,
        timing: Timing,
        cycle: Cycle,
    },
    Flip {
        degrees: f32,
        timing: Timing,
    },
    Bounce {
        amount: f32,
        timing: Timing,
        cycle: Cycle,
    },
    Glow {
        base_color: [f32; 4],
        glow_color: [f32; 4],
        timing: Timing,
        cycle: Cycle,
    },
    TextReveal {
        stagger: f32,
        timing: Timing,
    },
    Typewriter {
        timing: Timing,
    },
    ScrollReveal {
        distance: f32,
        timing: Timing,
        scroll: ScrollCfg,
    },
    Parallax {
        speed: f32,
        scroll: ScrollCfg,
    },
    Stagger {
        stagger: f32,
        distance: f32,
        timing: Timing,
    },
    HoverScale {
        scale: f32,
        timing: Timing,
    },
    ClickBounce {
        scale: f32,
        timing: Timing,
    },
}

impl AnimationSpec {
    /// Resolve loose options into a typed spec.
    pub fn from_options(opts: &AnimationOptions, cfg: &Config) -> Result<Self, AnimationError> {
        let kind = opts.kind.trim();
        let r = Resolver { opts, cfg, kind };
        let distance = opts.amount.unwrap_or(cfg.default_distance).abs();

        let spec = match kind {
            "fadeIn" => AnimationSpec::FadeIn {
                from: None,
                distance,
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "fadeOut" => AnimationSpec::FadeOut {
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "zoomIn" => AnimationSpec::ZoomIn {
                scale: opts.scale.unwrap_or(defaults::ZOOM_IN_SCALE),
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "zoomOut" => AnimationSpec::ZoomOut {
                scale: opts.scale.unwrap_or(defaults::ZOOM_OUT_SCALE),
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "float" => AnimationSpec::Float {
                amount: opts.amount.unwrap_or(defaults::FLOAT_AMOUNT),
                timing: r.timing(defaults::FLOAT_DURATION, Ease::Sine(EaseMode::InOut)),
                cycle: r.cycle(-1, true),
            },
            "rotate" => AnimationSpec::Rotate {
                degrees: opts.degrees.unwrap_or(defaults::ROTATE_DEGREES),
                timing: r.timing(defaults::ROTATE_DURATION, Ease::Linear),
                cycle: r.cycle(-1, false),
            },
            "pulse" => AnimationSpec::Pulse {
                scale: opts.scale.unwrap_or(defaults::PULSE_SCALE),
                timing: r.timing(cfg.default_duration, Ease::Sine(EaseMode::InOut)),
                cycle: r.cycle(1, true),
            },
            "shake" => AnimationSpec::Shake {
                intensity: opts.intensity.unwrap_or(defaults::SHAKE_INTENSITY),
                timing: r.timing(defaults::SHAKE_CYCLE, Ease::Power {
                    degree: 1,
                    mode: EaseMode::InOut,
                }),
                cycle: r.cycle(defaults::SHAKE_REPEAT, true),
            },
            "flip" => AnimationSpec::Flip {
                degrees: opts.degrees.unwrap_or(defaults::FLIP_DEGREES),
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "bounce" => AnimationSpec::Bounce {
                amount: opts.amount.unwrap_or(defaults::BOUNCE_AMOUNT),
                timing: r.timing(cfg.default_duration / 2.0, cfg.default_ease),
                cycle: r.cycle(1, true),
            },
            "glow" => {
                let (base, glow) = match (opts.base_color.as_deref(), opts.glow_color.as_deref()) {
                    (Some(b), Some(g)) => (b, g),
                    _ => {
                        return Err(r.invalid("glow requires both baseColor and glowColor"));
                    }
                };
                let base_color =
                    parse_color(base).ok_or_else(|| r.invalid(&format!("bad baseColor '{base}'")))?;
                let glow_color =
                    parse_color(glow).ok_or_else(|| r.invalid(&format!("bad glowColor '{glow}'")))?;
                AnimationSpec::Glow {
                    base_color,
                    glow_color,
                    timing: r.timing(defaults::GLOW_DURATION, Ease::Sine(EaseMode::InOut)),
                    cycle: r.cycle(-1, true),
                }
            }
            "textReveal" => AnimationSpec::TextReveal {
                stagger: r.stagger(defaults::TEXT_STAGGER),
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "typewriter" => AnimationSpec::Typewriter {
                timing: r.timing(cfg.default_duration, Ease::Linear),
            },
            "scrollReveal" => AnimationSpec::ScrollReveal {
                distance,
                timing: r.timing(cfg.default_duration, cfg.default_ease),
                scroll: r.scroll()?,
            },
            "parallax" => AnimationSpec::Parallax {
                speed: opts.speed.unwrap_or(defaults::PARALLAX_SPEED),
                scroll: r.scroll()?,
            },
            "stagger" => AnimationSpec::Stagger {
                stagger: r.stagger(cfg.default_stagger),
                distance: opts.amount.unwrap_or(defaults::TEXT_DISTANCE).abs(),
                timing: r.timing(cfg.default_duration, cfg.default_ease),
            },
            "hoverScale" => AnimationSpec::HoverScale {
                scale: opts.scale.unwrap_or(defaults::HOVER_SCALE),
                timing: r.timing(defaults::HOVER_DURATION, cfg.default_ease),
            },
            "clickBounce" => AnimationSpec::ClickBounce {
                scale: opts.scale.unwrap_or(defaults::CLICK_SCALE),
                timing: r.timing(defaults::CLICK_DURATION, cfg.default_ease),
            },
            other => {
                let timing = r.timing(cfg.default_duration, cfg.default_ease);
                if let Some(dir) = other.strip_prefix("fadeIn").and_then(Direction::parse) {
                    AnimationSpec::FadeIn {
                        from: Some(dir),
                        distance,
                        timing,
                    }
                } else if let Some(dir) = other.strip_prefix("slideIn").and_then(Direction::parse) {
                    AnimationSpec::SlideIn {
                        from: dir,
                        distance,
                        timing,
                    }
                } else if let Some(dir) = other.strip_prefix("slideOut").and_then(Direction::parse) {
                    AnimationSpec::SlideOut {
                        to: dir,
                        distance,
                        timing,
                    }
                } else {
                    return Err(AnimationError::UnknownAnimationType {
                        requested: opts.kind.clone(),
                    });
                }
            }
        };
        Ok(spec)
    }

    /// Type id this spec was resolved from.
    pub fn type_id(&self) -> String {
        let id = match self {
            AnimationSpec::FadeIn { from: Some(d), .. } => return format!("fadeIn{}", d.suffix()),
            AnimationSpec::SlideIn { from, .. } => return format!("slideIn{}", from.suffix()),
            AnimationSpec::SlideOut { to, .. } => return format!("slideOut{}", to.suffix()),
            AnimationSpec::FadeIn { from: None, .. } => "fadeIn",
            AnimationSpec::FadeOut { .. } => "fadeOut",
            AnimationSpec::ZoomIn { .. } => "zoomIn",
            AnimationSpec::ZoomOut { .. } => "zoomOut",
            AnimationSpec::Float { .. } => "float",
            AnimationSpec::Rotate { .. } => "rotate",
            AnimationSpec::Pulse { .. } => "pulse",
            AnimationSpec::Shake { .. } => "shake",
            AnimationSpec::Flip { .. } => "flip",
            AnimationSpec::Bounce { .. } => "bounce",
            AnimationSpec::Glow { .. } => "glow",
            AnimationSpec::TextReveal { .. } => "textReveal",
            AnimationSpec::Typewriter { .. } => "typewriter",
            AnimationSpec::ScrollReveal { .. } => "scrollReveal",
            AnimationSpec::Parallax { .. } => "parallax",
            AnimationSpec::Stagger { .. } => "stagger",
            AnimationSpec::HoverScale { .. } => "hoverScale",
            AnimationSpec::ClickBounce { .. } => "clickBounce",
        };
        id.to_string()
    }
}

/// Option lookup helpers scoped to one `from_options` call.
struct Resolver<'a> {
    opts: &'a AnimationOptions,
    cfg: &'a Config,
    kind: &'a str,
}

impl Resolver<'_> {
    fn timing(&self, default_duration: f32, default_ease: Ease) -> Timing {
        let ease = match self.opts.ease.as_deref() {
            None => default_ease,
            Some(id) => Ease::parse(id).unwrap_or_else(|| {
                log::warn!(
                    "unknown ease '{id}' for '{}', using {}",
                    self.kind,
                    self.cfg.default_ease
                );
                self.cfg.default_ease
            }),
        };
        Timing {
            duration: self.opts.duration.unwrap_or(default_duration).max(0.0),
            delay: self.opts.delay.unwrap_or(0.0).max(0.0),
            ease,
        }
    }

    fn cycle(&self, default_repeat: i32, default_yoyo: bool) -> Cycle {
        let repeat = self.opts.repeat.unwrap_or(default_repeat);
        Cycle {
            repeat: if repeat < 0 { -1 } else { repeat },
            yoyo: self.opts.yoyo.unwrap_or(default_yoyo),
        }
    }

    fn stagger(&self, default: f32) -> f32 {
        self.opts.stagger_time.unwrap_or(default).max(0.0)
    }

    fn scroll(&self) -> Result<ScrollCfg, AnimationError> {
        let start = match self.opts.scroll_start.as_deref() {
            Some(s) => s.parse()?,
            None => self.cfg.scroll_start,
        };
        Ok(ScrollCfg {
            start,
            trigger: self.opts.trigger_element.clone(),
            replay: self.opts.replay.unwrap_or(false),
        })
    }

    fn invalid(&self, reason: &str) -> AnimationError {
        AnimationError::InvalidParameterCombination {
            animation: self.kind.to_string(),
            reason: reason.to_string(),
        }
    }
}
