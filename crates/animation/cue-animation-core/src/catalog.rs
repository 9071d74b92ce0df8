//! Animation catalog: resolves host options into instance factories.
//!
//! Resolution never fails outright. Unknown types and invalid parameter
//! combinations produce a no-op factory alongside the error, so a render that asks
//! for a bad animation simply shows nothing animated.

use crate::config::Config;
use crate::data::{AnimationOptions, AnimationSpec, Cycle, OnComplete, Timing};
use crate::element::{ElementRef, Property};
use crate::error::AnimationError;
use crate::instance::{AnimationInstance, InstanceKind};
use crate::plan::{Driver, Endpoint, MutationPlan, TargetSel, TriggerPlan};
use crate::scheduler::Scheduler;
use crate::timeline::{Offset, TimelineComposer, TimelineStep};
use crate::value::Value;

/// What a set of options means for scope identity. Two option sets with equal
/// identity describe the same animation, whatever their callbacks.
#[derive(Clone, Debug, PartialEq)]
pub enum Identity {
    /// No animation requested.
    Empty,
    Spec(AnimationSpec),
    /// Options that did not resolve, compared by their serialized form.
    Unresolved(serde_json::Value),
}

pub struct Resolution {
    pub factory: AnimationFactory,
    pub error: Option<AnimationError>,
}

/// Builds instances for one resolved spec.
#[derive(Clone, Debug)]
pub struct AnimationFactory {
    spec: Option<AnimationSpec>,
    identity: Identity,
    on_complete: Option<OnComplete>,
}

impl AnimationFactory {
    /// Factory that builds instances with nothing to animate.
    pub fn noop() -> Self {
        Self {
            spec: None,
            identity: Identity::Empty,
            on_complete: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.spec.is_none()
    }

    pub fn spec(&self) -> Option<&AnimationSpec> {
        self.spec.as_ref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn trigger_plan(&self) -> TriggerPlan {
        match &self.spec {
            Some(AnimationSpec::ScrollReveal { scroll, .. }) => TriggerPlan::ScrollReveal(scroll.clone()),
            Some(AnimationSpec::Parallax { scroll, .. }) => TriggerPlan::ScrollScrub(scroll.clone()),
            Some(AnimationSpec::HoverScale { .. }) => TriggerPlan::Hover,
            Some(AnimationSpec::ClickBounce { .. }) => TriggerPlan::Click,
            _ => TriggerPlan::Autoplay,
        }
    }

    /// Concrete plan for `target`. Child-based effects read the element's children
    /// and text length at this point.
    pub fn plan_for(&self, target: &ElementRef) -> (MutationPlan, InstanceKind) {
        match &self.spec {
            Some(spec) => plan_for_spec(spec, target),
            None => (MutationPlan::empty(), InstanceKind::Single),
        }
    }

    /// Bind a fresh instance to `target` in state `Created`.
    pub fn build(&self, target: &ElementRef, scheduler: &Scheduler) -> AnimationInstance {
        let (plan, kind) = self.plan_for(target);
        let instance = AnimationInstance::new(
            plan,
            kind,
            target.clone(),
            scheduler,
            self.on_complete.clone(),
        );
        if matches!(self.trigger_plan(), TriggerPlan::Hover) {
            instance.hold_at_end()
        } else {
            instance
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimationCatalog {
    cfg: Config,
}

impl AnimationCatalog {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn resolve(&self, opts: &AnimationOptions) -> Resolution {
        if opts.is_empty() {
            return Resolution {
                factory: AnimationFactory::noop(),
                error: None,
            };
        }
        match AnimationSpec::from_options(opts, &self.cfg) {
            Ok(spec) => {
                log::debug!("resolved '{}'", spec.type_id());
                Resolution {
                    factory: AnimationFactory {
                        identity: Identity::Spec(spec.clone()),
                        spec: Some(spec),
                        on_complete: opts.on_complete.clone(),
                    },
                    error: None,
                }
            }
            Err(error) => {
                log::warn!("animation '{}' degraded to no-op: {error}", opts.kind);
                Resolution {
                    factory: AnimationFactory {
                        spec: None,
                        identity: self.identity_of_unresolved(opts),
                        on_complete: None,
                    },
                    error: Some(error),
                }
            }
        }
    }

    /// Identity of `opts` without building anything.
    pub fn identity(&self, opts: &AnimationOptions) -> Identity {
        if opts.is_empty() {
            return Identity::Empty;
        }
        match AnimationSpec::from_options(opts, &self.cfg) {
            Ok(spec) => Identity::Spec(spec),
            Err(_) => self.identity_of_unresolved(opts),
        }
    }

    fn identity_of_unresolved(&self, opts: &AnimationOptions) -> Identity {
        Identity::Unresolved(serde_json::to_value(opts).unwrap_or(serde_json::Value::Null))
    }
}

fn step(property: Property, from: Option<Endpoint>, to: Endpoint, timing: &Timing) -> TimelineStep {
    let s = TimelineStep::new(TargetSel::Root, property, to, timing.duration).ease(timing.ease);
    match from {
        Some(f) => s.from(f),
        None => s,
    }
}

fn abs(v: f32) -> Endpoint {
    Endpoint::Absolute(Value::Float(v))
}

/// Steps that all start together after `delay`.
fn together(mut steps: Vec<TimelineStep>, delay: f32) -> Vec<TimelineStep> {
    for (i, s) in steps.iter_mut().enumerate() {
        s.offset = if i == 0 {
            Offset::After(delay)
        } else {
            // the previous step has the same length, so this lines both starts up
            Offset::Overlap(s.duration)
        };
    }
    steps
}

/// Fade-up over each child (or the element itself when it has none), `stagger`
/// apart.
fn staggered_fade_up(target: &ElementRef, stagger: f32, distance: f32, timing: &Timing) -> Vec<TimelineStep> {
    let count = target.children().len();
    let selectors: Vec<TargetSel> = if count == 0 {
        vec![TargetSel::Root]
    } else {
        (0..count).map(TargetSel::Child).collect()
    };
    let d = timing.duration;
    let mut steps = Vec::with_capacity(selectors.len() * 2);
    for (i, sel) in selectors.into_iter().enumerate() {
        let offset = if i == 0 {
            Offset::After(timing.delay)
        } else if d >= stagger {
            Offset::Overlap(d - stagger)
        } else {
            Offset::Gap(stagger - d)
        };
        let mut fade = step(Property::Opacity, Some(abs(0.0)), abs(1.0), timing).offset(offset);
        fade.target = sel;
        let mut rise = step(Property::Y, Some(abs(distance)), abs(0.0), timing).offset(Offset::Overlap(d));
        rise.target = sel;
        steps.push(fade);
        steps.push(rise);
    }
    steps
}

fn looping(property: Property, to: Endpoint, timing: &Timing, cycle: Cycle) -> Vec<TimelineStep> {
    vec![step(property, None, to, timing)
        .cycle(cycle)
        .offset(Offset::After(timing.delay))]
}

fn plan_for_spec(spec: &AnimationSpec, target: &ElementRef) -> (MutationPlan, InstanceKind) {
    let mut kind = InstanceKind::Single;
    let mut driver = Driver::Clock;

    let steps = match spec {
        AnimationSpec::FadeIn {
            from,
            distance,
            timing,
        } => {
            let mut steps = vec![step(Property::Opacity, Some(abs(0.0)), abs(1.0), timing)];
            if let Some(dir) = from {
                let (property, offset) = dir.entrance_offset(*distance);
                steps.push(step(property, Some(abs(offset)), abs(0.0), timing));
            }
            together(steps, timing.delay)
        }
        AnimationSpec::FadeOut { timing } => {
            together(vec![step(Property::Opacity, None, abs(0.0), timing)], timing.delay)
        }
        AnimationSpec::SlideIn {
            from,
            distance,
            timing,
        } => {
            let (property, offset) = from.entrance_offset(*distance);
            together(vec![step(property, Some(abs(offset)), abs(0.0), timing)], timing.delay)
        }
        AnimationSpec::SlideOut {
            to,
            distance,
            timing,
        } => {
            let (property, offset) = to.exit_offset(*distance);
            together(vec![step(property, None, abs(offset), timing)], timing.delay)
        }
        AnimationSpec::ZoomIn { scale, timing } => together(
            vec![
                step(Property::Scale, Some(abs(*scale)), abs(1.0), timing),
                step(Property::Opacity, Some(abs(0.0)), abs(1.0), timing),
            ],
            timing.delay,
        ),
        AnimationSpec::ZoomOut { scale, timing } => together(
            vec![
                step(Property::Scale, None, abs(*scale), timing),
                step(Property::Opacity, None, abs(0.0), timing),
            ],
            timing.delay,
        ),
        AnimationSpec::Float {
            amount,
            timing,
            cycle,
        } => looping(Property::Y, Endpoint::Relative(-amount), timing, *cycle),
        AnimationSpec::Rotate {
            degrees,
            timing,
            cycle,
        } => looping(Property::Rotation, Endpoint::Relative(*degrees), timing, *cycle),
        AnimationSpec::Pulse {
            scale,
            timing,
            cycle,
        } => looping(Property::Scale, abs(*scale), timing, *cycle),
        AnimationSpec::Shake {
            intensity,
            timing,
            cycle,
        } => looping(Property::X, Endpoint::Relative(*intensity), timing, *cycle),
        AnimationSpec::Flip { degrees, timing } => {
            looping(Property::RotationY, Endpoint::Relative(*degrees), timing, Cycle::ONCE)
        }
        AnimationSpec::Bounce {
            amount,
            timing,
            cycle,
        } => looping(Property::Y, Endpoint::Relative(-amount), timing, *cycle),
        AnimationSpec::Glow {
            base_color,
            glow_color,
            timing,
            cycle,
        } => vec![step(
            Property::GlowColor,
            Some(Endpoint::Absolute(Value::ColorRgba(*base_color))),
            Endpoint::Absolute(Value::ColorRgba(*glow_color)),
            timing,
        )
        .cycle(*cycle)
        .offset(Offset::After(timing.delay))],
        AnimationSpec::TextReveal { stagger, timing } => {
            kind = InstanceKind::Timeline;
            staggered_fade_up(target, *stagger, crate::data::defaults::TEXT_DISTANCE, timing)
        }
        AnimationSpec::Stagger {
            stagger,
            distance,
            timing,
        } => {
            kind = InstanceKind::Timeline;
            staggered_fade_up(target, *stagger, *distance, timing)
        }
        AnimationSpec::Typewriter { timing } => {
            let len = target.text_len() as f32;
            together(
                vec![step(Property::VisibleChars, Some(abs(0.0)), abs(len), timing)],
                timing.delay,
            )
        }
        AnimationSpec::ScrollReveal {
            distance,
            timing,
            ..
        } => together(
            vec![
                step(Property::Opacity, Some(abs(0.0)), abs(1.0), timing),
                step(Property::Y, Some(abs(*distance)), abs(0.0), timing),
            ],
            timing.delay,
        ),
        AnimationSpec::Parallax { speed, .. } => {
            driver = Driver::Scroll;
            let timing = Timing {
                duration: 1.0,
                delay: 0.0,
                ease: crate::interp::Ease::Linear,
            };
            vec![step(Property::Y, Some(abs(0.0)), abs(-speed * 100.0), &timing)]
        }
        AnimationSpec::HoverScale { scale, timing } => {
            together(vec![step(Property::Scale, None, abs(*scale), timing)], timing.delay)
        }
        AnimationSpec::ClickBounce { scale, timing } => looping(
            Property::Scale,
            abs(*scale),
            timing,
            Cycle {
                repeat: 1,
                yoyo: true,
            },
        ),
    };

    let mut plan = TimelineComposer::compose(&steps);
    plan.driver = driver;
    (plan, kind)
}
