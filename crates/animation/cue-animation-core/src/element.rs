//! Host-facing element contracts.
//!
//! The runtime never owns UI nodes. Hosts implement [`Element`] for property
//! mutation, child enumeration and geometry, and [`EventSource`] for installing
//! and removing input listeners. Both use `&self` receivers; hosts keep their own
//! interior mutability.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, ListenerId};
use crate::value::Value;

/// Animatable properties understood by the runtime.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    Opacity,
    /// Horizontal translation from rest position.
    X,
    /// Vertical translation from rest position.
    Y,
    Scale,
    /// Z rotation in degrees.
    Rotation,
    /// Y-axis rotation in degrees (card flips).
    RotationY,
    /// Glow/shadow color.
    GlowColor,
    /// Number of text characters revealed.
    VisibleChars,
}

impl Property {
    /// Value assumed when the host reports nothing for this property.
    pub fn neutral(&self) -> Value {
        match self {
            Property::Opacity | Property::Scale => Value::Float(1.0),
            Property::X | Property::Y | Property::Rotation | Property::RotationY => Value::Float(0.0),
            Property::VisibleChars => Value::Float(0.0),
            Property::GlowColor => Value::ColorRgba([0.0, 0.0, 0.0, 0.0]),
        }
    }

    /// Discrete properties are floored before being written.
    #[inline]
    pub fn is_discrete(&self) -> bool {
        matches!(self, Property::VisibleChars)
    }
}

/// Axis-aligned bounds in viewport coordinates (top grows downward).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// A mounted visual element the runtime can mutate.
pub trait Element {
    fn id(&self) -> ElementId;

    /// Current value of `property`, if the host tracks it.
    fn get(&self, property: Property) -> Option<Value>;

    fn set(&self, property: Property, value: Value);

    /// Child elements used by stagger and text-reveal compositions.
    fn children(&self) -> Vec<ElementRef> {
        Vec::new()
    }

    /// Bounding box relative to the viewport.
    fn bounds(&self) -> Rect;

    /// Character count of the element's text content.
    fn text_len(&self) -> usize {
        0
    }
}

pub type ElementRef = Rc<dyn Element>;

/// Read `property`, falling back to its neutral value.
pub fn current_value(element: &dyn Element, property: Property) -> Value {
    element
        .get(property)
        .unwrap_or_else(|| property.neutral())
}

/// Input kinds a trigger can listen to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerKind {
    HoverEnter,
    HoverLeave,
    Click,
    ScrollIntersect,
    /// Continuous scroll-progress tracking (parallax).
    ScrollScrub,
}

impl TriggerKind {
    pub fn is_scroll(&self) -> bool {
        matches!(self, TriggerKind::ScrollIntersect | TriggerKind::ScrollScrub)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerKind::HoverEnter => "hoverEnter",
            TriggerKind::HoverLeave => "hoverLeave",
            TriggerKind::Click => "click",
            TriggerKind::ScrollIntersect => "scrollIntersect",
            TriggerKind::ScrollScrub => "scrollScrub",
        };
        f.write_str(s)
    }
}

/// Host event registration. The host later reports a fired listener by its id.
pub trait EventSource {
    fn listen(&self, element: ElementId, kind: TriggerKind) -> ListenerId;

    fn unlisten(&self, listener: ListenerId);

    /// Resolve a trigger selector (e.g. `"#hero"`) to a mounted element.
    fn query(&self, _selector: &str) -> Option<ElementRef> {
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// In-memory element for unit tests.
    pub(crate) struct TestElement {
        id: ElementId,
        props: RefCell<HashMap<Property, Value>>,
        pub(crate) children: Vec<ElementRef>,
        pub(crate) bounds: Rect,
        pub(crate) text_len: usize,
    }

    impl TestElement {
        pub(crate) fn new(id: u32) -> Rc<Self> {
            Rc::new(Self::bare(id))
        }

        pub(crate) fn bare(id: u32) -> Self {
            Self {
                id: ElementId(id),
                props: RefCell::new(HashMap::new()),
                children: Vec::new(),
                bounds: Rect::default(),
                text_len: 0,
            }
        }

        pub(crate) fn with_children(id: u32, count: u32) -> Rc<Self> {
            let mut el = Self::bare(id);
            el.children = (0..count)
                .map(|i| TestElement::new(id * 100 + i + 1) as ElementRef)
                .collect();
            Rc::new(el)
        }

        pub(crate) fn value(&self, property: Property) -> Option<f32> {
            self.props.borrow().get(&property).and_then(Value::as_float)
        }
    }

    impl Element for TestElement {
        fn id(&self) -> ElementId {
            self.id
        }

        fn get(&self, property: Property) -> Option<Value> {
            self.props.borrow().get(&property).copied()
        }

        fn set(&self, property: Property, value: Value) {
            self.props.borrow_mut().insert(property, value);
        }

        fn children(&self) -> Vec<ElementRef> {
            self.children.clone()
        }

        fn bounds(&self) -> Rect {
            self.bounds
        }

        fn text_len(&self) -> usize {
            self.text_len
        }
    }
}
