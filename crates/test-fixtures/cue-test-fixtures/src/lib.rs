use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use cue_animation_core::{
    AnimationOptions, Config, Element, ElementId, ElementRef, EventSource, ListenerId, Property,
    Rect, TriggerKind, Value,
};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    options: HashMap<String, String>,
    configs: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a String> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Animation option presets (`fixtures/options/*.json`).
pub mod options {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.options.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.options, "options", name)?;
        read_to_string(rel)
    }

    pub fn load(name: &str) -> Result<AnimationOptions> {
        let rel = lookup(&MANIFEST.options, "options", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.options, "options", name)?;
        Ok(resolve_path(rel))
    }
}

/// Runtime config presets (`fixtures/configs/*.json`).
pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.configs.keys().cloned().collect()
    }

    pub fn load(name: &str) -> Result<Config> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        super::load_json(rel)
    }
}

/// In-memory host element. Records property writes and exposes adjustable geometry.
pub struct FakeElement {
    id: ElementId,
    props: RefCell<HashMap<Property, Value>>,
    children: Vec<ElementRef>,
    bounds: Cell<Rect>,
    text_len: usize,
    writes: Cell<usize>,
}

impl FakeElement {
    fn build(id: u32, children: Vec<ElementRef>, text_len: usize) -> Rc<Self> {
        Rc::new(Self {
            id: ElementId(id),
            props: RefCell::new(HashMap::new()),
            children,
            bounds: Cell::new(Rect::new(0.0, 0.0, 100.0, 100.0)),
            text_len,
            writes: Cell::new(0),
        })
    }

    pub fn new(id: u32) -> Rc<Self> {
        Self::build(id, Vec::new(), 0)
    }

    /// Element with `count` children, ids `id * 100 + 1 ..`.
    pub fn with_children(id: u32, count: u32) -> Rc<Self> {
        let children = (0..count)
            .map(|i| Self::new(id * 100 + i + 1) as ElementRef)
            .collect();
        Self::build(id, children, 0)
    }

    pub fn with_text(id: u32, text: &str) -> Rc<Self> {
        Self::build(id, Vec::new(), text.chars().count())
    }

    pub fn element_ref(self: &Rc<Self>) -> ElementRef {
        self.clone()
    }

    /// Place the element's top edge `top` units below the viewport top.
    pub fn set_top(&self, top: f32) {
        let mut b = self.bounds.get();
        b.y = top;
        self.bounds.set(b);
    }

    pub fn set_bounds(&self, bounds: Rect) {
        self.bounds.set(bounds);
    }

    /// Scalar value last written to `property`.
    pub fn value(&self, property: Property) -> Option<f32> {
        self.props.borrow().get(&property).and_then(Value::as_float)
    }

    pub fn color(&self, property: Property) -> Option<[f32; 4]> {
        match self.props.borrow().get(&property) {
            Some(Value::ColorRgba(c)) => Some(*c),
            _ => None,
        }
    }

    /// Total property writes received.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn child(&self, index: usize) -> Option<ElementRef> {
        self.children.get(index).cloned()
    }
}

impl Element for FakeElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn get(&self, property: Property) -> Option<Value> {
        self.props.borrow().get(&property).copied()
    }

    fn set(&self, property: Property, value: Value) {
        self.writes.set(self.writes.get() + 1);
        self.props.borrow_mut().insert(property, value);
    }

    fn children(&self) -> Vec<ElementRef> {
        self.children.clone()
    }

    fn bounds(&self) -> Rect {
        self.bounds.get()
    }

    fn text_len(&self) -> usize {
        self.text_len
    }
}

/// In-memory event source. Tracks live listeners so tests can assert on leaks and
/// simulate input by looking up the listener for an (element, kind) pair.
#[derive(Default)]
pub struct FakeEventSource {
    next: Cell<u32>,
    live: RefCell<HashMap<ListenerId, (ElementId, TriggerKind)>>,
    installed: Cell<usize>,
    removed: RefCell<Vec<ListenerId>>,
    selectors: RefCell<HashMap<String, ElementRef>>,
}

impl FakeEventSource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Make `element` resolvable by `selector`.
    pub fn register(&self, selector: &str, element: ElementRef) {
        self.selectors
            .borrow_mut()
            .insert(selector.to_string(), element);
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn live_for(&self, element: ElementId) -> usize {
        self.live
            .borrow()
            .values()
            .filter(|(e, _)| *e == element)
            .count()
    }

    /// Live listener for `(element, kind)`, if one is installed.
    pub fn listener(&self, element: ElementId, kind: TriggerKind) -> Option<ListenerId> {
        self.live
            .borrow()
            .iter()
            .find(|(_, (e, k))| *e == element && *k == kind)
            .map(|(id, _)| *id)
    }

    /// Listeners ever installed.
    pub fn installed(&self) -> usize {
        self.installed.get()
    }

    /// Listener ids in removal order.
    pub fn removed(&self) -> Vec<ListenerId> {
        self.removed.borrow().clone()
    }
}

impl EventSource for FakeEventSource {
    fn listen(&self, element: ElementId, kind: TriggerKind) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(self.next.get() + 1);
        self.installed.set(self.installed.get() + 1);
        self.live.borrow_mut().insert(id, (element, kind));
        id
    }

    fn unlisten(&self, listener: ListenerId) {
        if self.live.borrow_mut().remove(&listener).is_some() {
            self.removed.borrow_mut().push(listener);
        }
    }

    fn query(&self, selector: &str) -> Option<ElementRef> {
        self.selectors.borrow().get(selector).cloned()
    }
}
