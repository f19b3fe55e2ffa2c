//! Parameter store for driver instances
//!
//! Parameters form an ordered tree of [`Param`] values addressed with dotted
//! paths: `"attrs.class"` reaches the `class` entry of the `attrs` map.
//! Iteration follows insertion order so rendered attributes come out in a
//! stable order.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::driver::PartialDriver;
use crate::view::RendererHandle;

/// Ordered map backing every nested level of a [`Params`] tree
pub type ParamMap = IndexMap<String, Param>;

/// Deferred content computed from the final driver state
pub type Producer = Rc<dyn Fn(&PartialDriver) -> String>;

/// A content slot (`content`, `before`, `after`)
#[derive(Clone)]
pub enum Content {
    /// Emitted verbatim
    Literal(String),
    /// Invoked with the driver at render time
    Producer(Producer),
}

impl Content {
    /// Wrap a closure as a content producer
    pub fn producer(f: impl Fn(&PartialDriver) -> String + 'static) -> Self {
        Self::Producer(Rc::new(f))
    }

    /// Produce the slot's text for the given driver
    pub fn resolve(&self, driver: &PartialDriver) -> String {
        match self {
            Content::Literal(text) => text.clone(),
            Content::Producer(produce) => produce(driver),
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Content::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Content::Literal(a), Content::Literal(b)) => a == b,
            (Content::Producer(a), Content::Producer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A single parameter value
#[derive(Clone, Default)]
pub enum Param {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Param>),
    Map(ParamMap),
    /// Literal or deferred content slot
    Content(Content),
    /// A ready-made renderer used in place of a view directory
    Renderer(RendererHandle),
}

impl Param {
    /// Loose truthiness: null, `false`, `0`, `""` and empty containers are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Param::Null => false,
            Param::Bool(b) => *b,
            Param::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Param::String(s) => !s.is_empty(),
            Param::List(items) => !items.is_empty(),
            Param::Map(map) => !map.is_empty(),
            Param::Content(Content::Literal(text)) => !text.is_empty(),
            Param::Content(Content::Producer(_)) | Param::Renderer(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Param::Null)
    }

    /// Borrow string data, including literal content slots
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::String(s) => Some(s),
            Param::Content(Content::Literal(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Param::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ParamMap> {
        match self {
            Param::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Scalar text form; null and non-scalar values give an empty string
    pub fn to_text(&self) -> String {
        match self {
            Param::Bool(b) => b.to_string(),
            Param::Number(n) => n.to_string(),
            Param::String(s) => s.clone(),
            Param::Content(Content::Literal(text)) => text.clone(),
            _ => String::new(),
        }
    }

    /// Convert into plain data, resolving content slots with `resolve`
    ///
    /// Renderer handles have no data form and become `null`.
    pub fn to_json(&self, resolve: &dyn Fn(&Content) -> String) -> Value {
        match self {
            Param::Null | Param::Renderer(_) => Value::Null,
            Param::Bool(b) => Value::Bool(*b),
            Param::Number(n) => Value::Number(n.clone()),
            Param::String(s) => Value::String(s.clone()),
            Param::List(items) => Value::Array(items.iter().map(|p| p.to_json(resolve)).collect()),
            Param::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json(resolve)))
                    .collect(),
            ),
            Param::Content(content) => Value::String(resolve(content)),
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Null => f.write_str("Null"),
            Param::Bool(b) => write!(f, "Bool({b})"),
            Param::Number(n) => write!(f, "Number({n})"),
            Param::String(s) => write!(f, "String({s:?})"),
            Param::List(items) => f.debug_tuple("List").field(items).finish(),
            Param::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Param::Content(content) => f.debug_tuple("Content").field(content).finish(),
            Param::Renderer(_) => f.write_str("Renderer(..)"),
        }
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Param::Null, Param::Null) => true,
            (Param::Bool(a), Param::Bool(b)) => a == b,
            (Param::Number(a), Param::Number(b)) => a == b,
            (Param::String(a), Param::String(b)) => a == b,
            (Param::List(a), Param::List(b)) => a == b,
            (Param::Map(a), Param::Map(b)) => a == b,
            (Param::Content(a), Param::Content(b)) => a == b,
            (Param::Renderer(a), Param::Renderer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Param::Null,
            Value::Bool(b) => Param::Bool(b),
            Value::Number(n) => Param::Number(n),
            Value::String(s) => Param::String(s),
            Value::Array(items) => Param::List(items.into_iter().map(Param::from).collect()),
            Value::Object(map) => Param::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::String(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::String(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Number(Number::from(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Number(Number::from(value))
    }
}

impl From<usize> for Param {
    fn from(value: usize) -> Self {
        Param::Number(Number::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Param::Null, Param::Number)
    }
}

impl From<Content> for Param {
    fn from(value: Content) -> Self {
        Param::Content(value)
    }
}

impl From<ParamMap> for Param {
    fn from(value: ParamMap) -> Self {
        Param::Map(value)
    }
}

impl From<Vec<Param>> for Param {
    fn from(value: Vec<Param>) -> Self {
        Param::List(value)
    }
}

impl From<RendererHandle> for Param {
    fn from(value: RendererHandle) -> Self {
        Param::Renderer(value)
    }
}

/// Dotted-path parameter store owned by every driver
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    items: ParamMap,
}

impl Params {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Param> {
        let mut segments = path.split('.');
        let mut current = self.items.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Look up a value, falling back to `default` when the path is absent
    pub fn get_or(&self, path: &str, default: impl Into<Param>) -> Param {
        self.get(path).cloned().unwrap_or_else(|| default.into())
    }

    /// Look up string data by dotted path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Param::as_str)
    }

    /// Store a value, creating intermediate maps as needed
    ///
    /// A non-map value sitting on the path is replaced by a map.
    pub fn set(&mut self, path: &str, value: impl Into<Param>) {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut map = &mut self.items;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                let entry = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Param::Map(ParamMap::new()));
                if !matches!(entry, Param::Map(_)) {
                    *entry = Param::Map(ParamMap::new());
                }
                let Param::Map(child) = entry else {
                    return;
                };
                map = child;
            }
        }
        map.insert(leaf.to_string(), value.into());
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Remove a value, keeping the order of the remaining entries
    pub fn forget(&mut self, path: &str) -> Option<Param> {
        let (map, leaf) = self.parent_mut(path)?;
        map.shift_remove(leaf)
    }

    /// All top-level entries
    pub fn all(&self) -> &ParamMap {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deep merge: nested maps merge key by key, any other value overwrites
    pub fn merge(&mut self, other: impl Into<Params>) {
        merge_maps(&mut self.items, other.into().items);
    }

    /// Convert into plain data, resolving content slots with `resolve`
    pub fn to_json(&self, resolve: &dyn Fn(&Content) -> String) -> Value {
        Value::Object(
            self.items
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json(resolve)))
                .collect(),
        )
    }

    fn parent_mut<'s, 'p>(&'s mut self, path: &'p str) -> Option<(&'s mut ParamMap, &'p str)> {
        match path.rsplit_once('.') {
            None => Some((&mut self.items, path)),
            Some((parents, leaf)) => {
                let mut map = &mut self.items;
                for segment in parents.split('.') {
                    match map.get_mut(segment) {
                        Some(Param::Map(child)) => map = child,
                        _ => return None,
                    }
                }
                Some((map, leaf))
            }
        }
    }
}

fn merge_maps(target: &mut ParamMap, source: ParamMap) {
    for (key, value) in source {
        match value {
            Param::Map(incoming) => {
                if let Some(Param::Map(existing)) = target.get_mut(&key) {
                    merge_maps(existing, incoming);
                    continue;
                }
                target.insert(key, Param::Map(incoming));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

impl From<ParamMap> for Params {
    fn from(items: ParamMap) -> Self {
        Self { items }
    }
}

/// Only JSON objects carry entries; any other value yields an empty store
impl From<Value> for Params {
    fn from(value: Value) -> Self {
        match Param::from(value) {
            Param::Map(items) => Self { items },
            _ => Self::default(),
        }
    }
}

impl<K: Into<String>, V: Into<Param>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            items: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
