//! Model/Slot: typed key-value records whose slots hold either a value, a
//! `Ref` to another Model, or the `NONE` sentinel.

use crate::chron::Chron;
use crate::markup::ChronMarkup;
use smartstring::alias::String as SmartString;

/// Opaque identity of a Model, stable across Worlds and (per spec section
/// 6) across the wire. Backed by `smartstring` the way the teacher backs
/// its own small identifiers and interned text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(SmartString);

impl Ref {
    pub fn new(id: impl Into<SmartString>) -> Self {
        Ref(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar slot content.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(SmartString),
}

/// Everything a slot can hold besides a Ref or `NONE`. A Model's most
/// interesting slots are usually `Text`/`Markup` - a Chron of codepoints and
/// the markup layered over it.
#[derive(Debug, Clone)]
pub enum Value {
    Primitive(Primitive),
    Text(Chron<char>),
    Markup(ChronMarkup<SmartString>),
}

impl Value {
    /// Content equality, used by `World::commit`'s conflict check. Refs use
    /// plain equality (an opaque id has no identity beyond its value);
    /// Text/Markup compare their materialized content rather than their
    /// internal structural sharing.
    fn content_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a.data(None).eq(b.data(None)),
            (Value::Markup(a), Value::Markup(b)) => {
                let mut av: Vec<_> = a.iter_markers().map(|m| (m.data.clone(), m.range)).collect();
                let mut bv: Vec<_> = b.iter_markers().map(|m| (m.data.clone(), m.range)).collect();
                av.sort_by(|x, y| x.0.cmp(&y.0));
                bv.sort_by(|x, y| x.0.cmp(&y.0));
                av == bv
            }
            _ => false,
        }
    }
}

/// A single MVCC cell. `None` is the empty sentinel - distinct from "not
/// written this transaction", which is represented by the slot simply not
/// appearing in `writes`.
#[derive(Debug, Clone)]
pub enum Slot {
    None,
    Value(Value),
    Ref(Ref),
}

impl Default for Slot {
    fn default() -> Self {
        Slot::None
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::None, Slot::None) => true,
            (Slot::Ref(a), Slot::Ref(b)) => a == b,
            (Slot::Value(a), Slot::Value(b)) => a.content_eq(b),
            _ => false,
        }
    }
}

/// The type constraint a Model class declares for one of its slots (spec
/// section 4.5, "`options.type` as `string` primitive-name or `function`
/// constructor").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    Any,
    Bool,
    I64,
    F64,
    Str,
    Text,
    Markup,
    RefType,
}

impl SlotType {
    pub fn name(&self) -> &'static str {
        match self {
            SlotType::Any => "any",
            SlotType::Bool => "bool",
            SlotType::I64 => "i64",
            SlotType::F64 => "f64",
            SlotType::Str => "str",
            SlotType::Text => "text",
            SlotType::Markup => "markup",
            SlotType::RefType => "ref",
        }
    }

    /// Whether `slot` satisfies this constraint. Writing `Slot::None` (i.e.
    /// clearing a slot) is always allowed regardless of declared type.
    pub fn accepts(&self, slot: &Slot) -> bool {
        match (self, slot) {
            (SlotType::Any, _) | (_, Slot::None) => true,
            (SlotType::Bool, Slot::Value(Value::Primitive(Primitive::Bool(_)))) => true,
            (SlotType::I64, Slot::Value(Value::Primitive(Primitive::I64(_)))) => true,
            (SlotType::F64, Slot::Value(Value::Primitive(Primitive::F64(_)))) => true,
            (SlotType::Str, Slot::Value(Value::Primitive(Primitive::Str(_)))) => true,
            (SlotType::Text, Slot::Value(Value::Text(_))) => true,
            (SlotType::Markup, Slot::Value(Value::Markup(_))) => true,
            (SlotType::RefType, Slot::Ref(_)) => true,
            _ => false,
        }
    }
}

/// A typed record living in exactly one World layer at a time (a child world
/// may hold its own shadow copy with independent `reads`/`writes`).
#[derive(Debug, Clone)]
pub struct Model {
    pub id: Ref,
    /// The class name this Model was constructed under - drives both
    /// cross-world identification and serializer tagging (spec section 6).
    pub class_name: &'static str,
    pub(crate) reads: Vec<Slot>,
    pub(crate) writes: Vec<Slot>,
}

impl Model {
    pub fn new(id: Ref, class_name: &'static str, slot_count: usize) -> Self {
        Model {
            id,
            class_name,
            reads: vec![Slot::None; slot_count],
            writes: vec![Slot::None; slot_count],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.writes.len()
    }

    /// "A Model is modified iff any writes[i] != NONE."
    pub fn has_writes(&self) -> bool {
        self.writes.iter().any(|s| *s != Slot::None)
    }

    /// An empty shadow Model for `world.bind` materializing a child-local
    /// placeholder: same identity, no observed reads or pending writes yet.
    pub fn shadow(id: Ref, class_name: &'static str, slot_count: usize) -> Self {
        Self::new(id, class_name, slot_count)
    }
}
