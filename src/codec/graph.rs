//! The generic value tree the atom codec actually serializes, and the
//! mapping between it and this crate's runtime types (World/Model/Slot,
//! Chron<char>, ChronMarkup<SmartString>).
//!
//! Pointer sharing (spec section 4.4) is content-addressed here rather than
//! reference-addressed: two structurally equal composite nodes are treated
//! as the same object and collapse onto one pointer slot. That's sufficient
//! to satisfy this runtime's own sharing requirement (a Ref reused across
//! two slots survives a round trip as the same id string) without requiring
//! genuine reference identity, which Rust's owned-value `GraphValue` tree
//! can't represent for cyclic graphs. See DESIGN.md for the tradeoff.

use crate::chron::{Anchor, Chron, Cursor, Offset, Range};
use crate::error::{ChronError, Result};
use crate::markup::ChronMarkup;
use crate::world::{Model, Primitive, Ref, Slot, Value, World};
use smartstring::alias::String as SmartString;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmartString),
    Array(Vec<GraphValue>),
    PlainObject(Vec<(SmartString, GraphValue)>),
    /// A registered typed constructor's instance: `tag` names the class,
    /// `fields` holds its values in declared slot order.
    Typed { tag: SmartString, fields: Vec<GraphValue> },
}

impl Eq for GraphValue {}

impl std::hash::Hash for GraphValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            GraphValue::Undefined | GraphValue::Null => {}
            GraphValue::Bool(b) => b.hash(state),
            GraphValue::Int(i) => i.hash(state),
            GraphValue::Float(f) => f.to_bits().hash(state),
            GraphValue::Str(s) => s.hash(state),
            GraphValue::Array(items) => items.hash(state),
            GraphValue::PlainObject(fields) => fields.hash(state),
            GraphValue::Typed { tag, fields } => {
                tag.hash(state);
                fields.hash(state);
            }
        }
    }
}

/// Strings longer than two codepoints and every composite are "objects":
/// eligible for pointer pooling during encode (spec section 4.4).
pub(crate) fn is_indexable(v: &GraphValue) -> bool {
    match v {
        GraphValue::Str(s) => s.chars().count() > 2,
        GraphValue::Array(_) | GraphValue::PlainObject(_) | GraphValue::Typed { .. } => true,
        _ => false,
    }
}

fn find_field<'a>(fields: &'a [(SmartString, GraphValue)], name: &str) -> Result<&'a GraphValue> {
    fields.iter().find(|(k, _)| k == name).map(|(_, v)| v).ok_or(ChronError::Malformed("missing expected field"))
}

fn as_str(v: &GraphValue) -> Result<&SmartString> {
    match v {
        GraphValue::Str(s) => Ok(s),
        _ => Err(ChronError::Malformed("expected a string atom")),
    }
}

fn as_int(v: &GraphValue) -> Result<i64> {
    match v {
        GraphValue::Int(n) => Ok(*n),
        _ => Err(ChronError::Malformed("expected an integer atom")),
    }
}

fn as_bool(v: &GraphValue) -> Result<bool> {
    match v {
        GraphValue::Bool(b) => Ok(*b),
        _ => Err(ChronError::Malformed("expected a boolean atom")),
    }
}

fn as_array(v: &GraphValue) -> Result<&[GraphValue]> {
    match v {
        GraphValue::Array(items) => Ok(items),
        _ => Err(ChronError::Malformed("expected an array atom")),
    }
}

fn cursor_to_graph(c: Cursor) -> GraphValue {
    let key = match c.anchor {
        Anchor::Entry(id) => id.key,
        Anchor::Key(k) => k,
    };
    GraphValue::PlainObject(vec![
        ("key".into(), GraphValue::Int(key as i64)),
        ("before".into(), GraphValue::Bool(matches!(c.offset, Offset::Before))),
    ])
}

fn graph_to_cursor(g: &GraphValue) -> Result<Cursor> {
    let fields = match g {
        GraphValue::PlainObject(f) => f,
        _ => return Err(ChronError::Malformed("expected a cursor object")),
    };
    let key = as_int(find_field(fields, "key")?)? as u32;
    let before = as_bool(find_field(fields, "before")?)?;
    Ok(Cursor::new(Anchor::Key(key), if before { Offset::Before } else { Offset::After }))
}

fn text_to_graph(chron: &Chron<char>) -> GraphValue {
    let entries: Vec<GraphValue> = chron
        .range_all()
        .map(|e| {
            let value = match e.atom.as_value() {
                Some(ch) => GraphValue::Str(SmartString::from(ch.to_string())),
                None => GraphValue::Null,
            };
            GraphValue::PlainObject(vec![("key".into(), GraphValue::Int(e.key as i64)), ("value".into(), value)])
        })
        .collect();
    GraphValue::Typed { tag: "Text".into(), fields: vec![GraphValue::Array(entries)] }
}

fn graph_to_text(g: &GraphValue) -> Result<Chron<char>> {
    let (tag, fields) = typed(g)?;
    if tag != "Text" {
        return Err(ChronError::Malformed("expected a Text object"));
    }
    let entries = as_array(&fields[0])?;
    let mut chron: Chron<char> = Chron::new();
    for entry in entries {
        let kv = match entry {
            GraphValue::PlainObject(kv) => kv,
            _ => return Err(ChronError::Malformed("expected a Text entry object")),
        };
        let key = as_int(find_field(kv, "key")?)? as u32;
        let value = find_field(kv, "value")?;
        let tail = chron.tail();
        match value {
            GraphValue::Str(s) => {
                let ch = s.chars().next().ok_or(ChronError::Malformed("Text entry string is empty"))?;
                chron = chron.insert(tail, ch, Some(key));
            }
            GraphValue::Null => {
                chron = chron.insert(tail, '\u{0}', Some(key));
                let id = chron.anchor_of(chron.tail()).expect("just inserted").id();
                chron = chron.delete(id);
            }
            _ => return Err(ChronError::Malformed("Text entry value must be a string or null")),
        }
    }
    Ok(chron)
}

fn markup_to_graph(markup: &ChronMarkup<SmartString>) -> GraphValue {
    let markers: Vec<GraphValue> = markup
        .iter_markers()
        .filter_map(|m| {
            m.range.map(|r| {
                GraphValue::PlainObject(vec![
                    ("data".into(), GraphValue::Str(m.data.clone())),
                    ("head".into(), cursor_to_graph(r.head)),
                    ("tail".into(), cursor_to_graph(r.tail)),
                ])
            })
        })
        .collect();
    GraphValue::Typed { tag: "Markup".into(), fields: vec![GraphValue::Array(markers)] }
}

fn graph_to_markup(g: &GraphValue) -> Result<ChronMarkup<SmartString>> {
    let (tag, fields) = typed(g)?;
    if tag != "Markup" {
        return Err(ChronError::Malformed("expected a Markup object"));
    }
    let markers = as_array(&fields[0])?;
    let mut markup: ChronMarkup<SmartString> = ChronMarkup::new();
    for marker in markers {
        let kv = match marker {
            GraphValue::PlainObject(kv) => kv,
            _ => return Err(ChronError::Malformed("expected a Markup entry object")),
        };
        let data = as_str(find_field(kv, "data")?)?.clone();
        let head = graph_to_cursor(find_field(kv, "head")?)?;
        let tail = graph_to_cursor(find_field(kv, "tail")?)?;
        markup = markup.mark(data, Range::new(head, tail));
    }
    Ok(markup)
}

fn slot_to_graph(slot: &Slot) -> GraphValue {
    match slot {
        Slot::None => GraphValue::Null,
        Slot::Ref(r) => GraphValue::Typed { tag: "Ref".into(), fields: vec![GraphValue::Str(SmartString::from(r.as_str()))] },
        Slot::Value(Value::Primitive(Primitive::Bool(b))) => GraphValue::Bool(*b),
        Slot::Value(Value::Primitive(Primitive::I64(n))) => GraphValue::Int(*n),
        Slot::Value(Value::Primitive(Primitive::F64(f))) => GraphValue::Float(*f),
        Slot::Value(Value::Primitive(Primitive::Str(s))) => GraphValue::Str(s.clone()),
        Slot::Value(Value::Text(chron)) => text_to_graph(chron),
        Slot::Value(Value::Markup(markup)) => markup_to_graph(markup),
    }
}

fn slot_from_graph(g: &GraphValue) -> Result<Slot> {
    match g {
        GraphValue::Null => Ok(Slot::None),
        GraphValue::Bool(b) => Ok(Slot::Value(Value::Primitive(Primitive::Bool(*b)))),
        GraphValue::Int(n) => Ok(Slot::Value(Value::Primitive(Primitive::I64(*n)))),
        GraphValue::Float(f) => Ok(Slot::Value(Value::Primitive(Primitive::F64(*f)))),
        GraphValue::Str(s) => Ok(Slot::Value(Value::Primitive(Primitive::Str(s.clone())))),
        GraphValue::Typed { tag, .. } if tag == "Ref" => {
            let (_, fields) = typed(g)?;
            Ok(Slot::Ref(Ref::new(as_str(&fields[0])?.clone())))
        }
        GraphValue::Typed { tag, .. } if tag == "Text" => Ok(Slot::Value(Value::Text(graph_to_text(g)?))),
        GraphValue::Typed { tag, .. } if tag == "Markup" => Ok(Slot::Value(Value::Markup(graph_to_markup(g)?))),
        _ => Err(ChronError::Malformed("unrecognized slot value")),
    }
}

fn typed(g: &GraphValue) -> Result<(&SmartString, &Vec<GraphValue>)> {
    match g {
        GraphValue::Typed { tag, fields } => Ok((tag, fields)),
        _ => Err(ChronError::Malformed("expected a typed object")),
    }
}

fn model_to_graph(model: &Model) -> GraphValue {
    let slots: Vec<GraphValue> = model.writes.iter().map(slot_to_graph).collect();
    GraphValue::Typed {
        tag: "Model".into(),
        fields: vec![GraphValue::Str(SmartString::from(model.id.as_str())), GraphValue::Str(model.class_name.into()), GraphValue::Array(slots)],
    }
}

/// `encode`'s domain-level entry point: flatten this World's own local
/// Models into a graph. Callers serializing a whole chain should
/// `WaveApp::flatten` first - this only walks `world`'s own local shadow
/// map, not its ancestors.
pub fn world_to_graph(world: &World) -> GraphValue {
    let models: Vec<GraphValue> = world.local_ids().into_iter().filter_map(|id| world.bind(&id).ok()).map(|m| model_to_graph(&m)).collect();
    GraphValue::Typed { tag: "World".into(), fields: vec![GraphValue::Array(models)] }
}

/// `decode`'s domain-level entry point: rebuild a fresh root World from a
/// decoded graph, resolving each Model's class name through `resolve_class`
/// (typically `TypeRegistry::resolve_name`) to recover the `&'static str`
/// every `Model` carries in memory.
pub fn graph_to_world(g: &GraphValue, resolve_class: impl Fn(&str) -> Option<&'static str>) -> Result<World> {
    let (tag, fields) = typed(g)?;
    if tag != "World" {
        return Err(ChronError::Malformed("expected a World object"));
    }
    let models = as_array(&fields[0])?;
    let world = World::new();
    for m in models {
        let (mtag, mfields) = typed(m)?;
        if mtag != "Model" {
            return Err(ChronError::Malformed("expected a Model object"));
        }
        let id = Ref::new(as_str(&mfields[0])?.clone());
        let class_str = as_str(&mfields[1])?;
        let class_name = resolve_class(class_str).ok_or(ChronError::Malformed("unregistered model class"))?;
        let slots = as_array(&mfields[2])?;
        let mut model = Model::new(id, class_name, slots.len());
        for (i, s) in slots.iter().enumerate() {
            model.writes[i] = slot_from_graph(s)?;
        }
        world.install_model(model);
    }
    Ok(world)
}
