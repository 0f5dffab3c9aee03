//! Pass 1 (index) and pass 2 (encode) over a `GraphValue` tree (spec section
//! 4.4). Stream layout: `varint(atomCount) varint(objectCount)
//! varint(rootPointer)`, a packed 4-bit head array (one tag per pooled
//! object, in rank order), then each object's body, also in rank order.

use super::atom::{AtomTag, HeadArray};
use super::graph::{is_indexable, GraphValue};
use super::varint::{split_signed, write_string, write_varint};
use crate::world::World;
use crc::{Crc, CRC_32_ISO_HDLC};
use std::collections::HashMap;

/// Checksum algorithm for the stream trailer, matching the teacher's own
/// page/WAL checksums in `storage/wal.rs`/`storage/page.rs`.
const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

fn index(v: &GraphValue, counts: &mut HashMap<GraphValue, (u32, usize)>, next_order: &mut usize) {
    if is_indexable(v) {
        counts
            .entry(v.clone())
            .and_modify(|(count, _)| *count += 1)
            .or_insert_with(|| {
                let order = *next_order;
                *next_order += 1;
                (1, order)
            });
    }
    match v {
        GraphValue::Array(items) => items.iter().for_each(|it| index(it, counts, next_order)),
        GraphValue::PlainObject(fields) => fields.iter().for_each(|(_, val)| index(val, counts, next_order)),
        GraphValue::Typed { fields, .. } => fields.iter().for_each(|f| index(f, counts, next_order)),
        _ => {}
    }
}

fn atom_tag_of(v: &GraphValue) -> AtomTag {
    match v {
        GraphValue::Array(_) => AtomTag::Array,
        GraphValue::PlainObject(_) => AtomTag::PlainObject,
        GraphValue::Typed { .. } => AtomTag::Object,
        GraphValue::Str(_) => AtomTag::Str,
        _ => AtomTag::Unknown,
    }
}

/// Emit one value in whatever position it occurs (array element, object
/// field, typed field): a `Pointer` to its rank if it was pooled, otherwise
/// its literal atom.
fn encode_atom(v: &GraphValue, pointer_of: &HashMap<GraphValue, usize>, buf: &mut Vec<u8>, atom_count: &mut u64) {
    *atom_count += 1;
    if is_indexable(v) {
        if let Some(&rank) = pointer_of.get(v) {
            buf.push(AtomTag::Pointer.into());
            write_varint(buf, rank as u64);
            return;
        }
    }
    match v {
        GraphValue::Undefined => buf.push(AtomTag::Undefined.into()),
        GraphValue::Null => buf.push(AtomTag::Null.into()),
        GraphValue::Bool(true) => buf.push(AtomTag::True.into()),
        GraphValue::Bool(false) => buf.push(AtomTag::False.into()),
        GraphValue::Int(n) => {
            let (negative, magnitude) = split_signed(*n);
            buf.push((if negative { AtomTag::NegativeInt } else { AtomTag::PositiveInt }).into());
            write_varint(buf, magnitude);
        }
        GraphValue::Float(f) => {
            buf.push(AtomTag::Float64.into());
            buf.extend_from_slice(&f.to_le_bytes());
        }
        GraphValue::Str(s) => {
            buf.push(AtomTag::Str.into());
            write_string(buf, s);
        }
        GraphValue::Array(_) | GraphValue::PlainObject(_) | GraphValue::Typed { .. } => {
            unreachable!("every composite is registered as a pooled object before encoding starts")
        }
    }
}

/// Write a pooled object's own body - its fields, each through
/// `encode_atom` so repeated sub-objects collapse to pointers.
fn encode_body(v: &GraphValue, pointer_of: &HashMap<GraphValue, usize>, buf: &mut Vec<u8>, atom_count: &mut u64) {
    match v {
        GraphValue::Array(items) => {
            write_varint(buf, items.len() as u64);
            for it in items {
                encode_atom(it, pointer_of, buf, atom_count);
            }
        }
        GraphValue::PlainObject(fields) => {
            write_varint(buf, fields.len() as u64);
            for (key, val) in fields {
                write_string(buf, key);
                encode_atom(val, pointer_of, buf, atom_count);
            }
        }
        GraphValue::Typed { tag, fields } => {
            write_string(buf, tag);
            write_varint(buf, fields.len() as u64);
            for f in fields {
                encode_atom(f, pointer_of, buf, atom_count);
            }
        }
        GraphValue::Str(s) => write_string(buf, s),
        _ => unreachable!("only indexable kinds ever get a pooled body"),
    }
}

/// Encode an arbitrary graph value. `encode` (the public, World-level entry
/// point in `codec::mod`) builds the graph via `graph::world_to_graph` and
/// calls this.
pub fn encode_graph(root: &GraphValue) -> Vec<u8> {
    let mut counts: HashMap<GraphValue, (u32, usize)> = HashMap::new();
    let mut next_order = 0usize;
    index(root, &mut counts, &mut next_order);

    let mut unique: Vec<GraphValue> = counts.keys().cloned().collect();
    unique.sort_by(|a, b| {
        let (count_a, order_a) = counts[a];
        let (count_b, order_b) = counts[b];
        count_b.cmp(&count_a).then(order_a.cmp(&order_b))
    });
    let pointer_of: HashMap<GraphValue, usize> = unique.iter().cloned().enumerate().map(|(i, v)| (v, i)).collect();

    let mut head = HeadArray::new();
    let mut body = Vec::new();
    let mut atom_count: u64 = 0;
    for obj in &unique {
        head.push(atom_tag_of(obj));
        atom_count += 1;
        encode_body(obj, &pointer_of, &mut body, &mut atom_count);
    }
    let root_pointer = pointer_of.get(root).copied().unwrap_or(0);

    let mut out = Vec::new();
    write_varint(&mut out, atom_count);
    write_varint(&mut out, unique.len() as u64);
    write_varint(&mut out, root_pointer as u64);
    out.extend_from_slice(&head.finish());
    out.extend_from_slice(&body);

    let checksum = CHECKSUM.checksum(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

pub fn encode(world: &World) -> Vec<u8> {
    encode_graph(&super::graph::world_to_graph(world))
}
