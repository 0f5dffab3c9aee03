//! Pass 1 (predecode) and pass 2 (decode) over an encoded stream (spec
//! section 4.4). Predecode walks every pooled object once to record its
//! body's byte offset without resolving pointers; decode then resolves each
//! object on demand, memoizing by rank so a forward reference to an
//! as-yet-undecoded object recurses into it immediately rather than
//! requiring back-patching.
//!
//! `GraphValue` is an owned value tree, so unlike the source's
//! allocate-shells-then-populate scheme this can't represent a genuine
//! cycle; `resolve` detects one via `in_progress` and reports it as
//! `Malformed` rather than recursing forever. None of this runtime's own
//! types (World/Model/Chron/ChronMarkup) are ever cyclic, so this doesn't
//! lose any coverage for the graphs this codec actually serializes.

use super::atom::{AtomTag, HeadReader};
use super::graph::GraphValue;
use super::varint::{join_signed, read_string, read_varint};
use crate::error::{ChronError, Result};
use crate::world::World;
use crc::{Crc, CRC_32_ISO_HDLC};
use std::collections::HashSet;
use std::convert::TryFrom;

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

fn skip_atom(body: &[u8], pos: &mut usize) -> Result<()> {
    let tag_byte = *body.get(*pos).ok_or(ChronError::Malformed("atom tag truncated"))?;
    *pos += 1;
    let tag = AtomTag::try_from(tag_byte).map_err(|_| ChronError::UnknownType(tag_byte as u32))?;
    match tag {
        AtomTag::Pointer | AtomTag::PositiveInt | AtomTag::NegativeInt => {
            read_varint(body, pos)?;
        }
        AtomTag::Float64 => {
            if *pos + 8 > body.len() {
                return Err(ChronError::Malformed("float64 atom truncated"));
            }
            *pos += 8;
        }
        AtomTag::Str => {
            read_string(body, pos)?;
        }
        AtomTag::Undefined | AtomTag::True | AtomTag::False | AtomTag::Null => {}
        _ => return Err(ChronError::Malformed("composite tag found where an inline atom was expected")),
    }
    Ok(())
}

fn skip_body(body: &[u8], pos: &mut usize, tag: AtomTag) -> Result<()> {
    match tag {
        AtomTag::Array => {
            let n = read_varint(body, pos)?;
            for _ in 0..n {
                skip_atom(body, pos)?;
            }
        }
        AtomTag::PlainObject => {
            let n = read_varint(body, pos)?;
            for _ in 0..n {
                read_string(body, pos)?;
                skip_atom(body, pos)?;
            }
        }
        AtomTag::Object => {
            read_string(body, pos)?;
            let n = read_varint(body, pos)?;
            for _ in 0..n {
                skip_atom(body, pos)?;
            }
        }
        AtomTag::Str => {
            read_string(body, pos)?;
        }
        _ => return Err(ChronError::Malformed("unexpected tag in pooled object table")),
    }
    Ok(())
}

fn predecode(body: &[u8], tags: &[AtomTag]) -> Result<Vec<usize>> {
    let mut offsets = Vec::with_capacity(tags.len());
    let mut pos = 0usize;
    for &tag in tags {
        offsets.push(pos);
        skip_body(body, &mut pos, tag)?;
    }
    Ok(offsets)
}

fn decode_atom(
    body: &[u8],
    pos: &mut usize,
    tags: &[AtomTag],
    offsets: &[usize],
    decoded: &mut [Option<GraphValue>],
    in_progress: &mut HashSet<usize>,
) -> Result<GraphValue> {
    let tag_byte = *body.get(*pos).ok_or(ChronError::Malformed("atom tag truncated"))?;
    *pos += 1;
    let tag = AtomTag::try_from(tag_byte).map_err(|_| ChronError::UnknownType(tag_byte as u32))?;
    match tag {
        AtomTag::Pointer => {
            let rank = read_varint(body, pos)? as usize;
            resolve(rank, body, tags, offsets, decoded, in_progress)
        }
        AtomTag::PositiveInt => Ok(GraphValue::Int(join_signed(false, read_varint(body, pos)?))),
        AtomTag::NegativeInt => Ok(GraphValue::Int(join_signed(true, read_varint(body, pos)?))),
        AtomTag::Float64 => {
            let bytes = body.get(*pos..*pos + 8).ok_or(ChronError::Malformed("float64 atom truncated"))?;
            *pos += 8;
            Ok(GraphValue::Float(f64::from_le_bytes(bytes.try_into().expect("slice of len 8"))))
        }
        AtomTag::Str => Ok(GraphValue::Str(read_string(body, pos)?.into())),
        AtomTag::Undefined => Ok(GraphValue::Undefined),
        AtomTag::True => Ok(GraphValue::Bool(true)),
        AtomTag::False => Ok(GraphValue::Bool(false)),
        AtomTag::Null => Ok(GraphValue::Null),
        _ => Err(ChronError::Malformed("composite tag found where an inline atom was expected")),
    }
}

fn resolve(
    rank: usize,
    body: &[u8],
    tags: &[AtomTag],
    offsets: &[usize],
    decoded: &mut [Option<GraphValue>],
    in_progress: &mut HashSet<usize>,
) -> Result<GraphValue> {
    if let Some(v) = &decoded[rank] {
        return Ok(v.clone());
    }
    if !in_progress.insert(rank) {
        return Err(ChronError::Malformed("cyclic object reference is not supported"));
    }
    let tag = *tags.get(rank).ok_or(ChronError::Malformed("pointer rank out of range"))?;
    let mut pos = offsets[rank];
    let value = match tag {
        AtomTag::Array => {
            let n = read_varint(body, &mut pos)?;
            let mut items = Vec::with_capacity(n as usize);
            for _ in 0..n {
                items.push(decode_atom(body, &mut pos, tags, offsets, decoded, in_progress)?);
            }
            GraphValue::Array(items)
        }
        AtomTag::PlainObject => {
            let n = read_varint(body, &mut pos)?;
            let mut fields = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let key = read_string(body, &mut pos)?;
                let val = decode_atom(body, &mut pos, tags, offsets, decoded, in_progress)?;
                fields.push((key.into(), val));
            }
            GraphValue::PlainObject(fields)
        }
        AtomTag::Object => {
            let object_tag = read_string(body, &mut pos)?;
            let n = read_varint(body, &mut pos)?;
            let mut fields = Vec::with_capacity(n as usize);
            for _ in 0..n {
                fields.push(decode_atom(body, &mut pos, tags, offsets, decoded, in_progress)?);
            }
            GraphValue::Typed { tag: object_tag.into(), fields }
        }
        AtomTag::Str => GraphValue::Str(read_string(body, &mut pos)?.into()),
        _ => return Err(ChronError::Malformed("unexpected tag in pooled object table")),
    };
    in_progress.remove(&rank);
    decoded[rank] = Some(value.clone());
    Ok(value)
}

pub fn decode_graph(bytes: &[u8]) -> Result<GraphValue> {
    let payload_len = bytes.len().checked_sub(4).ok_or(ChronError::Malformed("stream shorter than its checksum trailer"))?;
    let (bytes, trailer) = bytes.split_at(payload_len);
    let expected = u32::from_le_bytes(trailer.try_into().expect("split_at(len - 4) leaves a 4-byte tail"));
    if CHECKSUM.checksum(bytes) != expected {
        return Err(ChronError::ChecksumMismatch);
    }

    let mut pos = 0usize;
    let _atom_count = read_varint(bytes, &mut pos)?;
    let object_count = read_varint(bytes, &mut pos)? as usize;
    let root_pointer = read_varint(bytes, &mut pos)? as usize;
    if object_count == 0 {
        return Err(ChronError::Malformed("object table is empty"));
    }

    let head_len = (object_count + 1) / 2;
    let head_bytes = bytes.get(pos..pos + head_len).ok_or(ChronError::Malformed("head array truncated"))?;
    pos += head_len;
    let mut head_reader = HeadReader::new(head_bytes, object_count);
    let mut tags = Vec::with_capacity(object_count);
    for _ in 0..object_count {
        tags.push(head_reader.next_tag()?);
    }

    let body = &bytes[pos..];
    let offsets = predecode(body, &tags)?;

    let mut decoded: Vec<Option<GraphValue>> = vec![None; object_count];
    let mut in_progress = HashSet::new();
    resolve(root_pointer, body, &tags, &offsets, &mut decoded, &mut in_progress)
}

pub fn decode(bytes: &[u8], resolve_class: impl Fn(&str) -> Option<&'static str>) -> Result<World> {
    let graph = decode_graph(bytes)?;
    super::graph::graph_to_world(&graph, resolve_class)
}
