//! The 4-bit atom tag taxonomy, packed two per byte into the stream's head
//! array (spec section 4.4).

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AtomTag {
    Unknown = 0,
    Pointer = 1,
    PositiveInt = 2,
    NegativeInt = 3,
    Float64 = 4,
    Str = 5,
    Undefined = 6,
    True = 7,
    False = 8,
    Null = 9,
    Array = 10,
    PlainObject = 11,
    Object = 12,
    Map = 13,
    Set = 14,
}

/// Pack two tags into one head byte: `lo` in the low nibble, `hi` in the
/// high nibble.
pub fn pack_nibbles(lo: AtomTag, hi: Option<AtomTag>) -> u8 {
    let lo = u8::from(lo) & 0x0f;
    let hi = hi.map(u8::from).unwrap_or(0) & 0x0f;
    lo | (hi << 4)
}

pub fn unpack_nibbles(byte: u8) -> (u8, u8) {
    (byte & 0x0f, byte >> 4)
}

/// A head array: one 4-bit tag per atom, two tags per byte.
#[derive(Debug, Default)]
pub struct HeadArray {
    bytes: Vec<u8>,
    pending_lo: Option<AtomTag>,
    len: usize,
}

impl HeadArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: AtomTag) {
        match self.pending_lo.take() {
            None => self.pending_lo = Some(tag),
            Some(lo) => self.bytes.push(pack_nibbles(lo, Some(tag))),
        }
        self.len += 1;
    }

    pub fn finish(mut self) -> Vec<u8> {
        if let Some(lo) = self.pending_lo.take() {
            self.bytes.push(pack_nibbles(lo, None));
        }
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Read-side cursor over a packed head array.
pub struct HeadReader<'a> {
    bytes: &'a [u8],
    index: usize,
    count: usize,
}

impl<'a> HeadReader<'a> {
    pub fn new(bytes: &'a [u8], count: usize) -> Self {
        HeadReader { bytes, index: 0, count }
    }

    pub fn next_tag(&mut self) -> crate::error::Result<AtomTag> {
        if self.index >= self.count {
            return Err(crate::error::ChronError::Malformed("head array exhausted"));
        }
        let byte = self.bytes[self.index / 2];
        let (lo, hi) = unpack_nibbles(byte);
        let nibble = if self.index % 2 == 0 { lo } else { hi };
        self.index += 1;
        AtomTag::try_from_primitive(nibble).map_err(|_| crate::error::ChronError::UnknownType(nibble as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_read_roundtrips() {
        let mut head = HeadArray::new();
        let tags = [AtomTag::Str, AtomTag::PositiveInt, AtomTag::Array, AtomTag::Pointer, AtomTag::True];
        for t in tags {
            head.push(t);
        }
        let bytes = head.finish();
        let mut reader = HeadReader::new(&bytes, tags.len());
        for t in tags {
            assert_eq!(reader.next_tag().unwrap(), t);
        }
    }
}
