use std::fmt;
use serde::{Deserialize, Serialize};

/// An address in the simulated address space
///
/// For byte accesses this is a byte address. For 16 and 32-bit accesses it is the index of an
/// element of that width, so element `a` occupies bytes `a * size .. (a + 1) * size` of the
/// backing store
pub type Address = u64;

/// The width of a client access. Only one width is active for a given hierarchy
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessWidth {
    #[default]
    #[serde(alias = "8")]
    Byte,
    #[serde(alias = "16")]
    Half,
    #[serde(alias = "32")]
    Word,
}

impl AccessWidth {
    /// Size of one element in bytes
    pub const fn size(self) -> u64 {
        match self {
            AccessWidth::Byte => 1,
            AccessWidth::Half => 2,
            AccessWidth::Word => 4,
        }
    }

    /// Number of elements of this width held by a line of `line_size` bytes
    pub const fn elements_per_line(self, line_size: u64) -> u64 {
        line_size / self.size()
    }

    /// Largest value an element of this width can hold
    pub const fn max_value(self) -> u32 {
        match self {
            AccessWidth::Byte => u8::MAX as u32,
            AccessWidth::Half => u16::MAX as u32,
            AccessWidth::Word => u32::MAX,
        }
    }

    /// Reads a big-endian element starting at `offset`
    pub fn load(self, bytes: &[u8], offset: usize) -> u32 {
        match self {
            AccessWidth::Byte => bytes[offset] as u32,
            AccessWidth::Half => u16::from_be_bytes([bytes[offset], bytes[offset + 1]]) as u32,
            AccessWidth::Word => u32::from_be_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]),
        }
    }

    /// Writes `value` big-endian starting at `offset`, discarding bits above the width
    pub fn store(self, bytes: &mut [u8], offset: usize, value: u32) {
        match self {
            AccessWidth::Byte => bytes[offset] = value as u8,
            AccessWidth::Half => bytes[offset..offset + 2].copy_from_slice(&(value as u16).to_be_bytes()),
            AccessWidth::Word => bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes()),
        }
    }
}

impl fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.size() * 8)
    }
}

/// The components of an address as seen by one cache level
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AddressParts {
    /// Every bit above the in-line offset, including the set bits
    pub tag: u64,
    pub set: usize,
    /// Element offset within the line
    pub offset: u64,
}

/// How a cache level splits addresses of a given width
///
/// The set index is always taken from the byte-line bits selected by the set mask, while the tag
/// and offset masks depend on the width: a narrower element reserves fewer low bits as offset,
/// as each tag covers `line_size / element_size` addressable elements
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AddressLayout {
    width: AccessWidth,
    line_bits: u32,
    set_mask: u64,
    offset_mask: u64,
}

impl AddressLayout {
    pub fn new(width: AccessWidth, line_size: u64, set_mask: u64) -> Self {
        Self {
            width,
            line_bits: line_size.trailing_zeros(),
            set_mask,
            offset_mask: width.elements_per_line(line_size) - 1,
        }
    }

    pub fn width(&self) -> AccessWidth {
        self.width
    }

    pub fn set_mask(&self) -> u64 {
        self.set_mask
    }

    pub fn tag_mask(&self) -> u64 {
        !self.offset_mask
    }

    pub fn offset_mask(&self) -> u64 {
        self.offset_mask
    }

    #[inline(always)]
    pub fn set_index(&self, address: Address) -> usize {
        ((address & self.set_mask) >> self.line_bits) as usize
    }

    #[inline(always)]
    pub fn tag(&self, address: Address) -> u64 {
        address & self.tag_mask()
    }

    /// Byte offset of the addressed element inside its line
    #[inline(always)]
    pub fn byte_offset(&self, address: Address) -> usize {
        ((address & self.offset_mask) * self.width.size()) as usize
    }

    /// Line aligned byte address of the line holding `address`, as used by the backing store
    pub fn line_byte_address(&self, address: Address) -> u64 {
        (address >> self.offset_mask.count_ones()) << self.line_bits
    }

    pub fn split(&self, address: Address) -> AddressParts {
        AddressParts {
            tag: self.tag(address),
            set: self.set_index(address),
            offset: address & self.offset_mask,
        }
    }

    /// Reassembles an address from its parts. The set index is contained in the tag, so it is
    /// only checked in debug builds
    pub fn join(&self, parts: AddressParts) -> Address {
        let address = parts.tag | parts.offset;
        debug_assert_eq!(self.set_index(address), parts.set);
        address
    }
}
