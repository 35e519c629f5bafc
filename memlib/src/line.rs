use crate::address::Address;

/// Default line size in bytes
pub const LINE_SIZE: u64 = 64;

/// The unit of transfer between cache levels and the backing store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    bytes: Box<[u8]>,
}

impl Line {
    pub fn zeroed(line_size: usize) -> Self {
        Self {
            bytes: vec![0; line_size].into_boxed_slice(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&[u8]> for Line {
    fn from(value: &[u8]) -> Self {
        Self {
            bytes: value.into(),
        }
    }
}

/// Bookkeeping for a single slot of a set. The bytes of the slot live in the owning level's buffer
///
/// When `valid` is false the tag and bytes are meaningless. `dirty` implies `valid`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineState {
    /// The masked address of the line held by the slot
    pub tag: Address,
    pub valid: bool,
    /// Written since it was installed, so it has to be written back before reuse
    pub dirty: bool,
    /// Probes of the set since this slot was last hit or installed
    pub age: u32,
    /// Hits and installs of this slot over the whole run
    pub use_count: u32,
}
