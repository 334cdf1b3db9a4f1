use smallvec::SmallVec;

use crate::message::Category;

/// Width of one transport read. Messages shorter than this are padded.
pub const RAW_EVENT_WIDTH: usize = 4;

/// Filler written into unused positions of a raw read. Readers must not give
/// it any meaning; positions past the end of a read also report this value.
pub const PAD_BYTE: u8 = 0x00;

/// One fixed-width read from a transport: a status byte, its data bytes and
/// whatever padding the transport left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    bytes: SmallVec<[u8; RAW_EVENT_WIDTH]>,
}

impl RawEvent {
    pub fn new(bytes: [u8; RAW_EVENT_WIDTH]) -> Self {
        RawEvent {
            bytes: SmallVec::from_buf(bytes),
        }
    }

    /// A read of arbitrary width, for transports that do not use
    /// [`RAW_EVENT_WIDTH`].
    pub fn from_slice(bytes: &[u8]) -> Self {
        RawEvent {
            bytes: SmallVec::from_slice(bytes),
        }
    }

    /// Copies `chunk` into a full-width read, padding the tail.
    pub fn padded(chunk: &[u8]) -> Self {
        let mut bytes = [PAD_BYTE; RAW_EVENT_WIDTH];
        let len = chunk.len().min(RAW_EVENT_WIDTH);
        bytes[..len].copy_from_slice(&chunk[..len]);
        RawEvent::new(bytes)
    }

    /// Splits a complete message into the padded fixed-width reads a
    /// slot-based transport would deliver.
    pub fn chunks(message: &[u8]) -> impl Iterator<Item = RawEvent> + '_ {
        message.chunks(RAW_EVENT_WIDTH).map(RawEvent::padded)
    }

    pub fn status(&self) -> u8 {
        self.byte(0)
    }

    /// Byte at `index`, or [`PAD_BYTE`] past the end of the read.
    pub fn byte(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or(PAD_BYTE)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// The two data bytes of a short message in `category`.
    ///
    /// Two-data categories keep positions 1 and 2 and drop the trailing pad.
    /// One-data categories drop the single pad slot at position 2, so the byte
    /// at position 3 moves up into the second data slot. Consumers of the
    /// three-byte shape depend on that byte being passed through untouched.
    pub fn short_data(&self, category: Category) -> [u8; 2] {
        match category.data_len() {
            1 => [self.byte(1), self.byte(3)],
            _ => [self.byte(1), self.byte(2)],
        }
    }
}

impl From<[u8; RAW_EVENT_WIDTH]> for RawEvent {
    fn from(bytes: [u8; RAW_EVENT_WIDTH]) -> Self {
        RawEvent::new(bytes)
    }
}

impl From<&[u8]> for RawEvent {
    fn from(bytes: &[u8]) -> Self {
        RawEvent::from_slice(bytes)
    }
}
