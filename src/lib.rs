//! Framing layer for a MIDI endpoint.
//!
//! Transports deliver fixed-width reads; [`FrameParser`] turns them into
//! [`MidiMessage`]s, reassembling SysEx that spans several reads, and
//! [`Connection`] drives the read side and encodes outbound messages.

pub mod connection;
pub mod error;
pub mod message;
pub mod parser;
pub mod raw;
pub mod registry;
pub mod transport;

pub use connection::{Connection, Delivery, Drain};
pub use error::{Error, Result, SysexFault};
pub use message::{Category, MidiMessage, SysEx};
pub use parser::{parse_next, FrameParser};
pub use raw::{RawEvent, RAW_EVENT_WIDTH};
pub use registry::{Direction, MidirRegistry, PortRegistry};
pub use transport::{InputTransport, OutputTransport};
