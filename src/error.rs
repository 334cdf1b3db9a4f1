use thiserror::Error;

use crate::registry::Direction;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("MIDI {direction} '{name}' not found")]
    PortNotFound { name: String, direction: Direction },

    /// Any read or write on a port that has been closed, or whose backend went away.
    #[error("MIDI transport closed")]
    TransportClosed,

    #[error("malformed SysEx: {0}")]
    MalformedSysex(SysexFault),

    #[error("MIDI channel {0} out of range (0-15)")]
    InvalidChannel(u8),

    #[error("failed to initialise MIDI backend: {0}")]
    Init(#[from] midir::InitError),

    #[error("failed to query MIDI port: {0}")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("failed to send MIDI message: {0}")]
    Send(#[from] midir::SendError),

    #[error("failed to connect MIDI port: {0}")]
    Connect(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SysexFault {
    #[error("transport closed after {received} bytes without a terminator")]
    Unterminated { received: usize },

    #[error("no terminator within {limit} bytes")]
    TooLong { limit: usize },

    #[error("reserved byte 0x{byte:02X} at position {position}")]
    ReservedByte { byte: u8, position: usize },
}

impl From<SysexFault> for Error {
    fn from(fault: SysexFault) -> Self {
        Error::MalformedSysex(fault)
    }
}
