use crate::{error::Result, raw::RawEvent};

pub mod memory;
pub mod midir_port;

pub use memory::{MemoryInput, MemoryOutput, MemoryRegistry, Written};
pub use midir_port::{MidirInput, MidirOutput};

/// Read side of a MIDI port, delivering fixed-width reads.
pub trait InputTransport {
    /// True iff a read is available without blocking.
    fn poll(&mut self) -> Result<bool>;

    /// Next read from the port. May block until one arrives; fails with
    /// `TransportClosed` once the port is gone.
    fn read_one(&mut self) -> Result<RawEvent>;

    fn close(&mut self);
}

/// Write side of a MIDI port.
pub trait OutputTransport {
    fn write_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<()>;

    /// Writes a complete `0xF0 .. 0xF7` frame in one go.
    fn write_sysex(&mut self, bytes: &[u8]) -> Result<()>;

    fn close(&mut self);
}

impl<T: InputTransport + ?Sized> InputTransport for Box<T> {
    fn poll(&mut self) -> Result<bool> {
        (**self).poll()
    }

    fn read_one(&mut self) -> Result<RawEvent> {
        (**self).read_one()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T: OutputTransport + ?Sized> OutputTransport for Box<T> {
    fn write_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<()> {
        (**self).write_short(status, data1, data2)
    }

    fn write_sysex(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_sysex(bytes)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
