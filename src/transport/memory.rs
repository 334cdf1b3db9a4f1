//! In-process ports: a scripted input queue and an output that records what
//! was written. Useful for tests and for feeding the parser from sources that
//! are not MIDI devices.

use std::collections::{HashMap, VecDeque};

use crate::{
    error::{Error, Result},
    raw::RawEvent,
    registry::{Direction, PortRegistry},
    transport::{InputTransport, OutputTransport},
};

/// Input port backed by a queue of reads. Reading past the end of the queue
/// behaves like reading from a closed port.
#[derive(Debug, Default)]
pub struct MemoryInput {
    queue: VecDeque<RawEvent>,
    closed: bool,
}

impl MemoryInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events<I, E>(events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<RawEvent>,
    {
        MemoryInput {
            queue: events.into_iter().map(Into::into).collect(),
            closed: false,
        }
    }

    pub fn push(&mut self, event: impl Into<RawEvent>) {
        self.queue.push_back(event.into());
    }

    /// Queues a complete message as padded fixed-width reads.
    pub fn push_message(&mut self, bytes: &[u8]) {
        self.queue.extend(RawEvent::chunks(bytes));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl InputTransport for MemoryInput {
    fn poll(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        Ok(!self.queue.is_empty())
    }

    fn read_one(&mut self) -> Result<RawEvent> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        self.queue.pop_front().ok_or(Error::TransportClosed)
    }

    fn close(&mut self) {
        self.closed = true;
        self.queue.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Short([u8; 3]),
    Sysex(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct MemoryOutput {
    written: Vec<Written>,
    closed: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> &[Written] {
        &self.written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl OutputTransport for MemoryOutput {
    fn write_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<()> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        self.written.push(Written::Short([status, data1, data2]));
        Ok(())
    }

    fn write_sysex(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        self.written.push(Written::Sysex(bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Hands out pre-registered memory ports by name. Each port can be opened once.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inputs: HashMap<String, MemoryInput>,
    outputs: HashMap<String, MemoryOutput>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: impl Into<String>, input: MemoryInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, output: MemoryOutput) -> Self {
        self.outputs.insert(name.into(), output);
        self
    }
}

impl PortRegistry for MemoryRegistry {
    type Input = MemoryInput;
    type Output = MemoryOutput;

    fn find_input(&mut self, name: &str) -> Result<MemoryInput> {
        self.inputs.remove(name).ok_or_else(|| Error::PortNotFound {
            name: name.to_owned(),
            direction: Direction::Input,
        })
    }

    fn find_output(&mut self, name: &str) -> Result<MemoryOutput> {
        self.outputs.remove(name).ok_or_else(|| Error::PortNotFound {
            name: name.to_owned(),
            direction: Direction::Output,
        })
    }
}
