use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    message::{MidiMessage, SysEx, CONTROL_CHANGE},
    parser::FrameParser,
    registry::PortRegistry,
    transport::{InputTransport, MidirInput, MidirOutput, OutputTransport},
};

pub const MAX_CHANNEL: u8 = 15;

/// Result of a [`Connection::drain`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Number of messages handed to the handler.
    Messages(usize),
    NoInput,
}

/// Result of a send on a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Written,
    /// Nothing was written because no output port is attached.
    NoOutput,
}

/// An input and an output port, either of which may be absent. Which sides are
/// attached is decided at construction and never changes.
pub struct Connection<I = MidirInput, O = MidirOutput> {
    input: Option<I>,
    output: Option<O>,
    parser: FrameParser,
}

impl<I, O> Connection<I, O>
where
    I: InputTransport,
    O: OutputTransport,
{
    pub fn new(input: Option<I>, output: Option<O>) -> Self {
        Connection {
            input,
            output,
            parser: FrameParser::default(),
        }
    }

    /// Opens ports by name. A name that the registry does not know leaves
    /// that side detached; any other failure is returned.
    pub fn open<R>(
        registry: &mut R,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> Result<Self>
    where
        R: PortRegistry<Input = I, Output = O>,
    {
        let input = absorb_missing(input_name.map(|name| registry.find_input(name)))?;
        let output = absorb_missing(output_name.map(|name| registry.find_output(name)))?;
        Ok(Self::new(input, output))
    }

    pub fn with_parser(mut self, parser: FrameParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn input(&self) -> Option<&I> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&O> {
        self.output.as_ref()
    }

    /// True iff a read is waiting on the input. Always false without an input.
    pub fn poll_ready(&mut self) -> Result<bool> {
        match self.input.as_mut() {
            Some(input) => input.poll(),
            None => Ok(false),
        }
    }

    /// Hands every message that is already waiting to `handler`, then returns.
    /// Only blocks while a SysEx message is still arriving.
    pub fn drain<F>(&mut self, mut handler: F) -> Result<Drain>
    where
        F: FnMut(MidiMessage),
    {
        let Some(input) = self.input.as_mut() else {
            debug!("MIDI input not connected.");
            return Ok(Drain::NoInput);
        };

        let mut count = 0;
        while input.poll()? {
            let message = self.parser.parse_next(input)?;
            handler(message);
            count += 1;
        }
        Ok(Drain::Messages(count))
    }

    /// Writes a three-byte message exactly as given.
    pub fn send_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<Delivery> {
        let Some(output) = self.output.as_mut() else {
            warn!("MIDI output not connected.");
            return Ok(Delivery::NoOutput);
        };
        output.write_short(status, data1, data2)?;
        Ok(Delivery::Written)
    }

    pub fn send_control_change(
        &mut self,
        channel: u8,
        controller: u8,
        value: u8,
    ) -> Result<Delivery> {
        if channel > MAX_CHANNEL {
            return Err(Error::InvalidChannel(channel));
        }
        self.send_short(CONTROL_CHANGE | channel, controller, value)
    }

    /// Sends `0xF0 ++ header ++ body ++ 0xF7` as a single write. Neither part
    /// may contain `0xF0` or `0xF7`.
    pub fn send_sysex(&mut self, header: &[u8], body: &[u8]) -> Result<Delivery> {
        let sysex = SysEx::encode(header, body)?;
        let Some(output) = self.output.as_mut() else {
            warn!("MIDI output not connected.");
            return Ok(Delivery::NoOutput);
        };
        output.write_sysex(sysex.as_bytes())?;
        Ok(Delivery::Written)
    }

    /// Closes both ports. Any later read or write fails with `TransportClosed`.
    pub fn disconnect(&mut self) {
        if let Some(input) = self.input.as_mut() {
            info!("Closing MIDI input...");
            input.close();
        }
        if let Some(output) = self.output.as_mut() {
            info!("Closing MIDI output...");
            output.close();
        }
    }
}

fn absorb_missing<T>(lookup: Option<Result<T>>) -> Result<Option<T>> {
    match lookup {
        None => Ok(None),
        Some(Ok(port)) => Ok(Some(port)),
        Some(Err(err @ Error::PortNotFound { .. })) => {
            warn!("{}", err);
            Ok(None)
        }
        Some(Err(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryInput, MemoryOutput, Written};

    type MemoryConnection = Connection<MemoryInput, MemoryOutput>;

    #[test]
    fn drain_stops_when_input_is_empty() {
        let mut input = MemoryInput::new();
        input.push_message(&[0x90, 0x3C, 0x64]);
        input.push_message(&[0x80, 0x3C, 0x00]);
        let mut connection = MemoryConnection::new(Some(input), None);

        let mut received = Vec::new();
        let drained = connection.drain(|m| received.push(m)).unwrap();
        assert_eq!(drained, Drain::Messages(2));
        assert_eq!(received.len(), 2);
        assert!(!connection.poll_ready().unwrap());
        assert_eq!(connection.drain(|_| {}).unwrap(), Drain::Messages(0));
    }

    #[test]
    fn detached_input_reports_no_input() {
        let mut connection = MemoryConnection::new(None, Some(MemoryOutput::new()));
        assert!(!connection.poll_ready().unwrap());
        assert_eq!(connection.drain(|_| {}).unwrap(), Drain::NoInput);
    }

    #[test]
    fn control_change_without_output_is_reported() {
        let mut connection = MemoryConnection::new(None, None);
        assert_eq!(
            connection.send_control_change(0, 0x07, 0x80).unwrap(),
            Delivery::NoOutput
        );
        assert_eq!(
            connection.send_sysex(&[0x01], &[0x02]).unwrap(),
            Delivery::NoOutput
        );
    }

    #[test]
    fn control_change_sets_channel_nibble() {
        let mut connection = MemoryConnection::new(None, Some(MemoryOutput::new()));
        assert_eq!(
            connection.send_control_change(9, 0x07, 0x80).unwrap(),
            Delivery::Written
        );
        assert!(matches!(
            connection.send_control_change(16, 0x07, 0x00),
            Err(Error::InvalidChannel(16))
        ));
        assert_eq!(
            connection.output().unwrap().written(),
            &[Written::Short([0xB9, 0x07, 0x80])]
        );
    }

    #[test]
    fn sysex_is_one_write() {
        let mut connection = MemoryConnection::new(None, Some(MemoryOutput::new()));
        connection
            .send_sysex(&[0x01, 0x02], &[0x11, 0x12, 0x13])
            .unwrap();
        assert_eq!(
            connection.output().unwrap().written(),
            &[Written::Sysex(vec![0xF0, 0x01, 0x02, 0x11, 0x12, 0x13, 0xF7])]
        );
    }

    #[test]
    fn reserved_bytes_fail_before_writing() {
        let mut connection = MemoryConnection::new(None, Some(MemoryOutput::new()));
        assert!(matches!(
            connection.send_sysex(&[0xF0], &[]),
            Err(Error::MalformedSysex(_))
        ));
        assert!(connection.output().unwrap().written().is_empty());
    }

    #[test]
    fn disconnect_closes_both_sides() {
        let mut connection =
            MemoryConnection::new(Some(MemoryInput::new()), Some(MemoryOutput::new()));
        connection.disconnect();
        assert!(connection.input().unwrap().is_closed());
        assert!(matches!(connection.poll_ready(), Err(Error::TransportClosed)));
        assert!(matches!(
            connection.send_short(0x90, 0x3C, 0x64),
            Err(Error::TransportClosed)
        ));
    }
}
