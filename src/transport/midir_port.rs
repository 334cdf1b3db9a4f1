use std::sync::mpsc::{self, Receiver, TryRecvError};

use log::{debug, info};
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};

use crate::{
    error::{Error, Result},
    raw::RawEvent,
    transport::{InputTransport, OutputTransport},
};

/// Reads handed over from the midir callback thread.
struct EventQueue {
    rx: Receiver<RawEvent>,
    peeked: Option<RawEvent>,
    closed: bool,
}

impl EventQueue {
    fn new(rx: Receiver<RawEvent>) -> Self {
        EventQueue {
            rx,
            peeked: None,
            closed: false,
        }
    }

    fn poll(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        if self.peeked.is_none() {
            match self.rx.try_recv() {
                Ok(event) => self.peeked = Some(event),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Err(Error::TransportClosed),
            }
        }
        Ok(self.peeked.is_some())
    }

    fn read_one(&mut self) -> Result<RawEvent> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        match self.peeked.take() {
            Some(event) => Ok(event),
            None => self.rx.recv().map_err(|_| Error::TransportClosed),
        }
    }

    /// Reads still buffered from before the close are dropped.
    fn close(&mut self) {
        self.closed = true;
        self.peeked = None;
        while self.rx.try_recv().is_ok() {}
    }
}

/// A midir input connection. midir hands over whole messages on its own
/// thread; they are cut into padded fixed-width reads and queued for the
/// caller's thread.
pub struct MidirInput {
    name: String,
    // None once closed
    connection: Option<MidiInputConnection<()>>,
    queue: EventQueue,
}

impl MidirInput {
    pub fn connect(midi_in: MidiInput, port: &MidiInputPort, name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                port,
                "midi-connection-input",
                move |_stamp, midi_bytes, _| {
                    for event in RawEvent::chunks(midi_bytes) {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                },
                (),
            )
            .map_err(|e| Error::Connect(format!("{name}: {e}")))?;

        info!("MIDI connection open, reading input from '{}'", name);
        Ok(MidirInput {
            name: name.to_owned(),
            connection: Some(connection),
            queue: EventQueue::new(rx),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl InputTransport for MidirInput {
    fn poll(&mut self) -> Result<bool> {
        self.queue.poll()
    }

    fn read_one(&mut self) -> Result<RawEvent> {
        self.queue.read_one()
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            debug!("Closing midir input '{}'", self.name);
            connection.close();
        }
        self.queue.close();
    }
}

pub struct MidirOutput {
    name: String,
    connection: Option<MidiOutputConnection>,
}

impl MidirOutput {
    pub fn connect(midi_out: MidiOutput, port: &MidiOutputPort, name: &str) -> Result<Self> {
        let connection = midi_out
            .connect(port, "midi-connection-output")
            .map_err(|e| Error::Connect(format!("{name}: {e}")))?;

        info!("MIDI connection open, writing output to '{}'", name);
        Ok(MidirOutput {
            name: name.to_owned(),
            connection: Some(connection),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn connection(&mut self) -> Result<&mut MidiOutputConnection> {
        self.connection.as_mut().ok_or(Error::TransportClosed)
    }
}

impl OutputTransport for MidirOutput {
    fn write_short(&mut self, status: u8, data1: u8, data2: u8) -> Result<()> {
        self.connection()?.send(&[status, data1, data2])?;
        Ok(())
    }

    fn write_sysex(&mut self, bytes: &[u8]) -> Result<()> {
        self.connection()?.send(bytes)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            debug!("Closing midir output '{}'", self.name);
            connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_reads_are_delivered_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut queue = EventQueue::new(rx);
        assert!(!queue.poll().unwrap());

        for event in RawEvent::chunks(&[0xF0, 0x01, 0x02, 0x03, 0xF7]) {
            tx.send(event).unwrap();
        }
        assert!(queue.poll().unwrap());
        assert_eq!(queue.read_one().unwrap().as_slice(), &[0xF0, 0x01, 0x02, 0x03]);
        assert_eq!(queue.read_one().unwrap().as_slice(), &[0xF7, 0x00, 0x00, 0x00]);

        drop(tx);
        assert!(matches!(queue.poll(), Err(Error::TransportClosed)));
    }

    #[test]
    fn close_discards_buffered_reads() {
        let (tx, rx) = mpsc::channel();
        let mut queue = EventQueue::new(rx);
        tx.send(RawEvent::new([0x90, 0x3C, 0x64, 0x00])).unwrap();
        tx.send(RawEvent::new([0x80, 0x3C, 0x00, 0x00])).unwrap();
        assert!(queue.poll().unwrap());

        queue.close();
        assert!(matches!(queue.poll(), Err(Error::TransportClosed)));
        assert!(matches!(queue.read_one(), Err(Error::TransportClosed)));
        // The sender is still alive; closing alone must stop reads.
        tx.send(RawEvent::new([0x90, 0x40, 0x64, 0x00])).unwrap();
        assert!(matches!(queue.read_one(), Err(Error::TransportClosed)));
    }
}
