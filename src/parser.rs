use log::{debug, trace};

use crate::{
    error::{Error, Result, SysexFault},
    message::{Category, MidiMessage, SysEx, SYSEX_END, SYSEX_START},
    raw::RawEvent,
    transport::InputTransport,
};

pub const DEFAULT_MAX_SYSEX_LEN: usize = 64 * 1024;

/// Turns fixed-width transport reads into complete messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParser {
    max_sysex_len: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        FrameParser {
            max_sysex_len: DEFAULT_MAX_SYSEX_LEN,
        }
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest accepted SysEx frame, markers included. Longer frames are read
    /// through to their terminator and rejected with `TooLong`.
    pub fn with_max_sysex_len(mut self, limit: usize) -> Self {
        self.max_sysex_len = limit;
        self
    }

    pub fn max_sysex_len(&self) -> usize {
        self.max_sysex_len
    }

    /// Reads exactly one message from `transport`. A SysEx start keeps reading
    /// until the terminator arrives, blocking as the transport does.
    pub fn parse_next<T>(&self, transport: &mut T) -> Result<MidiMessage>
    where
        T: InputTransport + ?Sized,
    {
        let event = transport.read_one()?;
        let status = event.status();

        let message = match Category::from_status(status) {
            Some(Category::System) if status == SYSEX_START => {
                MidiMessage::SystemExclusive(self.reassemble(event, transport)?)
            }
            Some(category) if category.is_channel_voice() => {
                MidiMessage::from_short(status, event.short_data(category))
            }
            _ => {
                debug!("Unrecognised status byte 0x{:02X}", status);
                MidiMessage::Unknown(event.to_vec())
            }
        };

        trace!("Parsed {:?}", message);
        Ok(message)
    }

    fn reassemble<T>(&self, first: RawEvent, transport: &mut T) -> Result<SysEx>
    where
        T: InputTransport + ?Sized,
    {
        let mut frame = first.to_vec();
        // Bytes before this offset are known not to contain the terminator.
        let mut scanned = 0;

        loop {
            if let Some(end) = frame[scanned..].iter().rposition(|&b| b == SYSEX_END) {
                frame.truncate(scanned + end + 1);
                if frame.len() > self.max_sysex_len {
                    return Err(self.too_long());
                }
                return Ok(SysEx::from_frame(frame));
            }
            if frame.len() >= self.max_sysex_len {
                skip_to_terminator(transport)?;
                return Err(self.too_long());
            }

            scanned = frame.len();
            let chunk = transport.read_one().map_err(|err| match err {
                Error::TransportClosed => SysexFault::Unterminated {
                    received: frame.len(),
                }
                .into(),
                other => other,
            })?;
            frame.extend_from_slice(chunk.as_slice());
        }
    }

    fn too_long(&self) -> Error {
        SysexFault::TooLong {
            limit: self.max_sysex_len,
        }
        .into()
    }
}

/// Discards reads up to and including the one carrying the terminator, so the
/// next parse starts on a message boundary. A port that closes first has
/// nothing left to resynchronise.
fn skip_to_terminator<T>(transport: &mut T) -> Result<()>
where
    T: InputTransport + ?Sized,
{
    let mut skipped = 0;
    loop {
        match transport.read_one() {
            Ok(chunk) => {
                skipped += chunk.len();
                if chunk.as_slice().contains(&SYSEX_END) {
                    debug!("Skipped {} bytes of oversized SysEx", skipped);
                    return Ok(());
                }
            }
            Err(Error::TransportClosed) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

/// Reads one message with the default parser settings.
pub fn parse_next<T>(transport: &mut T) -> Result<MidiMessage>
where
    T: InputTransport + ?Sized,
{
    FrameParser::default().parse_next(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{message::SYSTEM_MESSAGE, transport::MemoryInput};

    fn input(events: &[[u8; 4]]) -> MemoryInput {
        MemoryInput::with_events(events.iter().copied())
    }

    #[test]
    fn two_data_categories_ignore_pad() {
        for status in [0x80, 0x91, 0xA2, 0xB3, 0xEF] {
            for pad in [0x00, 0x7F, 0xF7] {
                let mut transport = input(&[[status, 0x12, 0x34, pad]]);
                let message = parse_next(&mut transport).unwrap();
                assert_eq!(message.status(), status);
                assert_eq!(message.payload(), vec![0x12, 0x34]);
            }
        }
    }

    #[test]
    fn one_data_categories_keep_shifted_pad() {
        let mut transport = input(&[[0xC4, 0x0A, 0x11, 0x22], [0xD0, 0x40, 0x00, 0x00]]);
        assert_eq!(
            parse_next(&mut transport).unwrap(),
            MidiMessage::ProgramChange {
                channel: 4,
                program: 0x0A,
                carry: 0x22
            }
        );
        assert_eq!(
            parse_next(&mut transport).unwrap(),
            MidiMessage::ChannelPressure {
                channel: 0,
                pressure: 0x40,
                carry: 0x00
            }
        );
    }

    #[test]
    fn terminator_mid_chunk_trims_trailing_pad() {
        let mut transport = input(&[[0xF0, 0x01, 0x02, 0x03], [0x04, 0xF7, 0x00, 0x00]]);
        let message = parse_next(&mut transport).unwrap();
        assert_eq!(message.payload(), vec![0xF0, 0x01, 0x02, 0x03, 0x04, 0xF7]);
        assert_eq!(message.category(), SYSTEM_MESSAGE);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn single_read_sysex() {
        let mut transport = input(&[[0xF0, 0x7D, 0xF7, 0x00]]);
        let MidiMessage::SystemExclusive(sysex) = parse_next(&mut transport).unwrap() else {
            panic!("expected SysEx");
        };
        assert_eq!(sysex.content(), &[0x7D]);
    }

    #[test]
    fn sysex_only_consumes_its_own_reads() {
        let mut transport = input(&[
            [0xF0, 0x01, 0x02, 0x03],
            [0xF7, 0x00, 0x00, 0x00],
            [0x90, 0x3C, 0x64, 0x00],
        ]);
        assert!(matches!(
            parse_next(&mut transport).unwrap(),
            MidiMessage::SystemExclusive(_)
        ));
        assert_eq!(
            parse_next(&mut transport).unwrap(),
            MidiMessage::NoteOn {
                channel: 0,
                note: 0x3C,
                velocity: 0x64
            }
        );
    }

    #[test]
    fn unknown_status_is_carried_verbatim() {
        for raw in [[0xF1, 0x10, 0x00, 0x00], [0xF8, 0x00, 0x00, 0x00], [0x45, 0x01, 0x02, 0x03]] {
            let mut transport = input(&[raw]);
            assert_eq!(
                parse_next(&mut transport).unwrap(),
                MidiMessage::Unknown(raw.to_vec())
            );
        }
    }

    #[test]
    fn closed_transport_mid_sysex_is_malformed() {
        let mut transport = input(&[[0xF0, 0x01, 0x02, 0x03], [0x04, 0x05, 0x06, 0x07]]);
        let err = parse_next(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSysex(SysexFault::Unterminated { received: 8 })
        ));
    }

    #[test]
    fn sysex_longer_than_limit_is_rejected() {
        let mut transport = input(&[[0xF0, 0x01, 0x02, 0x03]; 4]);
        let parser = FrameParser::new().with_max_sysex_len(8);
        let err = parser.parse_next(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSysex(SysexFault::TooLong { limit: 8 })
        ));
    }

    #[test]
    fn oversized_sysex_is_skipped_up_to_its_terminator() {
        let mut transport = input(&[
            [0xF0, 0x01, 0x02, 0x03],
            [0x04, 0x05, 0x06, 0x07],
            [0x08, 0x09, 0x0A, 0x0B],
            [0xF7, 0x00, 0x00, 0x00],
            [0x90, 0x3C, 0x64, 0x00],
        ]);
        let parser = FrameParser::new().with_max_sysex_len(8);
        assert!(matches!(
            parser.parse_next(&mut transport),
            Err(Error::MalformedSysex(SysexFault::TooLong { limit: 8 }))
        ));
        assert_eq!(transport.pending(), 1);
        assert_eq!(
            parser.parse_next(&mut transport).unwrap(),
            MidiMessage::NoteOn {
                channel: 0,
                note: 0x3C,
                velocity: 0x64
            }
        );
    }

    #[test]
    fn limit_counts_the_whole_frame() {
        let frame = [[0xF0, 0x01, 0x02, 0x03], [0x04, 0x05, 0x06, 0xF7]];

        let mut transport = input(&frame);
        let err = FrameParser::new()
            .with_max_sysex_len(5)
            .parse_next(&mut transport)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSysex(SysexFault::TooLong { limit: 5 })
        ));
        assert_eq!(transport.pending(), 0);

        let mut transport = input(&frame);
        let message = FrameParser::new()
            .with_max_sysex_len(8)
            .parse_next(&mut transport)
            .unwrap();
        assert_eq!(message.payload().len(), 8);
    }

    #[test]
    fn pad_bytes_equal_to_terminator_are_kept() {
        // Trimming stops at the last 0xF7 of the read, whatever put it there.
        let mut transport = input(&[[0xF0, 0x01, 0x02, 0x03], [0x04, 0xF7, 0xF7, 0xF7]]);
        let message = parse_next(&mut transport).unwrap();
        assert_eq!(
            message.payload(),
            vec![0xF0, 0x01, 0x02, 0x03, 0x04, 0xF7, 0xF7, 0xF7]
        );
    }

    #[test]
    fn empty_transport_propagates_closed() {
        let mut transport = MemoryInput::new();
        assert!(matches!(
            parse_next(&mut transport),
            Err(Error::TransportClosed)
        ));
    }
}
