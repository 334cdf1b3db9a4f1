use serde::{Serialize, Serializer};

use crate::error::{Result, SysexFault};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_KEY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_WHEEL: u8 = 0xE0;
pub const SYSTEM_MESSAGE: u8 = 0xF0;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

pub const CATEGORY_MASK: u8 = 0xF0;
pub const CHANNEL_MASK: u8 = 0x0F;

/// Status category selected by the high nibble of a status byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    NoteOff = NOTE_OFF,
    NoteOn = NOTE_ON,
    PolyKeyPressure = POLY_KEY_PRESSURE,
    ControlChange = CONTROL_CHANGE,
    ProgramChange = PROGRAM_CHANGE,
    ChannelPressure = CHANNEL_PRESSURE,
    PitchWheel = PITCH_WHEEL,
    System = SYSTEM_MESSAGE,
}

/// Indexed by `(status >> 4) - 8`.
const CATEGORIES: [Category; 8] = [
    Category::NoteOff,
    Category::NoteOn,
    Category::PolyKeyPressure,
    Category::ControlChange,
    Category::ProgramChange,
    Category::ChannelPressure,
    Category::PitchWheel,
    Category::System,
];

impl Category {
    /// `None` for data bytes (high bit clear).
    pub fn from_status(status: u8) -> Option<Self> {
        if status < NOTE_OFF {
            return None;
        }
        Some(CATEGORIES[usize::from(status >> 4) - 8])
    }

    /// Number of data bytes that carry meaning after the status byte.
    /// System messages have no fixed length.
    pub fn data_len(self) -> usize {
        match self {
            Category::ProgramChange | Category::ChannelPressure => 1,
            Category::System => 0,
            _ => 2,
        }
    }

    pub fn is_channel_voice(self) -> bool {
        self != Category::System
    }
}

/// A complete System Exclusive frame, `0xF0` through `0xF7` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SysEx {
    frame: Vec<u8>,
}

impl SysEx {
    /// Frames `header ++ body` between the start and end markers.
    pub fn encode(header: &[u8], body: &[u8]) -> Result<Self> {
        if let Some((position, &byte)) = header
            .iter()
            .chain(body)
            .enumerate()
            .find(|&(_, &b)| b == SYSEX_START || b == SYSEX_END)
        {
            return Err(SysexFault::ReservedByte { byte, position }.into());
        }

        let mut frame = Vec::with_capacity(header.len() + body.len() + 2);
        frame.push(SYSEX_START);
        frame.extend_from_slice(header);
        frame.extend_from_slice(body);
        frame.push(SYSEX_END);
        Ok(SysEx { frame })
    }

    /// Caller guarantees the frame starts with `0xF0` and ends with `0xF7`.
    pub(crate) fn from_frame(frame: Vec<u8>) -> Self {
        debug_assert_eq!(frame.first(), Some(&SYSEX_START));
        debug_assert_eq!(frame.last(), Some(&SYSEX_END));
        SysEx { frame }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.frame
    }

    /// Bytes between the start and end markers.
    pub fn content(&self) -> &[u8] {
        &self.frame[1..self.frame.len() - 1]
    }

    /// Splits the content into `(header, body)`, or `None` if the content is
    /// shorter than `header_len`.
    pub fn split(&self, header_len: usize) -> Option<(&[u8], &[u8])> {
        let content = self.content();
        (header_len <= content.len()).then(|| content.split_at(header_len))
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content().is_empty()
    }
}

impl Serialize for SysEx {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.frame.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MidiMessage {
    NoteOff {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    PolyKeyPressure {
        channel: u8,
        note: u8,
        pressure: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// `carry` is whatever byte followed the transport's padding slot. It fills
    /// the second data position so every short message keeps the
    /// `[status, data1, data2]` shape.
    ProgramChange {
        channel: u8,
        program: u8,
        carry: u8,
    },
    ChannelPressure {
        channel: u8,
        pressure: u8,
        carry: u8,
    },
    PitchWheel {
        channel: u8,
        lsb: u8,
        msb: u8,
    },
    SystemExclusive(SysEx),
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Builds a channel-voice message from a status byte and two data bytes.
    /// Anything that is not a channel-voice status comes back as `Unknown`.
    pub fn from_short(status: u8, data: [u8; 2]) -> Self {
        let channel = status & CHANNEL_MASK;
        let [d1, d2] = data;
        match Category::from_status(status) {
            Some(Category::NoteOff) => MidiMessage::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            },
            Some(Category::NoteOn) => MidiMessage::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            },
            Some(Category::PolyKeyPressure) => MidiMessage::PolyKeyPressure {
                channel,
                note: d1,
                pressure: d2,
            },
            Some(Category::ControlChange) => MidiMessage::ControlChange {
                channel,
                controller: d1,
                value: d2,
            },
            Some(Category::ProgramChange) => MidiMessage::ProgramChange {
                channel,
                program: d1,
                carry: d2,
            },
            Some(Category::ChannelPressure) => MidiMessage::ChannelPressure {
                channel,
                pressure: d1,
                carry: d2,
            },
            Some(Category::PitchWheel) => MidiMessage::PitchWheel {
                channel,
                lsb: d1,
                msb: d2,
            },
            Some(Category::System) | None => MidiMessage::Unknown(vec![status, d1, d2]),
        }
    }

    /// Full status byte, including the channel nibble for channel-voice messages.
    pub fn status(&self) -> u8 {
        let (category, channel) = match self {
            MidiMessage::NoteOff { channel, .. } => (NOTE_OFF, *channel),
            MidiMessage::NoteOn { channel, .. } => (NOTE_ON, *channel),
            MidiMessage::PolyKeyPressure { channel, .. } => (POLY_KEY_PRESSURE, *channel),
            MidiMessage::ControlChange { channel, .. } => (CONTROL_CHANGE, *channel),
            MidiMessage::ProgramChange { channel, .. } => (PROGRAM_CHANGE, *channel),
            MidiMessage::ChannelPressure { channel, .. } => (CHANNEL_PRESSURE, *channel),
            MidiMessage::PitchWheel { channel, .. } => (PITCH_WHEEL, *channel),
            MidiMessage::SystemExclusive(_) => return SYSEX_START,
            MidiMessage::Unknown(raw) => return raw.first().copied().unwrap_or_default(),
        };
        category | (channel & CHANNEL_MASK)
    }

    /// High nibble of the status byte.
    pub fn category(&self) -> u8 {
        self.status() & CATEGORY_MASK
    }

    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::SystemExclusive(_) | MidiMessage::Unknown(_) => None,
            _ => Some(self.status() & CHANNEL_MASK),
        }
    }

    /// The two data bytes of a short message. SysEx yields its whole frame and
    /// `Unknown` its raw bytes.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            MidiMessage::SystemExclusive(sysex) => sysex.as_bytes().to_vec(),
            MidiMessage::Unknown(raw) => raw.clone(),
            short => {
                let [d1, d2] = short.data();
                vec![d1, d2]
            }
        }
    }

    /// Canonical wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::SystemExclusive(_) | MidiMessage::Unknown(_) => self.payload(),
            short => {
                let [d1, d2] = short.data();
                vec![short.status(), d1, d2]
            }
        }
    }

    /// 14-bit pitch wheel position, 0x2000 being centre.
    pub fn pitch_bend(&self) -> Option<u16> {
        match self {
            MidiMessage::PitchWheel { lsb, msb, .. } => {
                Some(u16::from(*msb & 0x7F) << 7 | u16::from(*lsb & 0x7F))
            }
            _ => None,
        }
    }

    fn data(&self) -> [u8; 2] {
        match *self {
            MidiMessage::NoteOff { note, velocity, .. } => [note, velocity],
            MidiMessage::NoteOn { note, velocity, .. } => [note, velocity],
            MidiMessage::PolyKeyPressure { note, pressure, .. } => [note, pressure],
            MidiMessage::ControlChange {
                controller, value, ..
            } => [controller, value],
            MidiMessage::ProgramChange { program, carry, .. } => [program, carry],
            MidiMessage::ChannelPressure {
                pressure, carry, ..
            } => [pressure, carry],
            MidiMessage::PitchWheel { lsb, msb, .. } => [lsb, msb],
            MidiMessage::SystemExclusive(_) | MidiMessage::Unknown(_) => [0, 0],
        }
    }
}
