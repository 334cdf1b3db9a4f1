use std::fmt;

use log::info;
use midir::{Ignore, MidiInput, MidiOutput, PortInfoError};

use crate::{
    error::{Error, Result},
    transport::{InputTransport, MidirInput, MidirOutput, OutputTransport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("In"),
            Direction::Output => f.write_str("Out"),
        }
    }
}

/// Resolves human-readable port names to open transports.
pub trait PortRegistry {
    type Input: InputTransport;
    type Output: OutputTransport;

    /// Fails with `PortNotFound` when no input has this exact name.
    fn find_input(&mut self, name: &str) -> Result<Self::Input>;

    /// Fails with `PortNotFound` when no output has this exact name.
    fn find_output(&mut self, name: &str) -> Result<Self::Output>;
}

/// Ports of the platform MIDI backend, via midir.
#[derive(Debug, Clone)]
pub struct MidirRegistry {
    client_name: String,
}

impl MidirRegistry {
    pub fn new(client_name: impl Into<String>) -> Self {
        MidirRegistry {
            client_name: client_name.into(),
        }
    }

    pub fn port_names(&self, direction: Direction) -> Result<Vec<String>> {
        match direction {
            Direction::Input => {
                let midi_in = self.midi_input()?;
                Ok(midi_in
                    .ports()
                    .iter()
                    .map(|p| midi_in.port_name(p))
                    .collect::<Result<Vec<_>, PortInfoError>>()?)
            }
            Direction::Output => {
                let midi_out = MidiOutput::new(&self.client_name)?;
                Ok(midi_out
                    .ports()
                    .iter()
                    .map(|p| midi_out.port_name(p))
                    .collect::<Result<Vec<_>, PortInfoError>>()?)
            }
        }
    }

    fn midi_input(&self) -> Result<MidiInput> {
        let mut midi_in = MidiInput::new(&self.client_name)?;
        midi_in.ignore(Ignore::None);
        Ok(midi_in)
    }
}

impl PortRegistry for MidirRegistry {
    type Input = MidirInput;
    type Output = MidirOutput;

    fn find_input(&mut self, name: &str) -> Result<MidirInput> {
        let midi_in = self.midi_input()?;
        let port = find_port(midi_in.ports(), |p| midi_in.port_name(p), name)
            .ok_or_else(|| Error::PortNotFound {
                name: name.to_owned(),
                direction: Direction::Input,
            })?;

        info!("Opening MIDI input \"{}\"...", name);
        MidirInput::connect(midi_in, &port, name)
    }

    fn find_output(&mut self, name: &str) -> Result<MidirOutput> {
        let midi_out = MidiOutput::new(&self.client_name)?;
        let port = find_port(midi_out.ports(), |p| midi_out.port_name(p), name)
            .ok_or_else(|| Error::PortNotFound {
                name: name.to_owned(),
                direction: Direction::Output,
            })?;

        info!("Opening MIDI output \"{}\"...", name);
        MidirOutput::connect(midi_out, &port, name)
    }
}

/// Ports whose name cannot be read are skipped rather than failing the lookup.
fn find_port<P>(
    ports: Vec<P>,
    port_name: impl Fn(&P) -> Result<String, PortInfoError>,
    name: &str,
) -> Option<P> {
    ports
        .into_iter()
        .find(|p| port_name(p).map(|n| n == name).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_reads_like_a_port_label() {
        let err = Error::PortNotFound {
            name: "In From MIDI Yoke:  2".into(),
            direction: Direction::Input,
        };
        assert_eq!(err.to_string(), "MIDI In 'In From MIDI Yoke:  2' not found");
        assert_eq!(Direction::Output.to_string(), "Out");
    }

    #[test]
    fn find_port_matches_exact_names() {
        let ports = vec!["Keys", "Keys 2", "Pads"];
        let names = |p: &&str| Ok::<_, PortInfoError>(p.to_string());
        assert_eq!(find_port(ports.clone(), names, "Keys 2"), Some("Keys 2"));
        assert_eq!(find_port(ports, names, "keys"), None);
    }
}
