use std::{thread, time::Duration};

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use midi_connection::{Connection, Direction, MidiMessage, MidirRegistry};
use midi_msg::{MidiMsg, ReceiverContext};
use settings::Cli;

mod settings;

fn list_midi_ports(registry: &MidirRegistry) -> anyhow::Result<()> {
    for direction in [Direction::Input, Direction::Output] {
        println!("MIDI {direction}:");
        for (i, name) in registry.port_names(direction)?.iter().enumerate() {
            println!("{}: {}", i, name);
        }
    }
    Ok(())
}

fn print_message(message: &MidiMessage, json: bool, ctx: &mut ReceiverContext) {
    if json {
        match serde_json::to_string(message) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to encode message as JSON: {}", e),
        }
        return;
    }

    let bytes = message.to_bytes();
    let hex = bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    match MidiMsg::from_midi_with_context(&bytes, ctx) {
        Ok((decoded, _len)) => println!("status {:02X}: {}  {:?}", message.category(), hex, decoded),
        Err(e) => {
            debug!("midi-msg could not decode {}: {:?}", hex, e);
            println!("status {:02X}: {}", message.category(), hex);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut registry = MidirRegistry::new(&cli.client_name);

    if cli.list_ports {
        return list_midi_ports(&registry);
    }

    if cli.input.is_none() && cli.output.is_none() {
        bail!("You must provide a MIDI input and/or output port name, e.g. --input \"In From MIDI Yoke:  2\"");
    }

    let mut connection: Connection =
        Connection::open(&mut registry, cli.input.as_deref(), cli.output.as_deref())
            .context("failed to open MIDI ports")?;

    if let Some(cc) = &cli.send_cc {
        let &[channel, controller, value] = cc.as_slice() else {
            bail!("--send.cc takes exactly three bytes: CHANNEL,CONTROLLER,VALUE");
        };
        connection.send_control_change(channel, controller, value)?;
    }

    if !cli.sysex_header.is_empty() || !cli.sysex_body.is_empty() {
        connection.send_sysex(&cli.sysex_header, &cli.sysex_body)?;
    }

    if !connection.has_input() {
        info!("No MIDI input attached; nothing to monitor");
        connection.disconnect();
        return Ok(());
    }

    info!("Monitoring MIDI input; Ctrl+C to quit");
    let interval = Duration::from_millis(cli.poll_interval_ms);
    let mut ctx = ReceiverContext::new();
    loop {
        if let Err(e) = connection.drain(|message| print_message(&message, cli.json, &mut ctx)) {
            connection.disconnect();
            return Err(e).context("MIDI input failed");
        }
        thread::sleep(interval);
    }
}
