use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[arg(long = "loglevel",default_value_t=String::from("info"))]
    pub log_level: String,

    /// List available MIDI ports and exit
    #[arg(long = "list")]
    pub list_ports: bool,

    /// Name of the MIDI input port to read from
    #[arg(long = "input")]
    pub input: Option<String>,

    /// Name of the MIDI output port to write to
    #[arg(long = "output")]
    pub output: Option<String>,

    /// Client name announced to the MIDI backend
    #[arg(long = "client.name", default_value_t=String::from("midi-connection"))]
    pub client_name: String,

    /// Milliseconds to wait between draining the input buffer
    #[arg(long = "poll.interval", default_value_t = 100)]
    pub poll_interval_ms: u64,

    /// Print received messages as one JSON object per line
    #[arg(long = "json")]
    pub json: bool,

    /// Control change to send on startup, as CHANNEL,CONTROLLER,VALUE
    #[arg(long = "send.cc", value_delimiter = ',', value_parser = parse_byte)]
    pub send_cc: Option<Vec<u8>>,

    /// SysEx header bytes to send on startup, comma separated
    #[arg(long = "sysex.header", value_delimiter = ',', value_parser = parse_byte)]
    pub sysex_header: Vec<u8>,

    /// SysEx body bytes to send on startup, comma separated
    #[arg(long = "sysex.body", value_delimiter = ',', value_parser = parse_byte)]
    pub sysex_body: Vec<u8>,
}

/// Decimal, or hex with a `0x` prefix.
pub fn parse_byte(arg: &str) -> Result<u8, String> {
    let arg = arg.trim();
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => arg.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{arg}': {e}"))
}
