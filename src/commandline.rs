use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use flourish_station::protocol as proto;
use std::path::PathBuf;
use std::time::Duration;

fn parse_channel(s: &str) -> Result<proto::Channel, String> {
    s.parse::<proto::Channel>().map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Read and display a single soil channel, scaled to its unit.
    /// Channel names: moisture, temperature, ph, nitrogen, phosphorous, potassium.
    #[clap(verbatim_doc_comment)]
    Read {
        /// The soil channel to query.
        #[arg(value_parser = parse_channel)]
        channel: proto::Channel,
    },

    /// Read and display all six soil channels, respecting the probe's
    /// minimum inter-query interval between reads.
    #[clap(verbatim_doc_comment)]
    ReadAll,

    /// Serve the combined soil and light readings over HTTP.
    /// GET / responds with a flat JSON document of all sensor values.
    #[clap(verbatim_doc_comment)]
    Serve {
        /// Bind address for the HTTP endpoint, e.g. "0.0.0.0:8080".
        /// Overrides the configuration file.
        #[arg(long, verbatim_doc_comment)]
        bind: Option<String>,
    },
}

const fn about_text() -> &'static str {
    "Flourish station - soil probe and light sensor readings over a serial line and HTTP."
}

#[derive(Parser, Debug)]
#[command(name="flourishd", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Path to the YAML configuration file.
    /// A missing file means built-in defaults for every setting.
    #[arg(long, default_value = "station.yml", verbatim_doc_comment)]
    pub config: PathBuf,

    /// Serial port device name override.
    /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
    #[arg(short, long, verbatim_doc_comment)]
    pub device: Option<String>,

    /// Baud rate override for the probe's serial line.
    /// The probe's factory setting is 4800.
    #[arg(long, verbatim_doc_comment)]
    pub baud_rate: Option<u32>,

    /// Response collection window override.
    /// Examples: "100ms", "250ms".
    #[arg(long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Option<Duration>,

    /// Minimum delay between consecutive probe queries (duty-cycle guard).
    /// Examples: "100ms", "250ms".
    #[arg(long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub delay: Option<Duration>,

    #[command(subcommand)]
    pub command: CliCommands,
}
