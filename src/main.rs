//! Flourish station CLI
//!
//! A command-line application for a combined soil and light sensor station.
//! The station queries a 7-in-1 soil probe (moisture, temperature, pH, N, P,
//! K) over an RS-485 serial line using fixed Modbus-RTU-shaped frames.
//!
//! This tool allows users to:
//! - Read a single soil channel or all six channels once.
//! - Run in serve mode, exposing the combined soil and light readings as a
//!   flat JSON document on a single HTTP GET route.
//!
//! The CLI leverages the `flourish_station` crate for protocol definitions
//! and client operations.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use flourish_station::{
    config::StationConfig, light::LightSensor, link, sync_client::SoilSensor,
    transport::SerialTransport,
};
use log::*;
use std::panic;

mod commandline;
mod station;
mod web;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Command-line flags override their configuration file counterparts.
fn apply_overrides(config: &mut StationConfig, args: &commandline::CliArgs) {
    if let Some(device) = &args.device {
        config.serial.device = device.clone();
    }
    if let Some(baud_rate) = args.baud_rate {
        config.serial.baud_rate = baud_rate;
    }
    if let Some(timeout) = args.timeout {
        config.serial.response_timeout = timeout;
    }
    if let Some(delay) = args.delay {
        config.serial.inter_query_interval = delay;
    }
}

/// Opens the probe's serial link through the retry policy and wraps it in a
/// client with the configured query timing.
fn open_probe(config: &StationConfig) -> Result<SoilSensor<SerialTransport>> {
    let device = config.serial.device.clone();
    let baud_rate = config.serial.baud_rate;
    info!("Connecting to soil probe on {device} at {baud_rate} baud...");
    let transport = link::connect_with_retry(&config.link.retry_policy(), || {
        SerialTransport::open(&device, baud_rate)
    })
    .with_context(|| format!("Cannot open serial port {}", config.serial.device))?;
    Ok(SoilSensor::with_timing(
        transport,
        config.serial.query_timing(),
    ))
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "Flourish station started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let mut config = StationConfig::load_or_default(&args.config)
        .with_context(|| format!("Cannot load config file {:?}", args.config))?;
    apply_overrides(&mut config, &args);
    trace!("Config: {config:?}");

    match &args.command {
        commandline::CliCommands::Read { channel } => {
            info!("Executing: Read channel {channel}");
            let mut sensor = open_probe(&config)?;
            let value = sensor
                .read(*channel)
                .with_context(|| format!("Cannot read channel {channel}"))?;
            println!("{channel}: {value:.1} {}", channel.unit());
        }
        commandline::CliCommands::ReadAll => {
            info!("Executing: Read all channels");
            let mut sensor = open_probe(&config)?;
            let readings = sensor
                .read_all()
                .with_context(|| "Cannot read soil channels")?;
            println!("Soil readings: {readings}");
        }
        commandline::CliCommands::Serve { bind } => {
            let bind = bind.clone().unwrap_or_else(|| config.http.bind.clone());
            info!("Starting serve mode on {bind}");
            let sensor = open_probe(&config)?;
            let light = LightSensor::with_settings(
                station::NoLightHardware,
                config.light.gain,
                config.light.integration_time,
            );
            let connector: station::Connector<SerialTransport> = {
                let device = config.serial.device.clone();
                let baud_rate = config.serial.baud_rate;
                Box::new(move || SerialTransport::open(&device, baud_rate))
            };
            let station = station::Station::new(sensor, light, &config.link, connector);
            web::serve(&bind, station)
                .with_context(|| format!("HTTP server failed on {bind}"))?;
        }
    }

    Ok(())
}
