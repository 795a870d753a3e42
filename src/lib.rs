//! A library for a combined soil and light sensor station.
//!
//! The station polls a 7-in-1 soil probe over an RS-485 serial line using a
//! fixed set of Modbus-RTU-shaped request frames, reads a TSL2561-class
//! two-channel light sensor, and exposes the combined readings over a single
//! HTTP JSON endpoint (served by the `flourishd` binary).
//!
//! The crate is organized around the probe's query exchange, the only piece
//! with nontrivial timing and byte-level logic:
//!
//! - [`protocol`]: the six fixed request frames, channel enum, payload decode
//!   and per-channel unit scaling.
//! - [`transport`]: byte-level serial access behind the
//!   [`transport::Transport`] trait, implemented for real serial ports.
//! - [`sync_client`]: the blocking query loop (pre-send guard, transmit,
//!   fixed timeout window, decode) plus scaled single-channel and
//!   all-channel reads.
//! - [`light`]: the lux adapter with its stale-on-error policy.
//! - [`link`]: bounded-retry connection supervision for the serial link.
//! - [`config`]: the externalized station configuration.
//! - [`mock`]: a scripted transport for tests.
//!
//! ## Quick start
//!
//! ```no_run
//! use flourish_station::{protocol::Channel, sync_client::SoilSensor, transport::SerialTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = SerialTransport::open("/dev/ttyUSB0", 4800)?;
//!     let mut sensor = SoilSensor::new(transport);
//!
//!     let moisture = sensor.read(Channel::Moisture)?;
//!     println!("Soil moisture: {moisture:.1} %");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod light;
pub mod link;
pub mod mock;
pub mod protocol;
pub mod sync_client;
pub mod transport;
