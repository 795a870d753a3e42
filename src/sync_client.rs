//! Blocking client for the soil probe.
//!
//! This is the only component with nontrivial timing and byte-level logic:
//! one fixed request frame is transmitted, then response bytes are collected
//! into a fixed-size buffer for the full length of a timeout window, and the
//! payload word is decoded from a fixed offset. All methods block the calling
//! thread; the probe supports exactly one outstanding request by construction.

use crate::protocol::{self as proto, Channel};
use crate::transport::Transport;
use log::{debug, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Errors returned by the probe client.
///
/// Channel validation happens before a client exists (names and ordinals
/// parse through [`crate::protocol`]), so only the transport can fail here.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An I/O error on the serial transport.
    #[error("Serial transport error: {0}")]
    Transport(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sleep granularity while waiting for response bytes, to avoid spinning
/// the port.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing parameters of the query exchange.
///
/// The defaults reproduce the probe's documented duty cycle: a 100 ms
/// bus-settling guard before each transmission, a 100 ms collection window,
/// and a minimum of 100 ms between consecutive queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTiming {
    /// Bus-settling guard slept before transmitting a request frame.
    pub pre_send_delay: Duration,
    /// Length of the response collection window. The window always runs to
    /// its full length; byte count never terminates it early.
    pub response_timeout: Duration,
    /// Minimum interval between the end of one query and the start of the
    /// next, protecting the probe's duty cycle.
    pub inter_query_interval: Duration,
}

impl Default for QueryTiming {
    fn default() -> Self {
        Self {
            pre_send_delay: Duration::from_millis(100),
            response_timeout: Duration::from_millis(100),
            inter_query_interval: Duration::from_millis(100),
        }
    }
}

/// One full set of scaled readings, in channel order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoilReadings {
    pub moisture: f64,
    pub temperature: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
}

impl SoilReadings {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Moisture => self.moisture,
            Channel::Temperature => self.temperature,
            Channel::Ph => self.ph,
            Channel::Nitrogen => self.nitrogen,
            Channel::Phosphorous => self.phosphorous,
            Channel::Potassium => self.potassium,
        }
    }

    fn set(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::Moisture => self.moisture = value,
            Channel::Temperature => self.temperature = value,
            Channel::Ph => self.ph = value,
            Channel::Nitrogen => self.nitrogen = value,
            Channel::Phosphorous => self.phosphorous = value,
            Channel::Potassium => self.potassium = value,
        }
    }
}

impl std::fmt::Display for SoilReadings {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "moisture {:.1} %, temperature {:.1} °C, pH {:.1}, N {} mg/kg, P {} mg/kg, K {} mg/kg",
            self.moisture,
            self.temperature,
            self.ph,
            self.nitrogen as u16,
            self.phosphorous as u16,
            self.potassium as u16
        )
    }
}

/// Blocking soil probe client over a byte-level [`Transport`].
///
/// The response buffer is owned exclusively by the client and reused across
/// calls; it is fully zeroed at the start of every query.
pub struct SoilSensor<T: Transport> {
    transport: T,
    timing: QueryTiming,
    buf: [u8; proto::RESPONSE_BUF_LEN],
    last_query_end: Option<Instant>,
}

impl<T: Transport> SoilSensor<T> {
    /// Creates a client with the default probe timing.
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, QueryTiming::default())
    }

    pub fn with_timing(transport: T, timing: QueryTiming) -> Self {
        Self {
            transport,
            timing,
            buf: [0; proto::RESPONSE_BUF_LEN],
            last_query_end: None,
        }
    }

    pub fn timing(&self) -> QueryTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: QueryTiming) {
        self.timing = timing;
    }

    /// Consumes the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends the channel's fixed request frame and collects response bytes
    /// for the full timeout window, returning the decoded payload word.
    ///
    /// A probe that never responds yields 0, indistinguishable from a genuine
    /// zero reading; the silent window is logged but not surfaced as an
    /// error. No CRC check is performed on the response and a short response
    /// leaves the trailing buffer bytes zero.
    pub fn query(&mut self, channel: Channel) -> Result<u16> {
        self.pace();
        self.buf = [0; proto::RESPONSE_BUF_LEN];

        thread::sleep(self.timing.pre_send_delay);
        self.transport.write_frame(channel.query_frame())?;

        let start = Instant::now();
        let mut count = 0usize;
        while start.elapsed() <= self.timing.response_timeout {
            if self.transport.bytes_available()? > 0 {
                let byte = self.transport.read_byte()?;
                if count < self.buf.len() {
                    self.buf[count] = byte;
                    count += 1;
                }
                // Bytes beyond capacity are still consumed and dropped so
                // they cannot corrupt the next query's framing.
            } else {
                thread::sleep(POLL_INTERVAL);
            }
        }
        self.last_query_end = Some(Instant::now());

        if count == 0 {
            warn!("Soil probe silent on channel {channel}, decoding zeroed buffer");
        } else {
            debug!("Channel {channel}: {count} response bytes");
        }
        Ok(proto::decode_response(&self.buf))
    }

    /// Queries a channel and applies its unit scale.
    pub fn read(&mut self, channel: Channel) -> Result<f64> {
        Ok(proto::scale_raw(channel, self.query(channel)?))
    }

    /// Reads all six channels in ordinal order, honoring the configured
    /// minimum inter-query interval between them.
    pub fn read_all(&mut self) -> Result<SoilReadings> {
        let mut readings = SoilReadings::default();
        for channel in Channel::ALL {
            let value = self.read(channel)?;
            readings.set(channel, value);
        }
        Ok(readings)
    }

    /// Waits out the remainder of the inter-query interval since the last
    /// window closed.
    fn pace(&mut self) {
        if let Some(end) = self.last_query_end {
            let since = end.elapsed();
            if since < self.timing.inter_query_interval {
                thread::sleep(self.timing.inter_query_interval - since);
            }
        }
    }
}
