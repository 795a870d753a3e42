//! Light sensor adapter.
//!
//! The station's light reading comes from a TSL2561-class two-channel sensor:
//! channel 0 measures broadband (visible + infrared) light, channel 1
//! infrared only, and lux is derived from both via the datasheet's piecewise
//! formula. The I2C driver itself stays an external collaborator behind the
//! [`LightChannels`] trait; this module owns the gain/integration-time
//! configuration, the conversion, and the stale-on-error policy: a failed or
//! saturated read is logged and the last successfully computed lux value is
//! returned, never an error.

use log::{error, warn};
use std::io;

/// Analog gain setting of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gain {
    /// 1x gain. Raw counts are normalized up by 16 during conversion.
    #[default]
    Low,
    /// 16x gain.
    High,
}

/// Integration time setting of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub enum IntegrationTime {
    /// 13.7 ms
    #[serde(rename = "13ms")]
    Ms13,
    /// 101 ms
    #[serde(rename = "101ms")]
    Ms101,
    /// 402 ms
    #[default]
    #[serde(rename = "402ms")]
    Ms402,
}

impl IntegrationTime {
    /// Integration time in milliseconds, as used by the lux normalization.
    pub const fn millis(self) -> f64 {
        match self {
            IntegrationTime::Ms13 => 13.7,
            IntegrationTime::Ms101 => 101.0,
            IntegrationTime::Ms402 => 402.0,
        }
    }
}

/// Raw two-channel access to the sensor hardware.
pub trait LightChannels {
    /// Fetches the raw (broadband, infrared) channel pair.
    fn read_channels(&mut self) -> io::Result<(u16, u16)>;
}

/// Converts a raw channel pair to lux.
///
/// Returns `None` when either channel is saturated (raw value `0xFFFF`), in
/// which case the calculation would not be accurate. A ratio above 1.3 maps
/// to 0 lux per the datasheet.
pub fn compute_lux(gain: Gain, integration: IntegrationTime, ch0: u16, ch1: u16) -> Option<f64> {
    if ch0 == 0xFFFF || ch1 == 0xFFFF {
        return None;
    }

    let mut d0 = f64::from(ch0);
    let mut d1 = f64::from(ch1);
    let ratio = d1 / d0;

    // Normalize for integration time and gain.
    d0 *= 402.0 / integration.millis();
    d1 *= 402.0 / integration.millis();
    if gain == Gain::Low {
        d0 *= 16.0;
        d1 *= 16.0;
    }

    let lux = if ratio < 0.5 {
        0.0304 * d0 - 0.062 * d0 * ratio.powf(1.4)
    } else if ratio < 0.61 {
        0.0224 * d0 - 0.031 * d1
    } else if ratio < 0.80 {
        0.0128 * d0 - 0.0153 * d1
    } else if ratio < 1.30 {
        0.00146 * d0 - 0.00112 * d1
    } else {
        // Also reached when d0 is zero and the ratio is not finite.
        0.0
    };
    Some(lux)
}

/// Lux-producing adapter over a raw two-channel light source.
pub struct LightSensor<C: LightChannels> {
    channels: C,
    gain: Gain,
    integration: IntegrationTime,
    lux: f64,
}

impl<C: LightChannels> LightSensor<C> {
    /// Creates an adapter with 1x gain and a 402 ms integration time.
    pub fn new(channels: C) -> Self {
        Self::with_settings(channels, Gain::default(), IntegrationTime::default())
    }

    pub fn with_settings(channels: C, gain: Gain, integration: IntegrationTime) -> Self {
        Self {
            channels,
            gain,
            integration,
            lux: 0.0,
        }
    }

    /// Reads the sensor and converts to lux.
    ///
    /// On a transport error or a saturated reading the condition is logged
    /// and the last successfully computed lux value is returned; there is no
    /// distinct error value.
    pub fn read_lux(&mut self) -> f64 {
        match self.channels.read_channels() {
            Ok((ch0, ch1)) => match compute_lux(self.gain, self.integration, ch0, ch1) {
                Some(lux) => {
                    self.lux = lux;
                    lux
                }
                None => {
                    warn!("Light sensor saturated (ch0={ch0}, ch1={ch1})");
                    self.lux
                }
            },
            Err(err) => {
                error!("Light sensor read error: {err}");
                self.lux
            }
        }
    }
}
