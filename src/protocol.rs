//! Wire-level definitions for the 7-in-1 soil probe.
//!
//! The probe speaks a fixed subset of Modbus RTU: one holding-register read
//! per measurement channel, each encoded as an immutable 8-byte frame with a
//! precomputed CRC. There is no generalized framing or CRC validation here;
//! the probe's query set is closed and known at compile time.

/// Errors for protocol-level validation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The given ordinal does not name one of the six channels.
    #[error("Channel {0} out of range ({CHANNEL_MIN} to {CHANNEL_MAX})")]
    ChannelOutOfRange(u8),

    /// The given name does not name one of the six channels.
    #[error("Unknown channel name '{0}'")]
    UnknownChannelName(String),
}

/// Modbus device address of the probe.
pub const DEVICE_ADDRESS: u8 = 0x01;
/// Modbus function code used by every query (read holding registers).
pub const FUNCTION_READ_HOLDING: u8 = 0x03;

/// Length of every request frame.
pub const QUERY_FRAME_LEN: usize = 8;
/// Capacity of the response collection buffer.
pub const RESPONSE_BUF_LEN: usize = 20;
/// Offset of the 16-bit payload word in a response: it follows the 3-byte
/// header of address, function code and byte count.
pub const VALUE_OFFSET: usize = 3;

pub const CHANNEL_MIN: u8 = 0;
pub const CHANNEL_MAX: u8 = 5;

/// One of the six measurement types the soil probe reports.
///
/// The ordinal indexes both the query table and the scale table, matching the
/// probe's register layout (register 2 is unused by this probe model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Moisture = 0,
    Temperature = 1,
    Ph = 2,
    Nitrogen = 3,
    Phosphorous = 4,
    Potassium = 5,
}

/// The fixed request frame per channel: device address, function code,
/// register address (2 bytes), register count (2 bytes), CRC-16 (2 bytes,
/// low byte first on the wire). Never mutated.
const QUERY_FRAMES: [[u8; QUERY_FRAME_LEN]; 6] = [
    [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A], // moisture
    [0x01, 0x03, 0x00, 0x01, 0x00, 0x01, 0xD5, 0xCA], // temperature
    [0x01, 0x03, 0x00, 0x03, 0x00, 0x01, 0x74, 0x0A], // pH
    [0x01, 0x03, 0x00, 0x04, 0x00, 0x01, 0xC5, 0xCB], // nitrogen
    [0x01, 0x03, 0x00, 0x05, 0x00, 0x01, 0x94, 0x0B], // phosphorous
    [0x01, 0x03, 0x00, 0x06, 0x00, 0x01, 0x64, 0x0B], // potassium
];

impl Channel {
    /// All channels in ordinal (register) order.
    pub const ALL: [Channel; 6] = [
        Channel::Moisture,
        Channel::Temperature,
        Channel::Ph,
        Channel::Nitrogen,
        Channel::Phosphorous,
        Channel::Potassium,
    ];

    /// The fixed 8-byte request frame for this channel.
    pub const fn query_frame(self) -> &'static [u8; QUERY_FRAME_LEN] {
        &QUERY_FRAMES[self as usize]
    }

    /// Scale factor applied to the raw register value.
    ///
    /// Moisture, temperature and pH are reported by the probe in tenths;
    /// N, P and K are plain mg/kg integers. A unit convention of the sensor,
    /// not a protocol concern.
    pub const fn scale(self) -> f64 {
        match self {
            Channel::Moisture | Channel::Temperature | Channel::Ph => 0.1,
            Channel::Nitrogen | Channel::Phosphorous | Channel::Potassium => 1.0,
        }
    }

    /// Unit suffix for displaying a scaled reading.
    pub const fn unit(self) -> &'static str {
        match self {
            Channel::Moisture => "%",
            Channel::Temperature => "°C",
            Channel::Ph => "pH",
            Channel::Nitrogen | Channel::Phosphorous | Channel::Potassium => "mg/kg",
        }
    }

    /// Lower-case channel name as used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Moisture => "moisture",
            Channel::Temperature => "temperature",
            Channel::Ph => "ph",
            Channel::Nitrogen => "nitrogen",
            Channel::Phosphorous => "phosphorous",
            Channel::Potassium => "potassium",
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Channel::Moisture),
            1 => Ok(Channel::Temperature),
            2 => Ok(Channel::Ph),
            3 => Ok(Channel::Nitrogen),
            4 => Ok(Channel::Phosphorous),
            5 => Ok(Channel::Potassium),
            value => Err(Error::ChannelOutOfRange(value)),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "moisture" | "humidity" => Ok(Channel::Moisture),
            "temperature" => Ok(Channel::Temperature),
            "ph" => Ok(Channel::Ph),
            "nitrogen" => Ok(Channel::Nitrogen),
            "phosphorous" | "phosphorus" => Ok(Channel::Phosphorous),
            "potassium" => Ok(Channel::Potassium),
            other => Err(Error::UnknownChannelName(other.to_string())),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decodes the payload word from a response buffer.
///
/// The value is taken from offsets 3 and 4 big-endian regardless of how many
/// bytes actually arrived; positions never written remain zero, so a silent
/// probe decodes as 0.
pub fn decode_response(buf: &[u8; RESPONSE_BUF_LEN]) -> u16 {
    u16::from_be_bytes([buf[VALUE_OFFSET], buf[VALUE_OFFSET + 1]])
}

/// Applies the channel's unit scale to a raw register value.
pub fn scale_raw(channel: Channel, raw: u16) -> f64 {
    f64::from(raw) * channel.scale()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn query_frames_are_fixed() {
        // Register addresses 0, 1, 3, 4, 5, 6 with count 1, CRC low byte first.
        for channel in Channel::ALL {
            let frame = channel.query_frame();
            assert_eq!(frame.len(), QUERY_FRAME_LEN);
            assert_eq!(frame[0], DEVICE_ADDRESS);
            assert_eq!(frame[1], FUNCTION_READ_HOLDING);
            assert_eq!([frame[4], frame[5]], [0x00, 0x01]);
        }
        assert_eq!(
            Channel::Moisture.query_frame(),
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]
        );
        assert_eq!(
            Channel::Ph.query_frame(),
            &[0x01, 0x03, 0x00, 0x03, 0x00, 0x01, 0x74, 0x0A]
        );
        assert_eq!(
            Channel::Potassium.query_frame(),
            &[0x01, 0x03, 0x00, 0x06, 0x00, 0x01, 0x64, 0x0B]
        );
    }

    #[test]
    fn channel_ordinals_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::try_from(channel as u8).unwrap(), channel);
        }
        assert_matches!(Channel::try_from(6), Err(Error::ChannelOutOfRange(6)));
        assert_matches!(Channel::try_from(255), Err(Error::ChannelOutOfRange(255)));
    }

    #[test]
    fn channel_names_parse() {
        assert_eq!("moisture".parse::<Channel>().unwrap(), Channel::Moisture);
        assert_eq!("pH".parse::<Channel>().unwrap(), Channel::Ph);
        // The HTTP document spells it without the second 'o'.
        assert_eq!(
            "phosphorus".parse::<Channel>().unwrap(),
            Channel::Phosphorous
        );
        assert_matches!(
            "loam".parse::<Channel>(),
            Err(Error::UnknownChannelName(..))
        );
    }

    #[test]
    fn decode_takes_payload_word() {
        let mut buf = [0u8; RESPONSE_BUF_LEN];
        buf[..5].copy_from_slice(&[0x01, 0x03, 0x02, 0x01, 0x2C]);
        assert_eq!(decode_response(&buf), 300);

        // A buffer that was never written decodes as zero.
        assert_eq!(decode_response(&[0u8; RESPONSE_BUF_LEN]), 0);
    }

    #[test]
    fn tenths_channels_scale_by_ten() {
        assert_eq!(scale_raw(Channel::Moisture, 300), 30.0);
        assert_eq!(scale_raw(Channel::Nitrogen, 42), 42.0);
        assert_eq!(scale_raw(Channel::Phosphorous, 7), 7.0);
        assert_eq!(scale_raw(Channel::Potassium, 120), 120.0);
        // 0.1 is not exact in binary; compare with a tolerance.
        assert!((scale_raw(Channel::Temperature, 219) - 21.9).abs() < 1e-9);
        assert!((scale_raw(Channel::Ph, 68) - 6.8).abs() < 1e-9);
    }
}
