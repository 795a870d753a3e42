//! Byte-level serial transport to the soil probe.
//!
//! The probe client only needs three primitives: write a frame and wait until
//! it is physically on the wire, check how many response bytes are pending,
//! and consume a single byte. The [`Transport`] trait captures exactly that,
//! so the timeout-window logic in [`crate::sync_client`] can be exercised
//! against a scripted mock as well as real hardware.

use std::io::{self, Read, Write};
use std::time::Duration;

/// Factory default baud rate of the soil probe.
pub const BAUD_RATE: u32 = 4800;
/// The parity used for serial communication.
pub const PARITY: serialport::Parity = serialport::Parity::None;
/// The number of stop bits used for serial communication.
pub const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
/// The number of data bits used for serial communication.
pub const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;

/// Blocking byte-level access to the probe's serial line.
pub trait Transport {
    /// Writes a complete request frame and blocks until the bytes have been
    /// physically transmitted, not merely buffered.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Number of response bytes ready to be consumed without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Consumes exactly one byte. Only valid after `bytes_available`
    /// reported at least one.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Creates a `serialport` builder with the probe's line settings (8N1, no
/// flow control).
pub fn serial_port_builder(device: &str, baud_rate: u32) -> serialport::SerialPortBuilder {
    serialport::new(device, baud_rate)
        .parity(PARITY)
        .stop_bits(STOP_BITS)
        .data_bits(DATA_BITS)
        .flow_control(serialport::FlowControl::None)
        // Reads are driven by bytes_available, so a short blocking timeout
        // is only a safety net.
        .timeout(Duration::from_millis(50))
}

/// [`Transport`] implementation over a real serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Opens `device` with the probe's line settings at the given baud rate.
    pub fn open(device: &str, baud_rate: u32) -> io::Result<Self> {
        let port = serial_port_builder(device, baud_rate).open()?;
        Ok(Self { port })
    }

    /// Wraps an already opened serial port.
    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.port.write_all(frame)?;
        // serialport's flush drains the kernel buffer onto the wire.
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}
