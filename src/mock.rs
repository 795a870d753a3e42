//! Scripted in-memory transport for exercising the query logic without a
//! probe on the bus.

use crate::transport::Transport;
use std::collections::VecDeque;
use std::io;

/// A [`Transport`] that records transmitted frames and replays scripted
/// replies.
///
/// Each call to [`MockTransport::queue_response`] scripts the reply to one
/// future request frame: when a frame is written, the next scripted reply
/// becomes available byte by byte. A request with no scripted reply behaves
/// like a silent probe.
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<Vec<u8>>,
    scripted: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    fail_next_write: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the reply to the next unanswered request frame.
    pub fn queue_response(&mut self, bytes: &[u8]) {
        self.scripted.push_back(bytes.to_vec());
    }

    /// Makes the next `write_frame` fail with a broken-pipe error.
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// All frames transmitted so far, in order.
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Reply bytes delivered but not yet consumed.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for MockTransport {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            ));
        }
        self.sent.push(frame.to_vec());
        if let Some(reply) = self.scripted.pop_front() {
            self.pending.extend(reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no scripted bytes pending"))
    }
}
