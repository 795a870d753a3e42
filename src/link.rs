//! Sensor link supervision.
//!
//! Opening the probe's serial link goes through an explicit state machine,
//! `Disconnected -> Connecting -> Connected`, with a bounded number of
//! attempts and exponential backoff between them. Setting `max_attempts` to
//! `None` retries indefinitely.

use log::{debug, info, warn};
use std::io;
use std::thread;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// All connection attempts failed.
    #[error("Link failed after {attempts} attempt(s): {last}")]
    AttemptsExhausted { attempts: u32, last: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Observable connection state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Retry behavior for bringing the link up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum connection attempts; `None` retries indefinitely.
    pub max_attempts: Option<u32>,
    /// Backoff before the second attempt; doubles per failure.
    pub initial_backoff: Duration,
    /// Upper bound on the backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff to sleep after the given failed attempt (1-based): doubling
    /// from `initial_backoff`, capped at `max_backoff`.
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let doublings = failed_attempts.saturating_sub(1).min(16);
        let backoff = self.initial_backoff.saturating_mul(1u32 << doublings);
        backoff.min(self.max_backoff)
    }

    fn exhausted(&self, failed_attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => failed_attempts >= max,
            None => false,
        }
    }
}

/// Runs `connect` until it succeeds or the policy is exhausted, sleeping the
/// policy's backoff between attempts.
///
/// The connector is generic so the policy can be exercised without hardware;
/// in production it opens the probe's serial port.
pub fn connect_with_retry<T, F>(policy: &RetryPolicy, mut connect: F) -> Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    let mut state;
    let mut failed_attempts = 0u32;
    loop {
        state = LinkState::Connecting;
        debug!("Link state: {state:?}");
        match connect() {
            Ok(link) => {
                state = LinkState::Connected;
                debug!("Link state: {state:?}");
                if failed_attempts > 0 {
                    info!("Link up after {} failed attempt(s)", failed_attempts);
                }
                return Ok(link);
            }
            Err(err) => {
                failed_attempts += 1;
                state = LinkState::Disconnected;
                debug!("Link state: {state:?}");
                if policy.exhausted(failed_attempts) {
                    return Err(Error::AttemptsExhausted {
                        attempts: failed_attempts,
                        last: err,
                    });
                }
                let backoff = policy.backoff_for(failed_attempts);
                warn!("Link attempt {failed_attempts} failed ({err}), retrying in {backoff:?}");
                thread::sleep(backoff);
            }
        }
    }
}

/// Tracks consecutive I/O failures on an established link and signals when
/// the link should be torn down and reopened.
#[derive(Debug)]
pub struct FailureMonitor {
    threshold: u32,
    consecutive: u32,
}

impl FailureMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// Records a failed operation. Returns `true` when the failure streak
    /// reached the threshold; the streak resets so the caller reconnects
    /// once per escalation.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            self.consecutive = 0;
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fast_policy(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn connects_after_transient_failures() {
        let mut attempts = 0;
        let result = connect_with_retry(&fast_policy(Some(5)), || {
            attempts += 1;
            if attempts < 3 {
                Err(io::Error::new(io::ErrorKind::NotFound, "port missing"))
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut attempts = 0;
        let result: Result<()> = connect_with_retry(&fast_policy(Some(3)), || {
            attempts += 1;
            Err(io::Error::new(io::ErrorKind::NotFound, "port missing"))
        });
        assert_eq!(attempts, 3);
        assert_matches!(result, Err(Error::AttemptsExhausted { attempts: 3, .. }));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: Some(10),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(450),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(450));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(450));
    }

    #[test]
    fn failure_monitor_escalates_at_threshold() {
        let mut monitor = FailureMonitor::new(3);
        assert!(!monitor.record_failure());
        assert!(!monitor.record_failure());
        assert!(monitor.record_failure());
        // Streak reset after escalation.
        assert!(!monitor.record_failure());
    }

    #[test]
    fn failure_monitor_resets_on_success() {
        let mut monitor = FailureMonitor::new(2);
        assert!(!monitor.record_failure());
        monitor.record_success();
        assert!(!monitor.record_failure());
        assert!(monitor.record_failure());
    }
}
