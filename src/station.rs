//! Station state shared by the HTTP endpoint: the soil probe client, the
//! light adapter, and supervision of the serial link.

use flourish_station::config::LinkConfig;
use flourish_station::light::{LightChannels, LightSensor};
use flourish_station::link::{self, FailureMonitor, RetryPolicy};
use flourish_station::protocol::Channel;
use flourish_station::sync_client::{SoilReadings, SoilSensor};
use flourish_station::transport::Transport;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

/// The flat JSON document served on GET /.
///
/// `humidity` carries the probe's moisture channel; the field names follow
/// the station's published API, including the `phosphorus` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub light_level: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl Document {
    pub fn new(light_level: f64, soil: &SoilReadings) -> Self {
        Self {
            light_level,
            humidity: soil.moisture,
            temperature: soil.temperature,
            ph: soil.ph,
            nitrogen: soil.nitrogen,
            phosphorus: soil.phosphorous,
            potassium: soil.potassium,
        }
    }
}

/// Reopens the probe's serial link after a failure streak.
pub type Connector<T> = Box<dyn FnMut() -> io::Result<T> + Send>;

/// All sensor state behind the HTTP endpoint. Single-owner: the handler path
/// locks it for the full duration of a read-and-respond cycle, so at most
/// one query is outstanding on the serial line.
pub struct Station<T: Transport, C: LightChannels> {
    soil: SoilSensor<T>,
    light: LightSensor<C>,
    monitor: FailureMonitor,
    retry: RetryPolicy,
    check_interval: Duration,
    connector: Connector<T>,
}

impl<T: Transport, C: LightChannels> Station<T, C> {
    pub fn new(
        soil: SoilSensor<T>,
        light: LightSensor<C>,
        link_config: &LinkConfig,
        connector: Connector<T>,
    ) -> Self {
        Self {
            soil,
            light,
            monitor: FailureMonitor::new(link_config.failure_threshold),
            retry: link_config.retry_policy(),
            check_interval: link_config.check_interval,
            connector,
        }
    }

    /// Cadence at which serve mode runs [`Station::check_link`].
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// One synchronous read-and-assemble cycle: light first, then all six
    /// soil channels. Sensor failures are logged, never surfaced; a failed
    /// soil pass yields zeros, matching a silent probe.
    pub fn read_document(&mut self) -> Document {
        let light_level = self.light.read_lux();
        let soil = match self.soil.read_all() {
            Ok(readings) => {
                self.monitor.record_success();
                readings
            }
            Err(err) => {
                error!("Soil probe read failed: {err}");
                if self.monitor.record_failure() {
                    self.reopen();
                }
                SoilReadings::default()
            }
        };
        Document::new(light_level, &soil)
    }

    /// Periodic link health check for serve mode: queries a single channel
    /// and feeds the failure monitor, so a dead link is noticed and reopened
    /// between requests instead of on the next one. A silent probe decodes
    /// as 0 and counts as success; only transport errors escalate.
    pub fn check_link(&mut self) {
        match self.soil.query(Channel::Moisture) {
            Ok(_) => {
                debug!("Link check passed");
                self.monitor.record_success();
            }
            Err(err) => {
                warn!("Link check failed: {err}");
                if self.monitor.record_failure() {
                    self.reopen();
                }
            }
        }
    }

    /// Tears down the probe client and reopens the serial link through the
    /// retry policy. Keeps serving (with zeroed soil values) if even that
    /// fails.
    fn reopen(&mut self) {
        warn!("Reopening soil probe serial link");
        let timing = self.soil.timing();
        match link::connect_with_retry(&self.retry, &mut *self.connector) {
            Ok(transport) => self.soil = SoilSensor::with_timing(transport, timing),
            Err(err) => error!("Could not reopen soil probe link: {err}"),
        }
    }
}

/// Stations without a light sensor fitted: every read fails, so the adapter
/// reports 0.0 lux (or the last value before the sensor went away).
pub struct NoLightHardware;

impl LightChannels for NoLightHardware {
    fn read_channels(&mut self) -> io::Result<(u16, u16)> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "no light sensor fitted",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flourish_station::config::StationConfig;
    use flourish_station::mock::MockTransport;
    use flourish_station::sync_client::QueryTiming;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_timing() -> QueryTiming {
        QueryTiming {
            pre_send_delay: Duration::ZERO,
            response_timeout: Duration::from_millis(5),
            inter_query_interval: Duration::ZERO,
        }
    }

    fn test_station(
        transport: MockTransport,
        link_config: &LinkConfig,
    ) -> (Station<MockTransport, NoLightHardware>, Arc<AtomicU32>) {
        let reopens = Arc::new(AtomicU32::new(0));
        let counter = reopens.clone();
        let station = Station::new(
            SoilSensor::with_timing(transport, fast_timing()),
            LightSensor::new(NoLightHardware),
            link_config,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(MockTransport::new())
            }),
        );
        (station, reopens)
    }

    #[test]
    fn document_field_names_match_the_api() {
        let soil = SoilReadings {
            moisture: 30.0,
            temperature: 21.9,
            ph: 6.8,
            nitrogen: 42.0,
            phosphorous: 7.0,
            potassium: 120.0,
        };
        let value = serde_json::to_value(Document::new(512.25, &soil)).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "lightLevel",
                "humidity",
                "temperature",
                "ph",
                "nitrogen",
                "phosphorus",
                "potassium"
            ]
        );
        assert_eq!(object["lightLevel"], 512.25);
        assert_eq!(object["humidity"], 30.0);
        assert_eq!(object["phosphorus"], 7.0);
    }

    #[test]
    fn silent_probe_serves_a_zeroed_document() {
        let config = StationConfig::default();
        let (mut station, reopens) = test_station(MockTransport::new(), &config.link);
        let document = station.read_document();
        assert_eq!(document, Document::default());
        // A silent probe is not a transport failure; the link stays up.
        assert_eq!(reopens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failure_streak_reopens_the_link() {
        let mut link_config = StationConfig::default().link;
        link_config.failure_threshold = 2;
        link_config.initial_backoff = Duration::from_millis(1);

        let mut transport = MockTransport::new();
        transport.fail_next_write();
        let (mut station, reopens) = test_station(transport, &link_config);

        // First failure: under the threshold, no reopen yet.
        assert_eq!(station.read_document(), Document::default());
        assert_eq!(reopens.load(Ordering::SeqCst), 0);

        // Second failure crosses the threshold and reopens the link.
        station.soil.transport_mut().fail_next_write();
        assert_eq!(station.read_document(), Document::default());
        assert_eq!(reopens.load(Ordering::SeqCst), 1);

        // The fresh transport serves normally again.
        assert_eq!(station.read_document(), Document::default());
        assert_eq!(reopens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn link_check_reopens_a_dead_link_without_a_request() {
        let mut link_config = StationConfig::default().link;
        link_config.failure_threshold = 2;
        link_config.initial_backoff = Duration::from_millis(1);

        let mut transport = MockTransport::new();
        transport.fail_next_write();
        let (mut station, reopens) = test_station(transport, &link_config);

        // First failed check: under the threshold, no reopen yet.
        station.check_link();
        assert_eq!(reopens.load(Ordering::SeqCst), 0);

        // Second failed check crosses the threshold. No HTTP request was
        // involved; supervision alone notices the dead link.
        station.soil.transport_mut().fail_next_write();
        station.check_link();
        assert_eq!(reopens.load(Ordering::SeqCst), 1);

        // The fresh transport is silent, which counts as a healthy link.
        station.check_link();
        assert_eq!(reopens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn check_interval_comes_from_the_link_config() {
        let mut link_config = StationConfig::default().link;
        link_config.check_interval = Duration::from_millis(750);
        let (station, _) = test_station(MockTransport::new(), &link_config);
        assert_eq!(station.check_interval(), Duration::from_millis(750));
    }

    #[test]
    fn successful_reads_reset_the_failure_streak() {
        let mut link_config = StationConfig::default().link;
        link_config.failure_threshold = 2;
        link_config.initial_backoff = Duration::from_millis(1);

        let mut transport = MockTransport::new();
        transport.fail_next_write();
        let (mut station, reopens) = test_station(transport, &link_config);

        station.read_document();
        // A clean pass in between keeps the streak below the threshold.
        station.read_document();
        station.soil.transport_mut().fail_next_write();
        station.read_document();
        assert_eq!(reopens.load(Ordering::SeqCst), 0);
    }
}
