pub mod core;

use std::io::Write;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::{ConfigError, MonitorConfig};
use crate::core::feed::fetcher::DEFAULT_FEED_BASE_URL;
use crate::core::feed::{FeedError, FeedFetcher};
use crate::core::outage::OutageExtractor;
use crate::core::sensor::{OutageSensor, SensorSnapshot};

pub use crate::core::feed::types::FeedEntry;
pub use crate::core::outage::types::{OutageRecord, OutageWindow};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install log subscriber: {0}")]
    Logging(String),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("failed to write sensor state: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to encode sensor state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fetches the region's feed and extracts the outage record for `station`.
/// Never fails: fetch and parse problems surface as absent fields.
pub async fn compute_outage_state(region: &str, station: &str) -> OutageRecord {
    compute_outage_state_at(DEFAULT_FEED_BASE_URL, region, station).await
}

/// [`compute_outage_state`] against another feed endpoint.
pub async fn compute_outage_state_at(base_url: &str, region: &str, station: &str) -> OutageRecord {
    let entries = match FeedFetcher::for_region(region, base_url) {
        Ok(fetcher) => fetcher.fetch().await,
        Err(error) => {
            error!(%error, region, "could not set up outage feed fetcher");
            Vec::new()
        }
    };
    OutageExtractor::new(station).extract(&entries)
}

/// One configured sensor: its fetcher, extractor and presentation state.
#[derive(Debug, Clone)]
pub struct OutageMonitor {
    fetcher: FeedFetcher,
    extractor: OutageExtractor,
    sensor: OutageSensor,
}

impl OutageMonitor {
    pub fn new(fetcher: FeedFetcher, extractor: OutageExtractor, sensor: OutageSensor) -> Self {
        Self {
            fetcher,
            extractor,
            sensor,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, FeedError> {
        let fetcher = FeedFetcher::new(
            &config.region,
            &config.feed_base_url,
            config.request_timeout(),
        )?;
        let extractor = OutageExtractor::with_label_prefix(&config.station, &config.label_prefix);
        let sensor = OutageSensor::new(&config.name, &config.region, &config.station);
        Ok(Self::new(fetcher, extractor, sensor))
    }

    pub fn sensor(&self) -> &OutageSensor {
        &self.sensor
    }

    pub async fn compute(&self) -> OutageRecord {
        let entries = self.fetcher.fetch().await;
        self.extractor.extract(&entries)
    }

    /// Runs one poll cycle and applies the result to the sensor.
    pub async fn poll(&mut self) -> SensorSnapshot {
        let record = self.compute().await;
        if self.sensor.apply(record, Utc::now()) {
            info!(
                sensor = self.sensor.name(),
                is_on = self.sensor.is_on(),
                "sensor state changed"
            );
        }
        self.sensor.snapshot()
    }
}

fn init_tracing(config: &MonitorConfig) -> Result<(), RunError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| RunError::Logging(error.to_string()))
}

fn emit(snapshot: &SensorSnapshot) -> Result<(), RunError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, snapshot)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

/// Polls on the configured interval, printing each sensor snapshot as a
/// JSON line on stdout. Logs go to stderr.
pub async fn run() -> Result<(), RunError> {
    let config = MonitorConfig::from_env()?;
    init_tracing(&config)?;
    info!(
        region = %config.region,
        station = %config.station,
        interval_secs = config.scan_interval_secs,
        "starting outage monitor"
    );

    let mut monitor = OutageMonitor::from_config(&config)?;
    if config.run_once {
        return emit(&monitor.poll().await);
    }

    let mut ticker = interval(config.scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = monitor.poll().await;
                emit(&snapshot)?;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!(%error, "failed to listen for shutdown signal");
                }
                info!(sensor = monitor.sensor().name(), "stopping outage monitor");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::fetcher::tests::spawn_feed_server;
    use axum::http::StatusCode;

    fn monitor_for(base: &str, station: &str) -> OutageMonitor {
        let config = MonitorConfig::from_lookup(|key| match key {
            "REGION" => Some("Celje".to_string()),
            "STATION" => Some(station.to_string()),
            "FEED_BASE_URL" => Some(base.to_string()),
            _ => None,
        })
        .expect("config should load");
        OutageMonitor::from_config(&config).expect("monitor should build")
    }

    #[tokio::test]
    async fn poll_reports_announced_outage() {
        let (base, _state, server_task) = spawn_feed_server(
            StatusCode::OK,
            include_str!("../fixtures/elektro-celje.rss.xml"),
        )
        .await;
        let mut monitor = monitor_for(&base, "TP CELJE LAVA");

        let snapshot = monitor.poll().await;
        assert!(snapshot.is_on);
        assert_eq!(snapshot.unique_id, "elektro_celje_elektro_celje_sensor_celje");
        assert_eq!(
            snapshot.attributes.start_date.map(|at| at.to_string()).as_deref(),
            Some("2024-03-15 08:00:00")
        );
        assert_eq!(
            snapshot.attributes.end_date.map(|at| at.to_string()).as_deref(),
            Some("2024-03-15 14:30:00")
        );

        server_task.abort();
    }

    #[tokio::test]
    async fn unchanged_feed_yields_identical_records() {
        let (base, state, server_task) = spawn_feed_server(
            StatusCode::OK,
            include_str!("../fixtures/elektro-celje.rss.xml"),
        )
        .await;
        let monitor = monitor_for(&base, "šmarje");

        let first = monitor.compute().await;
        let second = monitor.compute().await;
        assert!(first.found);
        assert_eq!(first, second);
        assert_eq!(state.request_count.load(std::sync::atomic::Ordering::SeqCst), 2);

        server_task.abort();
    }

    #[tokio::test]
    async fn compute_outage_state_composes_fetch_and_extract() {
        let (base, state, server_task) = spawn_feed_server(
            StatusCode::OK,
            include_str!("../fixtures/elektro-celje.rss.xml"),
        )
        .await;

        let record = compute_outage_state_at(&base, "CELJE", "tp celje lava").await;
        assert!(record.found);
        assert_eq!(
            record.window_label.as_deref(),
            Some("Izpad elektrike 15. marca 2024 od 08:00 do 14:30")
        );
        assert_eq!(
            record.end_at.map(|at| at.to_string()).as_deref(),
            Some("2024-03-15 14:30:00")
        );

        let missing = compute_outage_state_at(&base, "celje", "TP Ljubečna").await;
        assert_eq!(missing, OutageRecord::not_found());
        assert_eq!(state.request_count.load(std::sync::atomic::Ordering::SeqCst), 2);

        server_task.abort();
    }

    #[tokio::test]
    async fn feed_failure_reads_as_no_outage() {
        let (base, _state, server_task) =
            spawn_feed_server(StatusCode::BAD_GATEWAY, "upstream down").await;
        let mut monitor = monitor_for(&base, "lava");

        assert_eq!(monitor.compute().await, OutageRecord::not_found());
        let snapshot = monitor.poll().await;
        assert!(!snapshot.is_on);
        assert_eq!(snapshot.attributes.description, None);

        server_task.abort();
    }
}
