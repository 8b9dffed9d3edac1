//! Binary-sensor view of an [`OutageRecord`] for the home-automation host.
//!
//! The sensor is "on" (a problem) while an outage is announced for the
//! station. Everything else in the record is exposed as attributes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outage::types::OutageRecord;

pub const ICON_ON: &str = "mdi:transmission-tower-off";
pub const ICON_OFF: &str = "mdi:transmission-tower";
pub const DEVICE_CLASS: &str = "problem";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorAttributes {
    pub region: String,
    pub search_station: String,
    pub last_changed: Option<DateTime<Utc>>,
    pub published_date: Option<NaiveDateTime>,
    pub working_date: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub name: String,
    pub unique_id: String,
    pub is_on: bool,
    pub icon: String,
    pub device_class: String,
    pub attributes: SensorAttributes,
}

#[derive(Debug, Clone)]
pub struct OutageSensor {
    name: String,
    unique_id: String,
    region: String,
    station: String,
    is_on: bool,
    last_changed: Option<DateTime<Utc>>,
    record: OutageRecord,
}

impl OutageSensor {
    pub fn new(name: &str, region: &str, station: &str) -> Self {
        Self {
            name: name.to_string(),
            unique_id: unique_id(name, region),
            region: region.to_string(),
            station: station.to_string(),
            is_on: false,
            last_changed: None,
            record: OutageRecord::not_found(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn icon(&self) -> &'static str {
        if self.is_on {
            ICON_ON
        } else {
            ICON_OFF
        }
    }

    /// Copies a fresh record into the sensor. Returns true when the on/off
    /// state changed, which also stamps `last_changed` with `now`.
    pub fn apply(&mut self, record: OutageRecord, now: DateTime<Utc>) -> bool {
        let changed = self.last_changed.is_none() || self.is_on != record.found;
        self.is_on = record.found;
        if changed {
            self.last_changed = Some(now);
        }
        self.record = record;
        changed
    }

    pub fn attributes(&self) -> SensorAttributes {
        let record = &self.record;
        SensorAttributes {
            region: self.region.clone(),
            search_station: self.station.clone(),
            last_changed: self.last_changed,
            published_date: record.published_at,
            working_date: record.window_label.clone(),
            start_date: record.start_at,
            end_date: record.end_at,
            description: Some(record.summary_text.clone()).filter(|text| !text.is_empty()),
        }
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            is_on: self.is_on,
            icon: self.icon().to_string(),
            device_class: DEVICE_CLASS.to_string(),
            attributes: self.attributes(),
        }
    }
}

/// `elektro_celje_<name>_<region>`, lowercased, spaces in the name as `_`.
pub fn unique_id(name: &str, region: &str) -> String {
    format!(
        "elektro_celje_{}_{}",
        name.to_lowercase().replace(' ', "_"),
        region.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, hour, 0, 0)
            .single()
            .expect("valid test time")
    }

    fn outage() -> OutageRecord {
        OutageRecord {
            found: true,
            published_at: None,
            summary_text: "<p>TP Lava</p>".to_string(),
            window_label: Some("Izpad elektrike 15. marca 2024 od 08:00 do 14:30".to_string()),
            start_at: None,
            end_at: None,
        }
    }

    #[test]
    fn unique_id_follows_name_and_region() {
        let sensor = OutageSensor::new("TP Lava Sensor", "CELJE", "Lava");
        assert_eq!(sensor.unique_id(), "elektro_celje_tp_lava_sensor_celje");
    }

    #[test]
    fn starts_off_with_empty_attributes() {
        let sensor = OutageSensor::new("Lava", "celje", "Lava");
        assert!(!sensor.is_on());
        assert_eq!(sensor.icon(), ICON_OFF);

        let attributes = sensor.attributes();
        assert_eq!(attributes.region, "celje");
        assert_eq!(attributes.search_station, "Lava");
        assert_eq!(attributes.last_changed, None);
        assert_eq!(attributes.description, None);
        assert_eq!(attributes.working_date, None);
    }

    #[test]
    fn apply_tracks_state_changes() {
        let mut sensor = OutageSensor::new("Lava", "celje", "Lava");

        assert!(sensor.apply(OutageRecord::not_found(), now(8)));
        assert_eq!(sensor.attributes().last_changed, Some(now(8)));

        assert!(sensor.apply(outage(), now(9)));
        assert!(sensor.is_on());
        assert_eq!(sensor.icon(), ICON_ON);
        assert_eq!(sensor.attributes().last_changed, Some(now(9)));

        assert!(!sensor.apply(outage(), now(10)));
        assert_eq!(sensor.attributes().last_changed, Some(now(9)));

        assert!(sensor.apply(OutageRecord::not_found(), now(11)));
        assert_eq!(sensor.attributes().description, None);
        assert_eq!(sensor.attributes().working_date, None);
    }

    #[test]
    fn snapshot_exposes_record_fields() {
        let mut sensor = OutageSensor::new("Lava", "celje", "Lava");
        sensor.apply(outage(), now(9));

        let snapshot = sensor.snapshot();
        assert!(snapshot.is_on);
        assert_eq!(snapshot.device_class, "problem");
        assert_eq!(
            snapshot.attributes.working_date.as_deref(),
            Some("Izpad elektrike 15. marca 2024 od 08:00 do 14:30")
        );
        assert_eq!(
            snapshot.attributes.description.as_deref(),
            Some("<p>TP Lava</p>")
        );

        let json = serde_json::to_value(&snapshot).expect("snapshot serializes");
        assert_eq!(json["attributes"]["last_changed"], "2024-03-14T09:00:00Z");
        assert_eq!(json["icon"], ICON_ON);
    }
}
