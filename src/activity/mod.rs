//! Activity log of actions taken on checked vehicles.
//!
//! Calling an owner or reporting a vehicle appends an entry to an
//! append-only log kept by the backend. Entries are derived from the
//! verdict of a check; the capture pipeline itself never writes here.

use crate::registry::{RegistryRecord, UNKNOWN_OWNER};
use crate::scan::Verdict;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Note recorded for an outgoing call.
pub const CALL_NOTE: &str = "전화 발신";

/// Unit number recorded when the vehicle is not registered.
pub const UNKNOWN_UNIT_NUMBER: &str = "?-?";

/// Kind of logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Call,
    Report,
}

/// One log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub plate_number: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub unit_number: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "reporter_name")]
    pub reporter_name: String,
    /// Set by the log when the entry is stored.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 or an offset-less ISO timestamp, read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .map_err(serde::de::Error::custom)
}

impl ActivityEntry {
    /// Entry for calling the owner of a registered vehicle.
    pub fn call(record: &RegistryRecord, reporter: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: ActivityKind::Call,
            plate_number: record.plate_number.clone(),
            owner_name: record.owner_name.clone(),
            unit_number: record.unit_number(),
            note: CALL_NOTE.to_string(),
            description: String::new(),
            image: None,
            thumbnail: None,
            reporter_name: reporter.into(),
            timestamp: None,
        }
    }

    /// Entry for calling the owner found by a check; `None` when unregistered.
    pub fn call_for(verdict: &Verdict, reporter: impl Into<String>) -> Option<Self> {
        verdict.record().map(|record| Self::call(record, reporter))
    }

    /// Entry for reporting a vehicle, registered or not.
    ///
    /// Unregistered vehicles are reported under the scanned text with
    /// unknown owner and unit.
    pub fn report(
        verdict: &Verdict,
        scanned_text: &str,
        reason: impl Into<String>,
        description: impl Into<String>,
        reporter: impl Into<String>,
    ) -> Self {
        let (plate_number, owner_name, unit_number) = match verdict.record() {
            Some(record) => (
                record.plate_number.clone(),
                record.owner_name.clone(),
                record.unit_number(),
            ),
            None => (
                scanned_text.to_string(),
                UNKNOWN_OWNER.to_string(),
                UNKNOWN_UNIT_NUMBER.to_string(),
            ),
        };

        Self {
            id: None,
            kind: ActivityKind::Report,
            plate_number,
            owner_name,
            unit_number,
            note: reason.into(),
            description: description.into(),
            image: None,
            thumbnail: None,
            reporter_name: reporter.into(),
            timestamp: None,
        }
    }

    /// Attaches uploaded evidence.
    pub fn with_image(mut self, url: impl Into<String>, thumbnail: Option<String>) -> Self {
        self.image = Some(url.into());
        self.thumbnail = thumbnail;
        self
    }
}

/// Counts of logged actions for one plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub calls: usize,
    pub reports: usize,
}

impl ActivityStats {
    /// Tallies entries whose plate equals `plate` exactly.
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a ActivityEntry>, plate: &str) -> Self {
        entries
            .into_iter()
            .filter(|e| e.plate_number == plate)
            .fold(Self::default(), |mut stats, e| {
                match e.kind {
                    ActivityKind::Call => stats.calls += 1,
                    ActivityKind::Report => stats.reports += 1,
                }
                stats
            })
    }
}

/// Errors from the activity-log collaborator.
#[derive(Debug, Clone, Error)]
pub enum ActivityError {
    #[error("activity log request failed: {0}")]
    Transport(String),
    #[error("activity log answered with status {0}")]
    Status(u16),
    #[error("malformed activity log response: {0}")]
    Malformed(String),
}

/// Append-only activity log.
#[allow(async_fn_in_trait)]
pub trait ActivityLog {
    /// Appends an entry and returns it as stored.
    async fn append(&self, entry: ActivityEntry) -> Result<ActivityEntry, ActivityError>;

    /// Returns every stored entry.
    async fn history(&self) -> Result<Vec<ActivityEntry>, ActivityError>;
}

/// Activity log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ActivityEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, mut entry: ActivityEntry) -> Result<ActivityEntry, ActivityError> {
        let mut entries = self.entries();
        entry.id.get_or_insert_with(|| format!("activity-{}", entries.len() + 1));
        entry.timestamp.get_or_insert_with(Utc::now);
        entries.push(entry.clone());
        tracing::info!(kind = ?entry.kind, plate = %entry.plate_number, "Activity logged");
        Ok(entry)
    }

    async fn history(&self) -> Result<Vec<ActivityEntry>, ActivityError> {
        Ok(self.entries().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NewVehicle, VehicleType};

    fn resident() -> RegistryRecord {
        let mut vehicle = NewVehicle::unidentified("12가3456", "01012345678");
        vehicle.owner_name = "Kim".into();
        vehicle.dong = "101".into();
        vehicle.ho = "1203".into();
        vehicle.vehicle_type = VehicleType::Resident;
        vehicle.with_id("v1")
    }

    #[test]
    fn test_call_requires_registered_vehicle() {
        let entry = ActivityEntry::call_for(&Verdict::Registered(resident()), "guard").unwrap();
        assert_eq!(entry.kind, ActivityKind::Call);
        assert_eq!(entry.unit_number, "101-1203");
        assert_eq!(entry.note, CALL_NOTE);

        assert!(ActivityEntry::call_for(&Verdict::Unregistered, "guard").is_none());
    }

    #[test]
    fn test_report_for_unregistered_uses_scanned_text() {
        let entry = ActivityEntry::report(
            &Verdict::Unregistered,
            "34나5678",
            "blocking fire lane",
            "",
            "guard",
        );
        assert_eq!(entry.plate_number, "34나5678");
        assert_eq!(entry.owner_name, UNKNOWN_OWNER);
        assert_eq!(entry.unit_number, UNKNOWN_UNIT_NUMBER);
    }

    #[test]
    fn test_wire_format() {
        let entry = ActivityEntry::call(&resident(), "guard");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "call");
        assert_eq!(value["plateNumber"], "12가3456");
        assert_eq!(value["reporterName"], "guard");
        assert!(value.get("image").is_none());
    }

    #[tokio::test]
    async fn test_append_and_tally() {
        let log = InMemoryActivityLog::new();
        let record = resident();
        log.append(ActivityEntry::call(&record, "a")).await.unwrap();
        log.append(ActivityEntry::call(&record, "b")).await.unwrap();
        let stored = log
            .append(ActivityEntry::report(
                &Verdict::Registered(record.clone()),
                "",
                "double parked",
                "",
                "a",
            ))
            .await
            .unwrap();
        assert!(stored.id.is_some());
        assert!(stored.timestamp.is_some());

        let history = log.history().await.unwrap();
        assert_eq!(
            ActivityStats::tally(&history, "12가3456"),
            ActivityStats { calls: 2, reports: 1 }
        );
        assert_eq!(ActivityStats::tally(&history, "99허9999"), ActivityStats::default());
    }
}
