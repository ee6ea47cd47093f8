use chrono::NaiveDate;

use super::error::{LookupError, StoreError};
use crate::model::{
    attendance::{AttendanceRecord, PointsEntry},
    participant::{LocalityCode, Participant},
    prayer::{Prayer, PrayerWindows},
};

/// Read side of registration: participants, enrollments and kiosks.
#[async_trait::async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn find_by_scan_code(&self, scan_code: &str) -> anyhow::Result<Option<Participant>>;

    async fn is_enrolled(&self, participant_id: u64, event_type_id: u32) -> anyhow::Result<bool>;

    /// Device -> mosque -> region code. Each missing hop is reported separately.
    async fn resolve_locality(&self, device_id: &str) -> Result<LocalityCode, LookupError>;
}

#[async_trait::async_trait]
pub trait PrayerWindowStore: Send + Sync {
    async fn prayer_windows(&self) -> anyhow::Result<PrayerWindows>;
}

#[async_trait::async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn exists_record(
        &self,
        participant_id: u64,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
    ) -> anyhow::Result<bool>;

    async fn count_records_for_device(
        &self,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
        device_id: &str,
    ) -> anyhow::Result<u32>;

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Writes the points entry and then the record as one unit. Neither row
    /// survives if either write fails.
    async fn insert_scored(
        &self,
        points: &PointsEntry,
        record: &AttendanceRecord,
    ) -> Result<(), StoreError>;
}
