//! In-memory collaborators used by the check-in tests.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::{
    clock::Clock,
    error::{LookupError, ScheduleError, StoreError},
    repos::{AttendanceLedger, ParticipantDirectory, PrayerWindowStore},
    schedule::ScheduleProvider,
};
use crate::model::{
    attendance::{AttendanceRecord, PointsEntry},
    participant::{LocalityCode, Participant},
    prayer::{DailySchedule, Prayer, PrayerWindow, PrayerWindows},
};

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Serves the same schedule for every key and counts calls.
pub struct StaticScheduleProvider {
    schedule: DailySchedule,
    fetches: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl StaticScheduleProvider {
    pub fn new(schedule: DailySchedule) -> Self {
        Self {
            schedule,
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn jakarta() -> Self {
        let entries = [
            ("imsak", "04:35"),
            ("subuh", "04:45"),
            ("terbit", "05:58"),
            ("dzuhur", "12:05"),
            ("ashar", "15:20"),
            ("maghrib", "18:02"),
            ("isya", "19:15"),
        ];
        Self::new(DailySchedule::new(
            entries
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
        ))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ScheduleProvider for StaticScheduleProvider {
    async fn daily_schedule(
        &self,
        _locality: &LocalityCode,
        _date: NaiveDate,
    ) -> Result<DailySchedule, ScheduleError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            actix_web::rt::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ScheduleError::Status(503));
        }
        Ok(self.schedule.clone())
    }
}

pub struct InMemoryDirectory {
    participants: Mutex<HashMap<String, Participant>>,
    enrollments: Mutex<HashSet<(u64, u32)>>,
    kiosks: Mutex<HashMap<String, LocalityCode>>,
    lookups: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            participants: Mutex::new(HashMap::new()),
            enrollments: Mutex::new(HashSet::new()),
            kiosks: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn add_participant(&self, id: u64, fullname: &str, scan_code: &str) {
        self.participants.lock().unwrap().insert(
            scan_code.to_string(),
            Participant {
                id,
                fullname: fullname.to_string(),
            },
        );
    }

    pub fn enroll(&self, participant_id: u64, event_type_id: u32) {
        self.enrollments
            .lock()
            .unwrap()
            .insert((participant_id, event_type_id));
    }

    pub fn add_kiosk(&self, device_id: &str, locality: LocalityCode) {
        self.kiosks
            .lock()
            .unwrap()
            .insert(device_id.to_string(), locality);
    }

    /// Total calls across all lookup methods.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ParticipantDirectory for InMemoryDirectory {
    async fn find_by_scan_code(&self, scan_code: &str) -> anyhow::Result<Option<Participant>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.participants.lock().unwrap().get(scan_code).cloned())
    }

    async fn is_enrolled(&self, participant_id: u64, event_type_id: u32) -> anyhow::Result<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .contains(&(participant_id, event_type_id)))
    }

    async fn resolve_locality(&self, device_id: &str) -> Result<LocalityCode, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.kiosks
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or(LookupError::Missing("Masjid not found for this device"))
    }
}

pub struct InMemoryWindowStore {
    windows: Mutex<PrayerWindows>,
    failing: AtomicBool,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set(&self, prayer: &str, before_minutes: i64, after_minutes: i64) {
        self.windows.lock().unwrap().insert(
            prayer.to_string(),
            PrayerWindow {
                before_minutes,
                after_minutes,
            },
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PrayerWindowStore for InMemoryWindowStore {
    async fn prayer_windows(&self) -> anyhow::Result<PrayerWindows> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("window config unavailable");
        }
        Ok(self.windows.lock().unwrap().clone())
    }
}

/// Ledger that enforces the same uniqueness rules as the database schema.
pub struct InMemoryLedger {
    records: Mutex<Vec<AttendanceRecord>>,
    points: Mutex<Vec<PointsEntry>>,
    failing: AtomicBool,
    hide_existing: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(vec![]),
            points: Mutex::new(vec![]),
            failing: AtomicBool::new(false),
            hide_existing: AtomicBool::new(false),
        }
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn points(&self) -> Vec<PointsEntry> {
        self.points.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes `exists_record` answer false, as a racing reader would see it.
    pub fn hide_existing(&self, hide: bool) {
        self.hide_existing.store(hide, Ordering::SeqCst);
    }

    fn violates_unique(records: &[AttendanceRecord], record: &AttendanceRecord) -> bool {
        record.tag.is_some()
            && records.iter().any(|r| {
                r.participant_id == record.participant_id
                    && r.event_type_id == record.event_type_id
                    && r.tag == record.tag
                    && r.local_date == record.local_date
            })
    }
}

#[async_trait::async_trait]
impl AttendanceLedger for InMemoryLedger {
    async fn exists_record(
        &self,
        participant_id: u64,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
    ) -> anyhow::Result<bool> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.records.lock().unwrap().iter().any(|r| {
            r.participant_id == participant_id
                && r.event_type_id == event_type_id
                && r.tag == Some(tag)
                && r.local_date == local_date
        }))
    }

    async fn count_records_for_device(
        &self,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
        device_id: &str,
    ) -> anyhow::Result<u32> {
        let count = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.event_type_id == event_type_id
                    && r.tag == Some(tag)
                    && r.local_date == local_date
                    && r.device_id == device_id
            })
            .count();
        Ok(count as u32)
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!("ledger unavailable")));
        }
        let mut records = self.records.lock().unwrap();
        if Self::violates_unique(&records, record) {
            return Err(StoreError::Duplicate);
        }
        records.push(record.clone());
        Ok(())
    }

    async fn insert_scored(
        &self,
        points: &PointsEntry,
        record: &AttendanceRecord,
    ) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!("ledger unavailable")));
        }
        let mut records = self.records.lock().unwrap();
        let mut entries = self.points.lock().unwrap();
        if Self::violates_unique(&records, record) {
            return Err(StoreError::Duplicate);
        }
        entries.push(points.clone());
        records.push(record.clone());
        Ok(())
    }
}
