use chrono::NaiveDate;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::debug;

use super::{
    error::{LookupError, StoreError},
    repos::{AttendanceLedger, ParticipantDirectory, PrayerWindowStore},
};
use crate::model::{
    attendance::{AttendanceRecord, PointsEntry},
    participant::{LocalityCode, Participant},
    prayer::{Prayer, PrayerWindow, PrayerWindows},
};

/// All check-in collaborators backed by the MySQL schema in `migrations/`.
#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ParticipantDirectory for MySqlAttendanceStore {
    async fn find_by_scan_code(&self, scan_code: &str) -> anyhow::Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, fullname FROM participants WHERE qr_code = ?",
        )
        .bind(scan_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    async fn is_enrolled(&self, participant_id: u64, event_type_id: u32) -> anyhow::Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE participant_id = ? AND event_type_id = ?
            "#,
        )
        .bind(participant_id)
        .bind(event_type_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn resolve_locality(&self, device_id: &str) -> Result<LocalityCode, LookupError> {
        let masjid_id = sqlx::query_scalar::<_, u64>(
            "SELECT masjid_id FROM kiosks WHERE device_id = ?",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or(LookupError::Missing("Masjid not found for this device"))?;

        let region_id = sqlx::query_scalar::<_, Option<u64>>(
            "SELECT region_id FROM masjid WHERE id = ?",
        )
        .bind(masjid_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::from)?
        .flatten()
        .ok_or(LookupError::Missing("Region not found for masjid"))?;

        let code = sqlx::query_scalar::<_, String>("SELECT code FROM regions WHERE id = ?")
            .bind(region_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?
            .ok_or(LookupError::Missing("Region code not found"))?;

        debug!(device_id, masjid_id, region_id, code = %code, "Resolved device locality");
        Ok(LocalityCode(code))
    }
}

#[async_trait::async_trait]
impl PrayerWindowStore for MySqlAttendanceStore {
    async fn prayer_windows(&self) -> anyhow::Result<PrayerWindows> {
        let rows = sqlx::query_as::<_, (String, i32, i32)>(
            "SELECT prayer_name, minutes_before, minutes_after FROM prayer_windows",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, before, after)| {
                (
                    name.to_lowercase(),
                    PrayerWindow {
                        before_minutes: before.into(),
                        after_minutes: after.into(),
                    },
                )
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl AttendanceLedger for MySqlAttendanceStore {
    async fn exists_record(
        &self,
        participant_id: u64,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
    ) -> anyhow::Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM attendance
            WHERE participant_id = ? AND event_type_id = ? AND tag = ? AND local_date = ?
            "#,
        )
        .bind(participant_id)
        .bind(event_type_id)
        .bind(tag.as_str())
        .bind(local_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn count_records_for_device(
        &self,
        event_type_id: u32,
        tag: Prayer,
        local_date: NaiveDate,
        device_id: &str,
    ) -> anyhow::Result<u32> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM attendance
            WHERE event_type_id = ? AND tag = ? AND local_date = ? AND device_id = ?
            "#,
        )
        .bind(event_type_id)
        .bind(tag.as_str())
        .bind(local_date)
        .bind(device_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count)?)
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_attendance(&mut conn, record).await?;
        Ok(())
    }

    async fn insert_scored(
        &self,
        points: &PointsEntry,
        record: &AttendanceRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_points_entry(&mut tx, points).await?;
        insert_attendance(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_points_entry(
    conn: &mut MySqlConnection,
    points: &PointsEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO points
            (participant_id, local_date, tag, prayer_points, arrival_points, total_points)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(points.participant_id)
    .bind(points.local_date)
    .bind(points.tag.as_str())
    .bind(points.prayer_points)
    .bind(points.arrival_points)
    .bind(points.total_points)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_attendance(
    conn: &mut MySqlConnection,
    record: &AttendanceRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance
            (participant_id, scan_code, device_id, event_type_id, tag, checked_in_at, local_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.participant_id)
    .bind(&record.scan_code)
    .bind(&record.device_id)
    .bind(record.event_type_id)
    .bind(record.tag.map(|t| t.as_str()))
    .bind(record.checked_in_at)
    .bind(record.local_date)
    .execute(conn)
    .await?;
    Ok(())
}
