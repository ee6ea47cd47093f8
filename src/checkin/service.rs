use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    clock::Clock,
    error::{CheckInError, LookupError, StoreError},
    repos::{AttendanceLedger, ParticipantDirectory, PrayerWindowStore},
    schedule::ScheduleCache,
    tagger::{match_prayer, score},
};
use crate::model::{
    attendance::{AttendanceRecord, CheckInRequest, CheckInResult, PointsEntry},
    participant::Participant,
    prayer::Prayer,
};

/// Event type whose check-ins are tagged with a prayer and scored.
pub const PRAYER_EVENT_TYPE: u32 = 3;

pub struct CheckInService {
    directory: Arc<dyn ParticipantDirectory>,
    windows: Arc<dyn PrayerWindowStore>,
    ledger: Arc<dyn AttendanceLedger>,
    schedules: ScheduleCache,
    clock: Arc<dyn Clock>,
    home_offset: FixedOffset,
}

impl CheckInService {
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        windows: Arc<dyn PrayerWindowStore>,
        ledger: Arc<dyn AttendanceLedger>,
        schedules: ScheduleCache,
        clock: Arc<dyn Clock>,
        home_offset: FixedOffset,
    ) -> Self {
        Self {
            directory,
            windows,
            ledger,
            schedules,
            clock,
            home_offset,
        }
    }

    /// Validates a scan, tags it with a prayer when it belongs to the prayer
    /// event, scores it and records it. Nothing is written unless every check
    /// passes.
    #[instrument(
        name = "process_check_in",
        skip(self, request),
        fields(device_id = %request.device_id, event_type_id = request.event_type_id)
    )]
    pub async fn process_check_in(
        &self,
        request: &CheckInRequest,
    ) -> Result<CheckInResult, CheckInError> {
        if request.device_id.trim().is_empty() {
            return Err(CheckInError::InvalidInput("mesin_id is required"));
        }
        if request.scan_code.trim().is_empty() {
            return Err(CheckInError::InvalidInput("No QR code data provided"));
        }

        let participant = self
            .directory
            .find_by_scan_code(&request.scan_code)
            .await
            .map_err(storage_failure)?
            .ok_or(CheckInError::NotFound("No matching QR code found"))?;

        let enrolled = self
            .directory
            .is_enrolled(participant.id, request.event_type_id)
            .await
            .map_err(storage_failure)?;
        if !enrolled {
            info!(participant_id = participant.id, "Participant not enrolled for event");
            return Err(CheckInError::NotFound(
                "Participant is not registered for this event",
            ));
        }

        let now = self.clock.now();
        let local_date = now.with_timezone(&self.home_offset).date_naive();

        let mut record = AttendanceRecord {
            participant_id: participant.id,
            scan_code: request.scan_code.clone(),
            device_id: request.device_id.clone(),
            event_type_id: request.event_type_id,
            tag: None,
            checked_in_at: now,
            local_date,
        };

        if request.event_type_id == PRAYER_EVENT_TYPE {
            let prayer = self.tag(request, now, local_date).await?;
            record.tag = Some(prayer);
            self.score_and_record(&participant, request, prayer, &record)
                .await?;
        } else {
            self.ledger.insert_record(&record).await.map_err(|e| {
                error!(error = %e, participant_id = participant.id, "Failed to save attendance record");
                CheckInError::PersistenceFailure(e.into())
            })?;
        }

        info!(
            participant_id = participant.id,
            tag = record.tag.map(|t| t.as_str()).unwrap_or(""),
            "Attendance recorded"
        );

        Ok(CheckInResult {
            participant_id: participant.id,
            fullname: participant.fullname,
            tag: record.tag,
            scan_code: record.scan_code,
            event_type_id: record.event_type_id,
        })
    }

    async fn tag(
        &self,
        request: &CheckInRequest,
        now: DateTime<Utc>,
        local_date: NaiveDate,
    ) -> Result<Prayer, CheckInError> {
        let locality = self
            .directory
            .resolve_locality(&request.device_id)
            .await
            .map_err(|e| match e {
                LookupError::Missing(what) => {
                    info!(device_id = %request.device_id, "{}", what);
                    CheckInError::NotFound(what)
                }
                LookupError::Store(e) => storage_failure(e),
            })?;

        let schedule = self
            .schedules
            .get(&locality, local_date)
            .await
            .map_err(|e| {
                error!(error = %e, locality = %locality, "Failed to fetch prayer schedule");
                CheckInError::UpstreamFailure(e)
            })?;

        let windows = self.windows.prayer_windows().await.map_err(|e| {
            error!(error = %e, "Failed to load prayer windows");
            CheckInError::ConfigFailure(e)
        })?;

        let local_now = now.with_timezone(&self.home_offset).naive_local();
        match match_prayer(&schedule, &windows, local_date, local_now) {
            Some(prayer) => {
                debug!(locality = %locality, tag = prayer.as_str(), "Check-in tagged");
                Ok(prayer)
            }
            None => {
                info!(locality = %locality, local_time = %local_now.time(), "Check-in outside prayer windows");
                Err(CheckInError::NoWindowMatch)
            }
        }
    }

    async fn score_and_record(
        &self,
        participant: &Participant,
        request: &CheckInRequest,
        prayer: Prayer,
        record: &AttendanceRecord,
    ) -> Result<(), CheckInError> {
        let already = self
            .ledger
            .exists_record(participant.id, request.event_type_id, prayer, record.local_date)
            .await
            .map_err(storage_failure)?;
        if already {
            return Err(CheckInError::DuplicateCheckIn(prayer));
        }

        let earlier = self
            .ledger
            .count_records_for_device(
                request.event_type_id,
                prayer,
                record.local_date,
                &request.device_id,
            )
            .await
            .map_err(storage_failure)?;
        let rank = earlier + 1;
        let score = score(prayer, rank);

        let points = PointsEntry {
            participant_id: participant.id,
            local_date: record.local_date,
            tag: prayer,
            prayer_points: score.prayer_points,
            arrival_points: score.arrival_points,
            total_points: score.total_points,
        };

        match self.ledger.insert_scored(&points, record).await {
            Ok(()) => {
                debug!(rank, total_points = score.total_points, "Points saved");
                Ok(())
            }
            // lost a race with a concurrent scan of the same code
            Err(StoreError::Duplicate) => {
                warn!(participant_id = participant.id, tag = prayer.as_str(), "Duplicate rejected by storage");
                Err(CheckInError::DuplicateCheckIn(prayer))
            }
            Err(StoreError::Other(e)) => {
                error!(error = %e, participant_id = participant.id, "Failed to save points and attendance");
                Err(CheckInError::PersistenceFailure(e))
            }
        }
    }
}

fn storage_failure(e: anyhow::Error) -> CheckInError {
    error!(error = %e, "Storage lookup failed");
    CheckInError::PersistenceFailure(e)
}
