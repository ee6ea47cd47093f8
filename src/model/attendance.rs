use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::prayer::Prayer;

/// Payload a kiosk sends after scanning a participant's QR code.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = "kiosk-07")]
    #[serde(rename = "mesin_id", default)]
    pub device_id: String,
    #[schema(example = "a1b2c3d4e5f6")]
    #[serde(rename = "qr_code", default)]
    pub scan_code: String,
    #[schema(example = 3)]
    #[serde(rename = "event_id", default)]
    pub event_type_id: u32,
}

/// One row of the attendance ledger. `tag` is `None` for untagged check-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub participant_id: u64,
    pub scan_code: String,
    pub device_id: String,
    pub event_type_id: u32,
    pub tag: Option<Prayer>,
    pub checked_in_at: DateTime<Utc>,
    /// Calendar date of `checked_in_at` in the home timezone.
    pub local_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub participant_id: u64,
    pub local_date: NaiveDate,
    pub tag: Prayer,
    pub prayer_points: u32,
    pub arrival_points: u32,
    pub total_points: u32,
}

/// Outcome of an accepted check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInResult {
    pub participant_id: u64,
    pub fullname: String,
    pub tag: Option<Prayer>,
    pub scan_code: String,
    pub event_type_id: u32,
}
