use crate::checkin::{CheckInError, CheckInService};
use crate::model::attendance::{CheckInRequest, CheckInResult};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "QR Code found and attendance recorded")]
    pub message: String,
    #[schema(example = "a1b2c3d4e5f6")]
    pub qr_code: String,
    #[schema(example = 1024)]
    pub user_id: u64,
    #[schema(example = "Ahmad Fauzi")]
    pub fullname: String,
    #[schema(example = 3)]
    pub event_id: u32,
    /// Prayer the check-in counted for; empty outside the prayer event.
    #[schema(example = "subuh")]
    pub tag: String,
}

impl From<CheckInResult> for CheckInResponse {
    fn from(result: CheckInResult) -> Self {
        Self {
            message: "QR Code found and attendance recorded".to_string(),
            qr_code: result.scan_code,
            user_id: result.participant_id,
            fullname: result.fullname,
            event_id: result.event_type_id,
            tag: result.tag.map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

/// QR check-in from a mosque kiosk
#[utoipa::path(
    post,
    path = "/api/v1/absent-qr",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = CheckInResponse),
        (status = 400, description = "Missing field, outside prayer window or already checked in", body = Object, example = json!({
            "error": "Participant already checked in for subuh today"
        })),
        (status = 403, description = "Invalid API key"),
        (status = 404, description = "Unknown QR code, enrollment or device", body = Object, example = json!({
            "error": "No matching QR code found"
        })),
        (status = 500, description = "Schedule, configuration or storage failure")
    ),
    security(
        ("api_key" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    service: web::Data<CheckInService>,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse, CheckInError> {
    let result = service.process_check_in(&payload).await?;
    Ok(HttpResponse::Ok().json(CheckInResponse::from(result)))
}
