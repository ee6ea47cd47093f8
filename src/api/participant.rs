use crate::checkin::error::is_unique_violation;
use crate::utils::validation::{FieldErrors, Validator, char_len_between, is_phone_number};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_EVENT_TYPE: u32 = 2;
const SCAN_CODE_LEN: usize = 12;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterParticipant {
    #[schema(example = "Ahmad Fauzi")]
    pub fullname: String,
    #[schema(example = "081234567890")]
    pub contact: String,
    #[schema(example = "male")]
    pub gender: String,
    #[schema(example = "1998-07-14", format = "date", value_type = String)]
    pub dob: String,
    #[schema(example = 1)]
    pub masjid_id: u64,
    #[serde(default, alias = "isHideName")]
    pub is_hide_name: bool,
    /// Pre-printed card code; generated when omitted.
    #[serde(default, alias = "qrCode")]
    #[schema(example = "a1b2c3d4e5f6")]
    pub qr_code: Option<String>,
    #[serde(default)]
    #[schema(example = 2)]
    pub event_id: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterParticipantResponse {
    #[schema(example = "Participant registered successfully")]
    pub message: String,
    #[schema(example = "a1b2c3d4e5f6")]
    pub qr_code: String,
    #[schema(example = 1024)]
    pub participant_id: u64,
}

fn validate_participant(req: &RegisterParticipant) -> Result<NaiveDate, FieldErrors> {
    let dob = NaiveDate::parse_from_str(&req.dob, "%Y-%m-%d").ok();
    let supplied_code = req.qr_code.as_deref().filter(|c| !c.is_empty());

    Validator::new()
        .check("fullname", req.fullname.trim().chars().count() >= 3, "min")
        .check("contact", is_phone_number(&req.contact), "contact")
        .check("gender", matches!(req.gender.as_str(), "male" | "female"), "oneof")
        .check("dob", dob.is_some(), "date")
        .check("masjid_id", req.masjid_id >= 1, "min")
        .check(
            "qr_code",
            supplied_code.is_none_or(|c| char_len_between(c, SCAN_CODE_LEN, SCAN_CODE_LEN)),
            "len",
        )
        .finish()?;

    dob.ok_or_else(|| FieldErrors::from([("dob", "Invalid date".to_string())]))
}

fn generate_scan_code() -> String {
    Uuid::new_v4().to_simple().to_string()[..SCAN_CODE_LEN].to_string()
}

async fn count_where(pool: &MySqlPool, column: &str, value: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM participants WHERE {} = ?",
        column
    ))
    .bind(value)
    .fetch_one(pool)
    .await
}

async fn insert_participant(
    pool: &MySqlPool,
    req: &RegisterParticipant,
    dob: NaiveDate,
    scan_code: &str,
    event_type_id: u32,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let participant_id = sqlx::query(
        r#"
        INSERT INTO participants
            (fullname, contact, gender, dob, masjid_id, hide_name, qr_code, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(req.fullname.trim())
    .bind(&req.contact)
    .bind(&req.gender)
    .bind(dob)
    .bind(req.masjid_id)
    .bind(req.is_hide_name)
    .bind(scan_code)
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    sqlx::query("INSERT INTO enrollments (participant_id, event_type_id, status) VALUES (?, ?, 1)")
        .bind(participant_id)
        .bind(event_type_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(participant_id)
}

fn database_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({"error": "Database error"}))
}

/// Register a participant and enroll them in an event
#[utoipa::path(
    post,
    path = "/api/register-participant",
    request_body = RegisterParticipant,
    responses(
        (status = 201, description = "Participant registered", body = RegisterParticipantResponse),
        (status = 400, description = "Validation failed or contact/QR code already in use", body = Object, example = json!({
            "error": "Contact number already registered"
        })),
        (status = 500, description = "Database error")
    ),
    tag = "Participant"
)]
#[instrument(name = "register_participant", skip(pool, payload), fields(masjid_id = payload.masjid_id))]
pub async fn register_participant(
    pool: web::Data<MySqlPool>,
    payload: web::Json<RegisterParticipant>,
) -> impl Responder {
    let dob = match validate_participant(&payload) {
        Ok(dob) => dob,
        Err(errors) => return HttpResponse::BadRequest().json(json!({ "errors": errors })),
    };

    match count_where(pool.get_ref(), "contact", &payload.contact).await {
        Ok(0) => {}
        Ok(_) => {
            return HttpResponse::BadRequest()
                .json(json!({"error": "Contact number already registered"}));
        }
        Err(e) => {
            error!(error = %e, "Failed to check contact");
            return database_error();
        }
    }

    let scan_code = match payload.qr_code.as_deref().filter(|c| !c.is_empty()) {
        None => generate_scan_code(),
        Some(code) => match count_where(pool.get_ref(), "qr_code", code).await {
            Ok(0) => code.to_string(),
            Ok(_) => {
                return HttpResponse::BadRequest().json(json!({"error": "QR code already in use"}));
            }
            Err(e) => {
                error!(error = %e, "Failed to check QR code");
                return database_error();
            }
        },
    };

    let event_type_id = payload
        .event_id
        .filter(|&id| id > 0)
        .unwrap_or(DEFAULT_EVENT_TYPE);

    match insert_participant(pool.get_ref(), &payload, dob, &scan_code, event_type_id).await {
        Ok(participant_id) => {
            info!(participant_id, event_type_id, "Participant registered");
            HttpResponse::Created().json(RegisterParticipantResponse {
                message: "Participant registered successfully".to_string(),
                qr_code: scan_code,
                participant_id,
            })
        }
        Err(e) if is_unique_violation(&e) => {
            // lost a race against a concurrent registration
            HttpResponse::BadRequest()
                .json(json!({"error": "Contact number or QR code already registered"}))
        }
        Err(e) => {
            error!(error = %e, "Failed to insert participant");
            HttpResponse::InternalServerError().json(json!({"error": "Failed to register participant"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RegisterParticipant {
        RegisterParticipant {
            fullname: "Ahmad Fauzi".to_string(),
            contact: "081234567890".to_string(),
            gender: "male".to_string(),
            dob: "1998-07-14".to_string(),
            masjid_id: 1,
            is_hide_name: false,
            qr_code: None,
            event_id: None,
        }
    }

    #[test]
    fn accepts_valid_registration() {
        let dob = validate_participant(&valid()).unwrap();
        assert_eq!(dob, NaiveDate::from_ymd_opt(1998, 7, 14).unwrap());
    }

    #[test]
    fn reports_every_bad_field() {
        let req = RegisterParticipant {
            fullname: "Al".to_string(),
            contact: "81234567890".to_string(),
            gender: "other".to_string(),
            dob: "14-07-1998".to_string(),
            masjid_id: 0,
            qr_code: Some("short".to_string()),
            ..valid()
        };
        let errors = validate_participant(&req).unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["contact", "dob", "fullname", "gender", "masjid_id", "qr_code"]
        );
    }

    #[test]
    fn empty_scan_code_counts_as_missing() {
        let req = RegisterParticipant {
            qr_code: Some(String::new()),
            ..valid()
        };
        assert!(validate_participant(&req).is_ok());
    }

    #[test]
    fn generated_codes_are_twelve_hex_chars() {
        let a = generate_scan_code();
        let b = generate_scan_code();
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn accepts_camel_case_kiosk_fields() {
        let req: RegisterParticipant = serde_json::from_value(json!({
            "fullname": "Siti Aminah",
            "contact": "0812345678",
            "gender": "female",
            "dob": "2001-01-31",
            "masjid_id": 4,
            "isHideName": true,
            "qrCode": "0123456789ab"
        }))
        .unwrap();
        assert!(req.is_hide_name);
        assert_eq!(req.qr_code.as_deref(), Some("0123456789ab"));
        assert_eq!(req.event_id, None);
    }
}
