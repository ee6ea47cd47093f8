use crate::model::mosque::Mosque;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct MosqueListResponse {
    #[schema(example = "Success")]
    pub message: String,
    pub data: Vec<Mosque>,
}

/// Mosques taking part in an event
#[utoipa::path(
    get,
    path = "/api/masjid/{event_id}",
    params(
        ("event_id" = u32, Path, description = "Event type")
    ),
    responses(
        (status = 200, description = "Mosques configured for the event", body = MosqueListResponse),
        (status = 404, description = "No mosque configured", body = Object, example = json!({
            "message": "No masjid found"
        })),
        (status = 500, description = "Database error")
    ),
    tag = "Masjid"
)]
pub async fn list_mosques(pool: web::Data<MySqlPool>, path: web::Path<u32>) -> impl Responder {
    let event_type_id = path.into_inner();

    let mosques = sqlx::query_as::<_, Mosque>(
        r#"
        SELECT m.id, m.name, m.address
        FROM masjid m
        JOIN masjid_events me ON me.masjid_id = m.id
        WHERE me.event_type_id = ?
        ORDER BY m.name
        "#,
    )
    .bind(event_type_id)
    .fetch_all(pool.get_ref())
    .await;

    match mosques {
        Ok(data) if data.is_empty() => {
            HttpResponse::NotFound().json(json!({"message": "No masjid found"}))
        }
        Ok(data) => HttpResponse::Ok().json(MosqueListResponse {
            message: "Success".to_string(),
            data,
        }),
        Err(e) => {
            error!(error = %e, event_type_id, "Failed to fetch masjid list");
            HttpResponse::InternalServerError().json(json!({"error": "Failed to fetch masjid"}))
        }
    }
}
