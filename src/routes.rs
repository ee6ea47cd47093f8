use crate::{
    api::{attendance, mosque, participant},
    auth::{
        handlers,
        middleware::{api_key_middleware, auth_middleware},
    },
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, error::InternalError, middleware::from_fn, web};
use serde_json::json;
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // zero period or burst, both clamped above
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Malformed JSON bodies answer with the same `{"error": ...}` shape as the handlers.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let resp = HttpResponse::BadRequest().json(json!({"error": "Invalid request body"}));
        InternalError::from_response(err, resp).into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let checkin_limiter = Arc::new(build_limiter(config.rate_checkin_per_min));

    cfg.app_data(json_config());

    // Account routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            ),
    );

    cfg.service(
        web::scope(&config.api_prefix)
            // public
            .service(
                web::resource("/register-participant")
                    .wrap(register_limiter)
                    .route(web::post().to(participant::register_participant)),
            )
            .service(
                web::resource("/masjid/{event_id}").route(web::get().to(mosque::list_mosques)),
            )
            // kiosks
            .service(
                web::resource("/v1/absent-qr")
                    .wrap(from_fn(api_key_middleware))
                    .wrap(checkin_limiter)
                    .route(web::post().to(attendance::check_in)),
            )
            // dashboard users
            .service(
                web::resource("/users/profile")
                    .wrap(from_fn(auth_middleware))
                    .wrap(login_limiter)
                    .route(web::get().to(handlers::profile)),
            ),
    );
}
