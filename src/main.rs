use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod auth;
mod checkin;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod utils;

use checkin::{
    CheckInService, clock::SystemClock, mysql::MySqlAttendanceStore,
    schedule::{MyQuranClient, ScheduleCache},
};
use config::Config;
use db::init_db;
use utils::lookup_cache::CachedDirectory;

use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Prayer attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let directory = Arc::new(CachedDirectory::new(store.clone(), config.lookup_ttl));
    let provider = Arc::new(MyQuranClient::new(
        &config.schedule_api_base,
        config.schedule_timeout,
    )?);

    let service = Data::new(CheckInService::new(
        directory,
        store.clone(),
        store,
        ScheduleCache::new(provider, config.schedule_ttl),
        Arc::new(SystemClock),
        config.home_offset()?,
    ));

    let openapi = docs::api_doc(&config.api_prefix);
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());
    let pool_data = Data::new(pool);

    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(service.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
