use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;

mod analytics;
mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod repository;
mod routes;
#[cfg(test)]
mod test_support;

use analytics::build_strategy;
use analytics::forecast::ForecastEngine;
use config::Config;
use db::init_db;
use repository::{AttendanceRepository, MySqlAttendanceRepository};

use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "movemark.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    let repo: Arc<dyn AttendanceRepository> = Arc::new(MySqlAttendanceRepository::new(pool));
    let strategy = build_strategy(config.anomaly_strategy, repo.clone(), config.forest);
    info!(strategy = strategy.name(), "Anomaly strategy selected");

    let analytics_limiter = Arc::new(routes::build_limiter(config.rate_analytics_per_min)?);
    let repo_data = Data::from(repo);
    let strategy_data = Data::from(strategy);
    let engine_data = Data::new(ForecastEngine::default());
    let api_prefix = config.api_prefix.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the UI's JS/CSS assets match
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(repo_data.clone())
            .app_data(strategy_data.clone())
            .app_data(engine_data.clone())
            .configure(|cfg| routes::configure(cfg, &api_prefix, analytics_limiter.clone()))
    })
    .bind(&config.server_addr)?
    .run()
    .await?;

    Ok(())
}
