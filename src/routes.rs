use crate::{
    api::{analytics, attendance},
    error::AnalyticsError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::Context;
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer-IP limiter refilling `requests_per_min` tokens every minute.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let burst = requests_per_min.max(1);
    let per_ms = 60_000 / burst as u64;
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limiter settings")?;
    Ok(Governor::new(&cfg))
}

/// Malformed query strings answer 400 with the usual `{"message": ...}` body.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AnalyticsError::InvalidInput(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, analytics_limiter: Arc<Limiter>) {
    cfg.app_data(query_config()).service(
        web::scope(api_prefix)
            .service(
                web::scope("/analytics")
                    .wrap(analytics_limiter)
                    // /analytics/anomalies, /analytics/forecast
                    .configure(analytics::routes),
            )
            // /attendance/{employee_id}
            .service(web::scope("/attendance").configure(attendance::routes)),
    );
}
