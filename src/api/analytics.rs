use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::analytics::AnomalyDetectionStrategy;
use crate::analytics::forecast::{ForecastEngine, forecast_attendance};
use crate::error::AnalyticsError;
use crate::model::anomaly::{AnomalyRecord, Threshold};
use crate::repository::AttendanceRepository;

#[derive(Deserialize, IntoParams)]
pub struct AnomalyQuery {
    /// Sensitivity in [0, 1]; higher flags more records. Defaults to 0.5
    #[param(example = 0.5, minimum = 0.0, maximum = 1.0)]
    pub anomaly_threshold: Option<f64>,
}

#[derive(Deserialize, IntoParams)]
pub struct ForecastQuery {
    /// Omit to forecast for the whole organisation
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    #[param(example = "2024-07-01")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForecastResponse {
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "2024-07-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 92.5)]
    pub predicted_attendance_percentage: f64,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/anomalies").route(web::get().to(detect_anomalies)))
        .service(web::resource("/forecast").route(web::get().to(forecast)));
}

#[utoipa::path(
    get,
    path = "/api/analytics/anomalies",
    params(AnomalyQuery),
    responses(
        (status = 200, description = "Findings sorted by anomaly_score, highest first", body = [AnomalyRecord]),
        (status = 400, description = "Threshold outside [0, 1]", body = Object, example = json!({
            "message": "anomaly_threshold must be between 0.0 and 1.0, got 1.5"
        })),
        (status = 404, description = "No attendance data at all", body = Object, example = json!({
            "message": "No attendance records found for all employees"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Analytics"
)]
pub async fn detect_anomalies(
    strategy: web::Data<dyn AnomalyDetectionStrategy>,
    query: web::Query<AnomalyQuery>,
) -> Result<HttpResponse, AnalyticsError> {
    let threshold = match query.anomaly_threshold {
        Some(value) => Threshold::try_from(value)?,
        None => Threshold::default(),
    };

    let anomalies = strategy.detect(threshold).await?;
    Ok(HttpResponse::Ok().json(anomalies))
}

#[utoipa::path(
    get,
    path = "/api/analytics/forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Predicted attendance percentage in [0, 100]", body = ForecastResponse),
        (status = 400, description = "Missing or malformed date", body = Object, example = json!({
            "message": "date is required (YYYY-MM-DD)"
        })),
        (status = 404, description = "No attendance history for the scope", body = Object, example = json!({
            "message": "No attendance records found for employee 1000"
        })),
        (status = 500, description = "Model could not be fitted")
    ),
    tag = "Analytics"
)]
pub async fn forecast(
    repo: web::Data<dyn AttendanceRepository>,
    engine: web::Data<ForecastEngine>,
    query: web::Query<ForecastQuery>,
) -> Result<HttpResponse, AnalyticsError> {
    let ForecastQuery { employee_id, date } = query.into_inner();
    let date = date.ok_or_else(|| AnalyticsError::InvalidInput("date is required (YYYY-MM-DD)".into()))?;

    let predicted = forecast_attendance(repo.get_ref(), **engine, employee_id, date).await?;
    tracing::info!(?employee_id, %date, predicted, "Attendance forecast served");

    Ok(HttpResponse::Ok().json(ForecastResponse {
        employee_id,
        date,
        predicted_attendance_percentage: (predicted * 100.0).round() / 100.0,
    }))
}
