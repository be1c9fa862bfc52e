use crate::api::analytics::ForecastResponse;
use crate::model::anomaly::{AnomalyRecord, AnomalyType, Severity};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Movemark Attendance Analytics API",
        version = "1.0.0",
        description = r#"
## Attendance analytics

Read-only analytics over the attendance, employee and leave tables of an HRM database.

### Features
- **Anomaly detection**
  - Isolation forest scoring per employee, or fixed rule-based heuristics
  - `anomaly_threshold` in [0, 1]; higher values flag more records
- **Attendance forecast**
  - Holiday-aware trend and seasonality model, per employee or organisation wide
- **Attendance history**
  - Raw rows for one employee over a date range

### Errors
Every error answers `{"message": "..."}` with 400, 404 or 500.
"#,
    ),
    paths(
        crate::api::analytics::detect_anomalies,
        crate::api::analytics::forecast,
        crate::api::attendance::employee_attendance,
    ),
    components(
        schemas(
            AnomalyRecord,
            AnomalyType,
            Severity,
            AttendanceRecord,
            AttendanceStatus,
            ForecastResponse
        )
    ),
    tags(
        (name = "Analytics", description = "Anomaly detection and forecasting"),
        (name = "Attendance", description = "Attendance history"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        assert!(paths.contains(&"/api/analytics/anomalies"));
        assert!(paths.contains(&"/api/analytics/forecast"));
        assert!(paths.contains(&"/api/attendance/{employee_id}"));
    }
}
