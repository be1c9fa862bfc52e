use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AnalyticsError;
use crate::model::attendance::AttendanceRecord;
use crate::repository::{AttendanceFilter, AttendanceRepository};

#[derive(Deserialize, IntoParams)]
pub struct AttendanceRange {
    #[param(example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,
    #[param(example = "2024-01-31")]
    pub end_date: Option<NaiveDate>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{employee_id}").route(web::get().to(employee_attendance)));
}

/// Attendance history of one employee, newest day first
#[utoipa::path(
    get,
    path = "/api/attendance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee id", example = 1000),
        AttendanceRange
    ),
    responses(
        (status = 200, description = "Attendance rows", body = [AttendanceRecord]),
        (status = 400, description = "Invalid id or date range", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 404, description = "No rows in range", body = Object, example = json!({
            "message": "No attendance records found for employee 1000 between 2024-01-01 and 2024-01-31"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn employee_attendance(
    repo: web::Data<dyn AttendanceRepository>,
    path: web::Path<u64>,
    range: web::Query<AttendanceRange>,
) -> Result<HttpResponse, AnalyticsError> {
    let employee_id = path.into_inner();
    if employee_id == 0 {
        return Err(AnalyticsError::InvalidInput("employee_id must be positive".into()));
    }
    if range.start_date.zip(range.end_date).is_some_and(|(start, end)| start > end) {
        return Err(AnalyticsError::InvalidInput(
            "start_date cannot be after end_date".into(),
        ));
    }

    let filter = AttendanceFilter::for_employee(Some(employee_id)).between(range.start_date, range.end_date);
    let mut rows = repo.fetch_attendance(&filter).await?;
    if rows.is_empty() {
        return Err(AnalyticsError::NoData(filter));
    }
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(HttpResponse::Ok().json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::InMemoryRepository;
    use crate::routes::query_config;
    use crate::test_support::{absent, employee, present};
    use actix_web::{App, http::StatusCode, test, web::Data};
    use std::sync::Arc;

    fn repo() -> Arc<dyn AttendanceRepository> {
        Arc::new(InMemoryRepository {
            employees: vec![employee(4, "D")],
            attendance: vec![
                present(4, "2024-01-02", "08:55", "17:20"),
                absent(4, "2024-01-03"),
                present(4, "2024-01-04", "09:10", "17:05"),
                present(4, "2024-02-01", "08:40", "17:00"),
            ],
            leaves: Vec::new(),
        })
    }

    #[actix_web::test]
    async fn rows_in_range_newest_first() {
        let app = test::init_service(
            App::new()
                .app_data(Data::from(repo()))
                .app_data(query_config())
                .service(web::scope("/attendance").configure(routes)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/attendance/4?start_date=2024-01-01&end_date=2024-01-31")
            .to_request();
        let rows: Vec<AttendanceRecord> = test::call_and_read_body_json(&app, req).await;

        let days: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(days, ["2024-01-04", "2024-01-03", "2024-01-02"]);
    }

    #[actix_web::test]
    async fn rejects_bad_requests_and_reports_empty_ranges() {
        let app = test::init_service(
            App::new()
                .app_data(Data::from(repo()))
                .app_data(query_config())
                .service(web::scope("/attendance").configure(routes)),
        )
        .await;
        let cases = [
            ("/attendance/0", StatusCode::BAD_REQUEST),
            ("/attendance/4?start_date=2024-02-01&end_date=2024-01-01", StatusCode::BAD_REQUEST),
            ("/attendance/4?start_date=yesterday", StatusCode::BAD_REQUEST),
            ("/attendance/4?start_date=2023-01-01&end_date=2023-12-31", StatusCode::NOT_FOUND),
            ("/attendance/9", StatusCode::NOT_FOUND),
        ];
        for (uri, status) in cases {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), status, "{uri}");
        }
    }
}
