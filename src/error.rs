use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::repository::AttendanceFilter;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Rejected before any computation starts.
    #[error("{0}")]
    InvalidInput(String),

    #[error("No attendance records found for {0}")]
    NoData(AttendanceFilter),

    /// Only raised inside a multi-employee scan, where it is logged and skipped.
    #[error("employee {employee_id} has {records} attendance record(s), at least 2 are needed")]
    DegenerateInput { employee_id: u64, records: usize },

    #[error("Model fit failed for {scope}: {reason}")]
    ModelFit { scope: String, reason: String },

    #[error("attendance row could not be read: {0}")]
    InvalidRecord(String),

    #[error("database error: {0}")]
    Repository(#[from] sqlx::Error),

    #[error("worker task failed: {0}")]
    Task(String),
}

impl AnalyticsError {
    pub fn model_fit(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyticsError::ModelFit {
            scope: scope.into(),
            reason: reason.into(),
        }
    }
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalyticsError::NoData(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AnalyticsError::Repository(_)
            | AnalyticsError::InvalidRecord(_)
            | AnalyticsError::Task(_) => {
                tracing::error!(error = %self, "Analytics request failed");
                "Internal Server Error".to_string()
            }
            AnalyticsError::ModelFit { .. } => {
                tracing::error!(error = %self, "Model fit failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
