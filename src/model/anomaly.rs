use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AnalyticsError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    LateCheckin,
    EarlyCheckout,
    LowAttendance,
    IrregularPattern,
    /// absent with no leave request covering the day
    UnauthorizedAbsence,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Buckets how far a raw forest score falls below the cutoff.
    pub fn from_cutoff_distance(cutoff: f64, score: f64) -> Self {
        let diff = (cutoff - score) / 2.0;
        if diff > 0.5 {
            Severity::High
        } else if diff > 0.25 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A single finding of a detection run. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "employee_name": "John Doe",
    "anomaly_type": "LATE_CHECKIN",
    "description": "Checked in at 10:42 on 2024-03-04",
    "severity": "MEDIUM",
    "detected_date": "2024-04-01T09:00:00Z",
    "anomaly_score": 0.61
}))]
pub struct AnomalyRecord {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    pub anomaly_type: AnomalyType,
    #[schema(example = "Checked in at 10:42 on 2024-03-04")]
    pub description: String,
    pub severity: Severity,
    /// when the detection ran, not the day that looked unusual
    #[schema(example = "2024-04-01T09:00:00Z", format = "date-time", value_type = String)]
    pub detected_date: DateTime<Utc>,
    #[schema(example = 0.61)]
    pub anomaly_score: f64,
}

/// Sorts highest score first. Scores are finite, so `total_cmp` gives a stable order.
pub fn sort_by_score_desc(anomalies: &mut [AnomalyRecord]) {
    anomalies.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));
}

/// Caller-supplied sensitivity in `[0, 1]`.
///
/// Higher values move the score cutoff towards zero and therefore flag more records:
/// whatever is flagged at `t1` is also flagged at any `t2 > t1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: f64 = 0.5;

    pub fn value(self) -> f64 {
        self.0
    }

    /// Forest scores strictly below this value are flagged.
    pub fn cutoff(self) -> f64 {
        -(1.0 - self.0)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold(Self::DEFAULT)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = AnalyticsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Threshold(value))
        } else {
            Err(AnalyticsError::InvalidInput(format!(
                "anomaly_threshold must be between 0.0 and 1.0, got {value}"
            )))
        }
    }
}
