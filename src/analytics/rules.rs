use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::info;

use super::AnomalyDetectionStrategy;
use crate::error::AnalyticsError;
use crate::model::anomaly::{AnomalyRecord, AnomalyType, Severity, Threshold, sort_by_score_desc};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::{employee::Employee, leave_request::LeaveRequest};
use crate::repository::{AttendanceFilter, AttendanceRepository};

const RECENT_WINDOW_DAYS: i64 = 30;

fn late_after() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn early_before() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Every finding for one employee, before the threshold is applied.
pub fn evaluate_employee(
    employee: &Employee,
    records: &[AttendanceRecord],
    leaves: &[LeaveRequest],
    as_of: NaiveDate,
    detected_at: DateTime<Utc>,
) -> Vec<AnomalyRecord> {
    let report = |anomaly_type, description: String, severity, anomaly_score| AnomalyRecord {
        employee_id: employee.id,
        employee_name: employee.name.clone(),
        anomaly_type,
        description,
        severity,
        detected_date: detected_at,
        anomaly_score,
    };
    let mut found = Vec::new();

    // 1. late check-ins
    let late = records
        .iter()
        .filter(|r| r.checkin_time.is_some_and(|t| t > late_after()))
        .count();
    if late > 5 {
        let severity = if late > 10 { Severity::High } else { Severity::Medium };
        found.push(report(
            AnomalyType::LateCheckin,
            format!("Employee has {late} late check-ins"),
            severity,
            (late as f64 / 20.0).min(1.0),
        ));
    }

    // 2. absences nobody asked leave for
    for absence in records.iter().filter(|r| r.status == AttendanceStatus::Absent) {
        if !leaves.iter().any(|l| l.covers(absence.date)) {
            found.push(report(
                AnomalyType::UnauthorizedAbsence,
                format!("Absence without leave request on {}", absence.date),
                Severity::High,
                1.0,
            ));
        }
    }

    // 3. early check-outs
    let early = records
        .iter()
        .filter(|r| r.checkout_time.is_some_and(|t| t < early_before()))
        .count();
    if early > 5 {
        let severity = if early > 8 { Severity::Medium } else { Severity::Low };
        found.push(report(
            AnomalyType::EarlyCheckout,
            format!("Employee has {early} early checkouts"),
            severity,
            early as f64 / 15.0,
        ));
    }

    // 4. recent attendance rate
    let since = as_of - Duration::days(RECENT_WINDOW_DAYS);
    let recent: Vec<_> = records
        .iter()
        .filter(|r| r.date >= since && r.date <= as_of)
        .collect();
    if !recent.is_empty() {
        let rate = recent.iter().filter(|r| r.is_present()).count() as f64 / recent.len() as f64;
        if rate < 0.8 {
            found.push(report(
                AnomalyType::LowAttendance,
                format!(
                    "Attendance rate of {:.1}% in last {RECENT_WINDOW_DAYS} days",
                    rate * 100.0
                ),
                Severity::Medium,
                1.0 - rate,
            ));
        }
    }

    found
}

/// Fixed heuristics over late check-ins, early check-outs, absences and the recent rate.
pub struct RuleBasedStrategy {
    repo: Arc<dyn AttendanceRepository>,
    reference_date: Option<NaiveDate>,
}

impl RuleBasedStrategy {
    pub fn new(repo: Arc<dyn AttendanceRepository>) -> Self {
        Self {
            repo,
            reference_date: None,
        }
    }

    /// Pins the end of the recent-attendance window instead of using today.
    #[cfg(test)]
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }
}

#[async_trait]
impl AnomalyDetectionStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    async fn detect(&self, threshold: Threshold) -> Result<Vec<AnomalyRecord>, AnalyticsError> {
        let filter = AttendanceFilter::default();
        let records = self.repo.fetch_attendance(&filter).await?;
        if records.is_empty() {
            return Err(AnalyticsError::NoData(filter));
        }
        let employees = self.repo.fetch_employees().await?;
        let leaves = self.repo.fetch_leave_requests(None).await?;

        let mut records_by: HashMap<u64, Vec<AttendanceRecord>> = HashMap::new();
        for r in records {
            records_by.entry(r.employee_id).or_default().push(r);
        }
        let mut leaves_by: HashMap<u64, Vec<LeaveRequest>> = HashMap::new();
        for l in leaves {
            leaves_by.entry(l.employee_id).or_default().push(l);
        }

        let detected_at = Utc::now();
        let as_of = self
            .reference_date
            .unwrap_or_else(|| detected_at.date_naive());
        let min_score = 1.0 - threshold.value();

        let mut anomalies: Vec<AnomalyRecord> = employees
            .iter()
            .flat_map(|e| {
                let rows = records_by.get(&e.id).map(Vec::as_slice).unwrap_or_default();
                let leaves = leaves_by.get(&e.id).map(Vec::as_slice).unwrap_or_default();
                evaluate_employee(e, rows, leaves, as_of, detected_at)
            })
            .filter(|a| a.anomaly_score >= min_score)
            .collect();

        sort_by_score_desc(&mut anomalies);
        info!(
            anomalies = anomalies.len(),
            threshold = threshold.value(),
            "Rule-based scan finished"
        );
        Ok(anomalies)
    }
}
