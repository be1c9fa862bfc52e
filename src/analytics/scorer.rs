use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use actix_web::rt::task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info};

use super::AnomalyDetectionStrategy;
use super::features::{FeatureVector, extract_features, feature_matrix, standardize};
use super::isolation_forest::{ForestParams, IsolationForest};
use crate::error::AnalyticsError;
use crate::model::anomaly::{AnomalyRecord, AnomalyType, Severity, Threshold, sort_by_score_desc};
use crate::model::{attendance::AttendanceRecord, employee::Employee};
use crate::repository::{AttendanceFilter, AttendanceRepository};

const LATE_CHECKIN_HOUR: u32 = 9;
const EARLY_CHECKOUT_HOUR: u32 = 16;
const LOW_ATTENDANCE_RATE: f64 = 0.8;

/// First matching rule wins.
pub fn classify(feature: &FeatureVector) -> AnomalyType {
    if feature.checkin_hour() >= LATE_CHECKIN_HOUR {
        AnomalyType::LateCheckin
    } else if feature.checkout_hour() <= EARLY_CHECKOUT_HOUR {
        AnomalyType::EarlyCheckout
    } else if feature.attendance_rate < LOW_ATTENDANCE_RATE {
        AnomalyType::LowAttendance
    } else {
        AnomalyType::IrregularPattern
    }
}

fn clock(minutes: f64) -> String {
    let minutes = minutes as u32;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn describe(kind: AnomalyType, record: &AttendanceRecord, feature: &FeatureVector) -> String {
    match kind {
        AnomalyType::LateCheckin => {
            format!("Checked in at {} on {}", clock(feature.checkin_minutes), record.date)
        }
        AnomalyType::EarlyCheckout if record.checkout_time.is_none() => {
            format!("No check-out recorded on {} (status: {})", record.date, record.status)
        }
        AnomalyType::EarlyCheckout => {
            format!("Checked out at {} on {}", clock(feature.checkout_minutes), record.date)
        }
        AnomalyType::LowAttendance => format!(
            "Attendance rate of {:.1}% with an unusual day on {}",
            feature.attendance_rate * 100.0,
            record.date
        ),
        _ => format!(
            "Unusual check-in/check-out combination on {} ({} - {})",
            record.date,
            clock(feature.checkin_minutes),
            clock(feature.checkout_minutes)
        ),
    }
}

/// Fits a forest on one employee's history and returns the records whose score falls below
/// the threshold's cutoff, in input order.
pub fn score_employee(
    employee: &Employee,
    records: &[AttendanceRecord],
    threshold: Threshold,
    params: &ForestParams,
    detected_at: DateTime<Utc>,
) -> Result<Vec<AnomalyRecord>, AnalyticsError> {
    if records.len() < 2 {
        return Err(AnalyticsError::DegenerateInput {
            employee_id: employee.id,
            records: records.len(),
        });
    }

    let features = extract_features(records)?;
    let mut matrix = feature_matrix(&features);
    standardize(&mut matrix);

    let forest = IsolationForest::fit(matrix.view(), params).map_err(|e| match e {
        AnalyticsError::ModelFit { reason, .. } => {
            AnalyticsError::model_fit(format!("employee {}", employee.id), reason)
        }
        other => other,
    })?;
    let scores = forest.decision_function(matrix.view());
    let cutoff = threshold.cutoff();

    Ok(records
        .iter()
        .zip(&features)
        .zip(scores.iter().copied())
        .filter(|&(_, score)| score < cutoff)
        .map(|((record, feature), score)| {
            let anomaly_type = classify(feature);
            AnomalyRecord {
                employee_id: employee.id,
                employee_name: employee.name.clone(),
                anomaly_type,
                description: describe(anomaly_type, record, feature),
                severity: Severity::from_cutoff_distance(cutoff, score),
                detected_date: detected_at,
                anomaly_score: score.abs(),
            }
        })
        .collect())
}

/// Per-employee isolation forest over check-in, check-out and attendance rate.
pub struct IsolationForestStrategy {
    repo: Arc<dyn AttendanceRepository>,
    params: ForestParams,
}

impl IsolationForestStrategy {
    pub fn new(repo: Arc<dyn AttendanceRepository>, params: ForestParams) -> Self {
        Self { repo, params }
    }
}

#[async_trait]
impl AnomalyDetectionStrategy for IsolationForestStrategy {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    async fn detect(&self, threshold: Threshold) -> Result<Vec<AnomalyRecord>, AnalyticsError> {
        let filter = AttendanceFilter::default();
        let records = self.repo.fetch_attendance(&filter).await?;
        if records.is_empty() {
            return Err(AnalyticsError::NoData(filter));
        }

        let names: HashMap<u64, String> = self
            .repo
            .fetch_employees()
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();

        let mut by_employee: BTreeMap<u64, Vec<AttendanceRecord>> = BTreeMap::new();
        for record in records {
            by_employee.entry(record.employee_id).or_default().push(record);
        }

        let detected_at = Utc::now();
        let employee_count = by_employee.len();

        // each employee is fitted on its own blocking worker
        let jobs = by_employee.into_iter().map(|(id, rows)| {
            let employee = Employee {
                id,
                name: names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format!("Employee {id}")),
            };
            let params = self.params;
            task::spawn_blocking(move || {
                score_employee(&employee, &rows, threshold, &params, detected_at)
            })
        });

        let mut anomalies = Vec::new();
        for joined in join_all(jobs).await {
            match joined.map_err(|e| AnalyticsError::Task(e.to_string()))? {
                Ok(found) => anomalies.extend(found),
                Err(AnalyticsError::DegenerateInput {
                    employee_id,
                    records,
                }) => {
                    debug!(employee_id, records, "Skipping employee with too few records");
                }
                Err(e) => return Err(e),
            }
        }

        sort_by_score_desc(&mut anomalies);
        info!(
            employees = employee_count,
            anomalies = anomalies.len(),
            threshold = threshold.value(),
            "Isolation forest scan finished"
        );
        Ok(anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::InMemoryRepository;
    use crate::test_support::{absent, employee, present, regular_history};
    use std::collections::HashSet;

    fn threshold(t: f64) -> Threshold {
        Threshold::try_from(t).unwrap()
    }

    fn history_with_bad_day(employee_id: u64) -> Vec<AttendanceRecord> {
        let mut rows = regular_history(employee_id, "2024-03-04", "2024-03-29");
        rows.push(present(employee_id, "2024-04-01", "11:40", "14:05"));
        rows
    }

    fn feature(checkin: f64, checkout: f64, rate: f64) -> FeatureVector {
        FeatureVector {
            checkin_minutes: checkin,
            checkout_minutes: checkout,
            attendance_rate: rate,
        }
    }

    #[test]
    fn classification_is_first_match() {
        // late and early at once: late wins
        assert_eq!(classify(&feature(9.0 * 60.0, 15.0 * 60.0, 0.5)), AnomalyType::LateCheckin);
        assert_eq!(classify(&feature(8.0 * 60.0, 16.0 * 60.0 + 59.0, 0.5)), AnomalyType::EarlyCheckout);
        assert_eq!(classify(&feature(8.0 * 60.0, 17.0 * 60.0, 0.5)), AnomalyType::LowAttendance);
        assert_eq!(classify(&feature(8.0 * 60.0, 17.0 * 60.0, 0.9)), AnomalyType::IrregularPattern);
        // missing times read as midnight
        assert_eq!(classify(&feature(0.0, 0.0, 0.0)), AnomalyType::EarlyCheckout);
    }

    #[test]
    fn unusual_day_is_flagged_at_full_sensitivity() {
        let rows = history_with_bad_day(5);
        let found =
            score_employee(&employee(5, "Ada"), &rows, threshold(1.0), &ForestParams::default(), Utc::now())
                .unwrap();
        let bad = found
            .iter()
            .find(|a| a.description.contains("2024-04-01"))
            .expect("the 11:40 check-in should be flagged");
        assert_eq!(bad.anomaly_type, AnomalyType::LateCheckin);
        assert_eq!(bad.employee_name, "Ada");
        assert!(bad.anomaly_score > 0.0);
    }

    #[test]
    fn zero_threshold_flags_nothing() {
        let rows = history_with_bad_day(5);
        let found =
            score_employee(&employee(5, "Ada"), &rows, threshold(0.0), &ForestParams::default(), Utc::now())
                .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn flagged_sets_grow_with_threshold() {
        let mut rows = history_with_bad_day(5);
        rows.push(present(5, "2024-04-02", "08:05", "19:45"));
        rows.push(absent(5, "2024-04-03"));
        let emp = employee(5, "Ada");
        let now = Utc::now();

        let flagged = |t: f64| -> HashSet<String> {
            score_employee(&emp, &rows, threshold(t), &ForestParams::default(), now)
                .unwrap()
                .into_iter()
                .map(|a| a.description)
                .collect()
        };

        let steps = [0.0, 0.25, 0.5, 0.6, 0.75, 0.9, 1.0];
        for pair in steps.windows(2) {
            let lower = flagged(pair[0]);
            let higher = flagged(pair[1]);
            assert!(lower.is_subset(&higher), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn single_record_is_degenerate() {
        let rows = vec![present(3, "2024-03-04", "08:30", "17:00")];
        let err = score_employee(&employee(3, "Bo"), &rows, threshold(1.0), &ForestParams::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::DegenerateInput { employee_id: 3, records: 1 }));
    }

    #[test]
    fn identical_records_do_not_blow_up() {
        let rows = vec![
            present(3, "2024-03-04", "08:30", "17:00"),
            present(3, "2024-03-04", "08:30", "17:00"),
        ];
        let found =
            score_employee(&employee(3, "Bo"), &rows, threshold(1.0), &ForestParams::default(), Utc::now())
                .unwrap();
        assert!(found.is_empty());
    }

    fn repo_with(attendance: Vec<AttendanceRecord>, employees: Vec<Employee>) -> Arc<dyn AttendanceRepository> {
        Arc::new(InMemoryRepository {
            employees,
            attendance,
            leaves: Vec::new(),
        })
    }

    fn organisation() -> Arc<dyn AttendanceRepository> {
        let mut attendance = Vec::new();
        let mut employees = Vec::new();
        for id in 1..=11 {
            employees.push(employee(id, &format!("Employee {id}")));
            attendance.extend(regular_history(id, "2024-03-04", "2024-03-29"));
            if id % 3 == 0 {
                attendance.push(present(id, "2024-04-01", "10:50", "15:20"));
            }
        }
        // only absences, no leave requests
        employees.push(employee(12, "Never Here"));
        for day in ["2024-03-04", "2024-03-05", "2024-03-06", "2024-03-07", "2024-03-08"] {
            attendance.push(absent(12, day));
        }
        // one row only
        employees.push(employee(13, "New Hire"));
        attendance.push(present(13, "2024-03-29", "12:00", "13:00"));
        repo_with(attendance, employees)
    }

    #[actix_web::test]
    async fn organisation_scan_is_sorted_and_skips_degenerate_employees() {
        let strategy = IsolationForestStrategy::new(organisation(), ForestParams::default());
        let anomalies = strategy.detect(threshold(1.0)).await.unwrap();

        assert!(!anomalies.is_empty());
        assert!(
            anomalies
                .windows(2)
                .all(|w| w[0].anomaly_score >= w[1].anomaly_score)
        );
        assert!(anomalies.iter().all(|a| a.employee_id != 13));
        // constant features score exactly zero, which is never below a cutoff
        assert!(anomalies.iter().all(|a| a.employee_id != 12));
    }

    #[actix_web::test]
    async fn default_threshold_scan_with_absent_only_employee_succeeds() {
        let strategy = IsolationForestStrategy::new(organisation(), ForestParams::default());
        let anomalies = strategy.detect(Threshold::default()).await.unwrap();
        // cutoff is -0.5, so anything reported scored at least that far out
        assert!(anomalies.iter().all(|a| a.anomaly_score > 0.5));
        assert!(anomalies.iter().all(|a| a.employee_id != 12));
    }

    #[actix_web::test]
    async fn repeated_scans_are_identical() {
        let strategy = IsolationForestStrategy::new(organisation(), ForestParams::default());
        let first = strategy.detect(threshold(1.0)).await.unwrap();
        let second = strategy.detect(threshold(1.0)).await.unwrap();
        let key = |v: &[AnomalyRecord]| -> Vec<(u64, String, f64)> {
            v.iter()
                .map(|a| (a.employee_id, a.description.clone(), a.anomaly_score))
                .collect()
        };
        assert_eq!(key(&first), key(&second));
    }

    #[actix_web::test]
    async fn empty_store_is_no_data() {
        let strategy = IsolationForestStrategy::new(repo_with(Vec::new(), Vec::new()), ForestParams::default());
        assert!(matches!(
            strategy.detect(Threshold::default()).await,
            Err(AnalyticsError::NoData(_))
        ));
    }
}
