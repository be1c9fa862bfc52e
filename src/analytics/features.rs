use chrono::{NaiveTime, Timelike};
use ndarray::Array2;

use crate::error::AnalyticsError;
use crate::model::attendance::AttendanceRecord;
use crate::repository::AttendanceFilter;

/// Value used for a missing check-in or check-out.
///
/// Known limitation: this is the same value as a check-in at exactly midnight, so leave,
/// holiday and absent days land at the far edge of the time-of-day axis.
pub const MISSING_TIME_SENTINEL: f64 = 0.0;

pub const FEATURE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub checkin_minutes: f64,
    pub checkout_minutes: f64,
    /// Share of `present` rows over the employee's whole window; equal on every vector.
    pub attendance_rate: f64,
}

impl FeatureVector {
    pub fn checkin_hour(&self) -> u32 {
        (self.checkin_minutes / 60.0).floor() as u32
    }

    pub fn checkout_hour(&self) -> u32 {
        (self.checkout_minutes / 60.0).floor() as u32
    }
}

pub fn minutes_since_midnight(time: Option<NaiveTime>) -> f64 {
    time.map_or(MISSING_TIME_SENTINEL, |t| f64::from(t.hour() * 60 + t.minute()))
}

/// One vector per row of a single employee's history, in input order.
pub fn extract_features(records: &[AttendanceRecord]) -> Result<Vec<FeatureVector>, AnalyticsError> {
    let Some(first) = records.first() else {
        return Err(AnalyticsError::NoData(AttendanceFilter::default()));
    };
    if records.iter().any(|r| r.employee_id != first.employee_id) {
        return Err(AnalyticsError::InvalidInput(
            "feature extraction expects the rows of a single employee".to_string(),
        ));
    }

    let present = records.iter().filter(|r| r.is_present()).count();
    let attendance_rate = present as f64 / records.len() as f64;

    Ok(records
        .iter()
        .map(|r| FeatureVector {
            checkin_minutes: minutes_since_midnight(r.checkin_time),
            checkout_minutes: minutes_since_midnight(r.checkout_time),
            attendance_rate,
        })
        .collect())
}

/// Columns: checkin_minutes, checkout_minutes, attendance_rate.
pub fn feature_matrix(features: &[FeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::zeros((features.len(), FEATURE_COUNT));
    for (mut row, f) in matrix.rows_mut().into_iter().zip(features) {
        row[0] = f.checkin_minutes;
        row[1] = f.checkout_minutes;
        row[2] = f.attendance_rate;
    }
    matrix
}

/// Zero mean, unit (population) variance per column. Constant columns are only centred.
pub fn standardize(matrix: &mut Array2<f64>) {
    let n = matrix.nrows() as f64;
    if n == 0.0 {
        return;
    }
    for mut column in matrix.columns_mut() {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        column.mapv_inplace(|v| (v - mean) / scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{absent, present};

    #[test]
    fn rate_is_broadcast_to_every_vector() {
        let rows = vec![
            present(1, "2024-03-04", "08:30", "17:00"),
            present(1, "2024-03-05", "08:45", "17:15"),
            absent(1, "2024-03-06"),
            present(1, "2024-03-07", "09:10", "17:30"),
        ];
        let features = extract_features(&rows).unwrap();
        assert_eq!(features.len(), 4);
        assert!(features.iter().all(|f| f.attendance_rate == 0.75));
        assert_eq!(features[0].checkin_minutes, 510.0);
        assert_eq!(features[3].checkout_minutes, 1050.0);
    }

    #[test]
    fn missing_times_use_sentinel() {
        let features = extract_features(&[absent(2, "2024-03-06")]).unwrap();
        assert_eq!(features[0].checkin_minutes, MISSING_TIME_SENTINEL);
        assert_eq!(features[0].checkout_minutes, MISSING_TIME_SENTINEL);
        assert_eq!(features[0].attendance_rate, 0.0);
    }

    #[test]
    fn empty_input_is_no_data_not_nan() {
        assert!(matches!(extract_features(&[]), Err(AnalyticsError::NoData(_))));
    }

    #[test]
    fn mixed_employees_are_rejected() {
        let rows = vec![absent(1, "2024-03-06"), absent(2, "2024-03-06")];
        assert!(matches!(extract_features(&rows), Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn standardize_centres_and_scales() {
        let rows = vec![
            present(1, "2024-03-04", "08:00", "17:00"),
            present(1, "2024-03-05", "10:00", "17:00"),
        ];
        let mut m = feature_matrix(&extract_features(&rows).unwrap());
        standardize(&mut m);
        assert!((m[[0, 0]] + 1.0).abs() < 1e-12);
        assert!((m[[1, 0]] - 1.0).abs() < 1e-12);
        // constant columns stay finite
        assert_eq!(m[[0, 1]], 0.0);
        assert_eq!(m[[1, 2]], 0.0);
    }
}
