//! Holiday-aware additive forecast of the present/absent signal.
//!
//! `y(t) = trend(t) + yearly(t) + weekly(t) + holidays(t)`, fitted as a MAP estimate under
//! Gaussian priors, which reduces to ridge regression with per-column penalties.

use std::collections::HashMap;
use std::f64::consts::PI;

use actix_web::rt::task;
use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, Array2};
use tracing::debug;

use super::holidays::HolidayCalendar;
use crate::error::AnalyticsError;
use crate::model::attendance::AttendanceRecord;
use crate::repository::{AttendanceFilter, AttendanceRepository};

const YEARLY_PERIOD_DAYS: f64 = 365.25;
const WEEKLY_PERIOD_DAYS: f64 = 7.0;
const YEARLY_MIN_SPAN_DAYS: i64 = 730;
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastParams {
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub trend_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    /// Holidays are expected dips unless the history says otherwise.
    pub holiday_prior_mean: f64,
    pub observation_noise: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            trend_prior_scale: 5.0,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            holiday_prior_mean: -1.0,
            observation_noise: 0.5,
            yearly_order: 10,
            weekly_order: 3,
        }
    }
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - 719_163)
}

fn push_fourier(row: &mut Vec<f64>, days: f64, period: f64, order: usize) {
    for k in 1..=order {
        let x = 2.0 * PI * k as f64 * days / period;
        row.push(x.sin());
        row.push(x.cos());
    }
}

/// Column layout of the regression; shared by fitting and prediction.
#[derive(Debug, Clone)]
struct Design {
    start: NaiveDate,
    span_days: f64,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
    calendar: HolidayCalendar,
    holiday_columns: HashMap<String, usize>,
}

impl Design {
    fn width(&self) -> usize {
        2 + self.changepoints.len()
            + 2 * self.yearly_order
            + 2 * self.weekly_order
            + self.holiday_columns.len()
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let t = self.scaled_time(date);
        let days = days_since_epoch(date);

        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));
        push_fourier(&mut row, days, YEARLY_PERIOD_DAYS, self.yearly_order);
        push_fourier(&mut row, days, WEEKLY_PERIOD_DAYS, self.weekly_order);

        let holiday_start = row.len();
        row.resize(self.width(), 0.0);
        if let Some(column) = self
            .calendar
            .name(date)
            .and_then(|name| self.holiday_columns.get(name))
        {
            row[holiday_start + column] = 1.0;
        }
        row
    }

    /// Per-column prior precision (relative to the noise) and prior mean.
    fn priors(&self, params: &ForecastParams) -> (Array1<f64>, Array1<f64>) {
        let noise = params.observation_noise.powi(2);
        let penalty = |scale: f64| noise / scale.powi(2);

        let mut precision = Vec::with_capacity(self.width());
        let mut mean = Vec::with_capacity(self.width());
        let mut push = |count: usize, scale: f64, centre: f64| {
            for _ in 0..count {
                precision.push(penalty(scale));
                mean.push(centre);
            }
        };
        push(2, params.trend_prior_scale, 0.0);
        push(self.changepoints.len(), params.changepoint_prior_scale, 0.0);
        push(
            2 * (self.yearly_order + self.weekly_order),
            params.seasonality_prior_scale,
            0.0,
        );
        push(
            self.holiday_columns.len(),
            params.holidays_prior_scale,
            params.holiday_prior_mean,
        );
        (Array1::from(precision), Array1::from(mean))
    }
}

/// Solves `a x = b` for symmetric positive definite `a` by Cholesky factorisation.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let d = a[[i, i]] - sum;
                if !d.is_finite() || d <= 0.0 {
                    return None;
                }
                l[[i, i]] = d.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // forward: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }
    // backward: L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }
    Some(x)
}

/// A fitted model. Built for one request and dropped afterwards.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    design: Design,
    coefficients: Array1<f64>,
    y_scale: f64,
}

impl ForecastModel {
    /// Raw model output on the occupancy scale.
    pub fn yhat(&self, date: NaiveDate) -> f64 {
        let row = Array1::from(self.design.row(date));
        row.dot(&self.coefficients) * self.y_scale
    }

    /// Attendance probability for `date` as a percentage in `[0, 100]`.
    pub fn predict(&self, date: NaiveDate) -> f64 {
        self.yhat(date).clamp(0.0, 1.0) * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine {
    params: ForecastParams,
}

impl ForecastEngine {
    /// Fits on the `present` rows of `records`; `scope` only labels errors.
    pub fn fit(
        &self,
        records: &[AttendanceRecord],
        scope: &AttendanceFilter,
    ) -> Result<ForecastModel, AnalyticsError> {
        let mut dates: Vec<NaiveDate> = records
            .iter()
            .filter(|r| r.is_present())
            .map(|r| r.date)
            .collect();
        if dates.is_empty() {
            return Err(AnalyticsError::NoData(*scope));
        }
        dates.sort();

        let fit_error = |reason: String| AnalyticsError::model_fit(scope.to_string(), reason);
        let n = dates.len();
        if n < 2 {
            return Err(fit_error(format!("need at least 2 present days, got {n}")));
        }
        let (start, end) = (dates[0], dates[n - 1]);
        let span = (end - start).num_days();
        if span == 0 {
            return Err(fit_error(format!("every present day falls on {start}")));
        }

        // every row carries the same occupancy signal of 1
        let y = Array1::<f64>::ones(n);
        let y_scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::EPSILON);
        let y = y / y_scale;

        let calendar = HolidayCalendar::united_states(start.year()..=end.year() + 1);
        let holiday_columns = calendar
            .names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let design = Design {
            start,
            span_days: span as f64,
            changepoints: self.changepoints(&dates, start, span as f64),
            yearly_order: if span >= YEARLY_MIN_SPAN_DAYS { self.params.yearly_order } else { 0 },
            weekly_order: if span >= WEEKLY_MIN_SPAN_DAYS { self.params.weekly_order } else { 0 },
            calendar,
            holiday_columns,
        };

        let width = design.width();
        let mut x = Array2::<f64>::zeros((n, width));
        for (mut row, date) in x.rows_mut().into_iter().zip(&dates) {
            row.assign(&Array1::from(design.row(*date)));
        }

        let (precision, prior_mean) = design.priors(&self.params);
        let mut normal = x.t().dot(&x);
        for (i, p) in precision.iter().enumerate() {
            normal[[i, i]] += p;
        }
        let rhs = x.t().dot(&y) + &(&precision * &prior_mean);

        let coefficients = solve_spd(&normal, &rhs)
            .ok_or_else(|| fit_error("normal equations are not positive definite".to_string()))?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(fit_error("regression produced non-finite coefficients".to_string()));
        }

        debug!(
            %scope,
            rows = n,
            columns = width,
            changepoints = design.changepoints.len(),
            holidays = design.calendar.len(),
            "Forecast model fitted"
        );

        Ok(ForecastModel {
            design,
            coefficients,
            y_scale,
        })
    }

    /// Evenly spaced over the first part of the history, in scaled time, without the origin.
    fn changepoints(&self, dates: &[NaiveDate], start: NaiveDate, span: f64) -> Vec<f64> {
        let hist_size = (dates.len() as f64 * self.params.changepoint_range).floor() as usize;
        let count = self.params.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (hist_size - 1) as f64;
        let mut points: Vec<f64> = (1..=count)
            .map(|i| (last * i as f64 / count as f64).round() as usize)
            .map(|idx| (dates[idx] - start).num_days() as f64 / span)
            .filter(|t| *t > 0.0)
            .collect();
        points.dedup();
        points
    }
}

/// Fetches, fits and predicts for one request.
pub async fn forecast_attendance(
    repo: &dyn AttendanceRepository,
    engine: ForecastEngine,
    employee_id: Option<u64>,
    target_date: NaiveDate,
) -> Result<f64, AnalyticsError> {
    let filter = AttendanceFilter::for_employee(employee_id);
    let records = repo.fetch_attendance(&filter).await?;
    if records.is_empty() {
        return Err(AnalyticsError::NoData(filter));
    }

    task::spawn_blocking(move || -> Result<f64, AnalyticsError> {
        let model = engine.fit(&records, &filter)?;
        Ok(model.predict(target_date))
    })
    .await
    .map_err(|e| AnalyticsError::Task(e.to_string()))?
}
