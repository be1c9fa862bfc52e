use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, MySqlPool};

use super::{AttendanceFilter, AttendanceRepository};
use crate::error::AnalyticsError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    employee::Employee,
    leave_request::LeaveRequest,
};

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

#[derive(FromRow)]
struct AttendanceRow {
    employee_id: u64,
    date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AnalyticsError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| {
            AnalyticsError::InvalidRecord(format!(
                "unknown status '{}' for employee {} on {}",
                row.status, row.employee_id, row.date
            ))
        })?;

        Ok(AttendanceRecord {
            employee_id: row.employee_id,
            date: row.date,
            checkin_time: row.check_in,
            checkout_time: row.check_out,
            status,
        })
    }
}

pub struct MySqlAttendanceRepository {
    pool: MySqlPool,
}

impl MySqlAttendanceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for MySqlAttendanceRepository {
    async fn fetch_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AnalyticsError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(emp_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }
        if let Some(start) = filter.start_date {
            where_sql.push_str(" AND date >= ?");
            args.push(FilterValue::Date(start));
        }
        if let Some(end) = filter.end_date {
            where_sql.push_str(" AND date <= ?");
            args.push(FilterValue::Date(end));
        }

        let data_sql = format!(
            r#"
            SELECT employee_id, date, check_in, check_out, status
            FROM attendance
            {}
            ORDER BY employee_id, date
            "#,
            where_sql
        );

        let mut data_q = sqlx::query_as::<_, AttendanceRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Date(d) => data_q.bind(d),
            };
        }

        let rows = data_q.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, %filter, "Failed to fetch attendance");
            AnalyticsError::from(e)
        })?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn fetch_employees(&self) -> Result<Vec<Employee>, AnalyticsError> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, CONCAT_WS(' ', first_name, last_name) AS name
            FROM employees
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch employees");
            AnalyticsError::from(e)
        })?;

        Ok(employees)
    }

    async fn fetch_leave_requests(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<LeaveRequest>, AnalyticsError> {
        let mut sql = String::from(
            "SELECT id, employee_id, start_date, end_date, leave_type, status FROM leave_requests",
        );
        if employee_id.is_some() {
            sql.push_str(" WHERE employee_id = ?");
        }
        sql.push_str(" ORDER BY employee_id, start_date");

        let mut query = sqlx::query_as::<_, LeaveRequest>(&sql);
        if let Some(id) = employee_id {
            query = query.bind(id);
        }

        let leaves = query.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, ?employee_id, "Failed to fetch leave requests");
            AnalyticsError::from(e)
        })?;

        Ok(leaves)
    }
}
