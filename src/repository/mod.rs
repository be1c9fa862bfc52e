use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AnalyticsError;
use crate::model::{attendance::AttendanceRecord, employee::Employee, leave_request::LeaveRequest};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlAttendanceRepository;

/// Which attendance rows to read. `None` means "no restriction".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub employee_id: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn for_employee(employee_id: Option<u64>) -> Self {
        Self {
            employee_id,
            ..Self::default()
        }
    }

    pub fn between(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.employee_id.is_none_or(|id| id == record.employee_id)
            && self.start_date.is_none_or(|d| record.date >= d)
            && self.end_date.is_none_or(|d| record.date <= d)
    }
}

impl fmt::Display for AttendanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.employee_id {
            Some(id) => write!(f, "employee {id}")?,
            None => f.write_str("all employees")?,
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => write!(f, " between {start} and {end}"),
            (Some(start), None) => write!(f, " from {start}"),
            (None, Some(end)) => write!(f, " until {end}"),
            (None, None) => Ok(()),
        }
    }
}

/// Read-only source of the rows the analytics work on.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Rows ordered by employee, then date ascending.
    async fn fetch_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AnalyticsError>;

    async fn fetch_employees(&self) -> Result<Vec<Employee>, AnalyticsError>;

    async fn fetch_leave_requests(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<LeaveRequest>, AnalyticsError>;
}
