use async_trait::async_trait;

use super::{AttendanceFilter, AttendanceRepository};
use crate::error::AnalyticsError;
use crate::model::{attendance::AttendanceRecord, employee::Employee, leave_request::LeaveRequest};

/// Fixed in-memory data set for exercising the analytics without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    pub employees: Vec<Employee>,
    pub attendance: Vec<AttendanceRecord>,
    pub leaves: Vec<LeaveRequest>,
}

#[async_trait]
impl AttendanceRepository for InMemoryRepository {
    async fn fetch_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AnalyticsError> {
        let mut rows: Vec<_> = self
            .attendance
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.employee_id, r.date));
        Ok(rows)
    }

    async fn fetch_employees(&self) -> Result<Vec<Employee>, AnalyticsError> {
        Ok(self.employees.clone())
    }

    async fn fetch_leave_requests(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<LeaveRequest>, AnalyticsError> {
        Ok(self
            .leaves
            .iter()
            .filter(|l| employee_id.is_none_or(|id| id == l.employee_id))
            .cloned()
            .collect())
    }
}
