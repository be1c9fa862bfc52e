use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub status: Option<String>,
}

impl LeaveRequest {
    /// Pending and approved requests both excuse an absence; rejected ones do not.
    pub fn covers(&self, date: NaiveDate) -> bool {
        let rejected = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("rejected"));
        !rejected && self.start_date <= date && date <= self.end_date
    }
}
