use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    Holiday,
}

/// One day of attendance for one employee, as read from storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "date": "2024-03-04",
    "checkin_time": "08:57:00",
    "checkout_time": "17:31:00",
    "status": "present"
}))]
pub struct AttendanceRecord {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "08:57:00", value_type = Option<String>, nullable = true)]
    pub checkin_time: Option<NaiveTime>,
    #[schema(example = "17:31:00", value_type = Option<String>, nullable = true)]
    pub checkout_time: Option<NaiveTime>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_parses_database_values() {
        assert_eq!(AttendanceStatus::from_str("present").unwrap(), AttendanceStatus::Present);
        assert_eq!(AttendanceStatus::from_str("Absent").unwrap(), AttendanceStatus::Absent);
        assert!(AttendanceStatus::from_str("remote").is_err());
        assert_eq!(AttendanceStatus::Holiday.as_ref(), "holiday");
    }
}
