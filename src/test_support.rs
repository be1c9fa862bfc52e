//! Record builders shared by the unit tests.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    employee::Employee,
    leave_request::LeaveRequest,
};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

pub fn present(employee_id: u64, day: &str, checkin: &str, checkout: &str) -> AttendanceRecord {
    AttendanceRecord {
        employee_id,
        date: date(day),
        checkin_time: Some(time(checkin)),
        checkout_time: Some(time(checkout)),
        status: AttendanceStatus::Present,
    }
}

pub fn absent(employee_id: u64, day: &str) -> AttendanceRecord {
    AttendanceRecord {
        employee_id,
        date: date(day),
        checkin_time: None,
        checkout_time: None,
        status: AttendanceStatus::Absent,
    }
}

pub fn employee(id: u64, name: &str) -> Employee {
    Employee {
        id,
        name: name.to_string(),
    }
}

pub fn leave(employee_id: u64, start: &str, end: &str, status: &str) -> LeaveRequest {
    LeaveRequest {
        id: employee_id * 100,
        employee_id,
        start_date: date(start),
        end_date: date(end),
        leave_type: "annual".to_string(),
        status: Some(status.to_string()),
    }
}

/// Monday-to-Friday dates in `[start, end]`.
pub fn weekdays(start: &str, end: &str) -> Vec<NaiveDate> {
    let end = date(end);
    date(start)
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// A steady 08:xx / 17:xx history, one present row per weekday.
pub fn regular_history(employee_id: u64, start: &str, end: &str) -> Vec<AttendanceRecord> {
    weekdays(start, end)
        .into_iter()
        .enumerate()
        .map(|(i, d)| AttendanceRecord {
            employee_id,
            date: d,
            checkin_time: NaiveTime::from_hms_opt(8, 30 + (i % 7) as u32 * 3, 0),
            checkout_time: NaiveTime::from_hms_opt(17, 10 + (i % 5) as u32 * 4, 0),
            status: AttendanceStatus::Present,
        })
        .collect()
}
