//! US federal holiday calendar used as forecast regressors.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    days: BTreeMap<NaiveDate, String>,
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = next_month.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}

impl HolidayCalendar {
    /// Every holiday in the given calendar years.
    pub fn united_states(years: RangeInclusive<i32>) -> Self {
        let mut calendar = HolidayCalendar::default();
        for year in years {
            calendar.add_fixed(NaiveDate::from_ymd_opt(year, 1, 1), "New Year's Day");
            calendar.add(nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day");
            calendar.add(nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday");
            calendar.add(last_weekday(year, 5, Weekday::Mon), "Memorial Day");
            if year >= 2021 {
                calendar.add_fixed(
                    NaiveDate::from_ymd_opt(year, 6, 19),
                    "Juneteenth National Independence Day",
                );
            }
            calendar.add_fixed(NaiveDate::from_ymd_opt(year, 7, 4), "Independence Day");
            calendar.add(nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day");
            calendar.add(nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day");
            calendar.add_fixed(NaiveDate::from_ymd_opt(year, 11, 11), "Veterans Day");
            calendar.add(nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving");
            calendar.add_fixed(NaiveDate::from_ymd_opt(year, 12, 25), "Christmas Day");
        }
        calendar
    }

    fn add(&mut self, date: Option<NaiveDate>, name: &str) {
        if let Some(date) = date {
            self.days.entry(date).or_insert_with(|| name.to_string());
        }
    }

    /// Fixed-date holidays on a weekend are also observed on the nearest weekday.
    fn add_fixed(&mut self, date: Option<NaiveDate>, name: &str) {
        let Some(date) = date else { return };
        self.add(Some(date), name);
        let observed = match date.weekday() {
            Weekday::Sat => Some(date - Duration::days(1)),
            Weekday::Sun => Some(date + Duration::days(1)),
            _ => None,
        };
        self.add(observed, &format!("{name} (observed)"));
    }

    pub fn name(&self, date: NaiveDate) -> Option<&str> {
        self.days.get(&date).map(String::as_str)
    }

    /// Distinct holiday names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.days.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.days.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::date;

    #[test]
    fn floating_holidays_2024() {
        let cal = HolidayCalendar::united_states(2024..=2024);
        assert_eq!(cal.name(date("2024-01-15")), Some("Martin Luther King Jr. Day"));
        assert_eq!(cal.name(date("2024-05-27")), Some("Memorial Day"));
        assert_eq!(cal.name(date("2024-09-02")), Some("Labor Day"));
        assert_eq!(cal.name(date("2024-11-28")), Some("Thanksgiving"));
        assert!(cal.name(date("2024-07-04")).is_some());
        assert!(cal.name(date("2024-07-05")).is_none());
        assert_eq!(cal.len(), 11);
    }

    #[test]
    fn weekend_holidays_get_observed_days() {
        let cal = HolidayCalendar::united_states(2022..=2026);
        // Christmas 2022 was a Sunday
        assert_eq!(cal.name(date("2022-12-26")), Some("Christmas Day (observed)"));
        // Independence Day 2026 is a Saturday
        assert_eq!(cal.name(date("2026-07-03")), Some("Independence Day (observed)"));
        assert!(cal.names().contains(&"Juneteenth National Independence Day".to_string()));
    }

    #[test]
    fn juneteenth_only_from_2021() {
        let cal = HolidayCalendar::united_states(2020..=2020);
        assert!(cal.name(date("2020-06-19")).is_none());
    }
}
