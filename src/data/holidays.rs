//! Holiday calendars.
//!
//! The US calendar lists federal holidays on their nominal dates; observed-day
//! shifts (e.g. a Saturday holiday observed on Friday) are not applied.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::{Holiday, HolidayCalendar};

/// Holidays for every year touched by `[start, end]`, sorted by date.
pub fn holidays_between(calendar: HolidayCalendar, start: NaiveDate, end: NaiveDate, window: u32) -> Vec<Holiday> {
    match calendar {
        HolidayCalendar::None => Vec::new(),
        HolidayCalendar::Us => {
            let mut out: Vec<Holiday> = (start.year()..=end.year())
                .flat_map(us_federal_holidays)
                .map(|(date, label)| Holiday {
                    date,
                    label: label.to_string(),
                    window,
                })
                .collect();
            out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.label.cmp(&b.label)));
            out
        }
    }
}

/// US federal holidays in `year`.
pub fn us_federal_holidays(year: i32) -> Vec<(NaiveDate, &'static str)> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    let nth = |month, weekday, n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n);
    let last = |month, weekday| nth(month, weekday, 5).or_else(|| nth(month, weekday, 4));

    let mut out = vec![
        (fixed(1, 1), "New Year's Day"),
        (nth(1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth(2, Weekday::Mon, 3), "Washington's Birthday"),
        (last(5, Weekday::Mon), "Memorial Day"),
        (fixed(7, 4), "Independence Day"),
        (nth(9, Weekday::Mon, 1), "Labor Day"),
        (nth(10, Weekday::Mon, 2), "Columbus Day"),
        (fixed(11, 11), "Veterans Day"),
        (nth(11, Weekday::Thu, 4), "Thanksgiving"),
        (fixed(12, 25), "Christmas Day"),
    ];
    if year >= 2021 {
        out.push((fixed(6, 19), "Juneteenth"));
    }

    let mut dates: Vec<(NaiveDate, &'static str)> = out
        .into_iter()
        .filter_map(|(date, label)| date.map(|d| (d, label)))
        .collect();
    dates.sort();
    dates
}
