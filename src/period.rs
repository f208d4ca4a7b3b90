//! Date ranges for the dashboard period tabs (day, week, month and year).

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

/// The length of time the dashboard summarises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    /// A single calendar day.
    Day,
    /// Monday to Sunday.
    Week,
    /// A calendar month.
    #[default]
    Month,
    /// A calendar year.
    Year,
}

impl Period {
    /// All periods in the order they are shown.
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    /// The label shown on the period tab.
    pub fn label(self) -> &'static str {
        match self {
            Period::Day => "Ngày",
            Period::Week => "Tuần",
            Period::Month => "Tháng",
            Period::Year => "Năm",
        }
    }

    /// The period that contains `anchor_date`.
    pub fn range(self, anchor_date: Date) -> DateRange {
        match self {
            Period::Day => DateRange {
                start: anchor_date,
                end: anchor_date,
            },
            Period::Week => week_bounds(anchor_date),
            Period::Month => month_bounds(anchor_date.year(), anchor_date.month()),
            Period::Year => year_bounds(anchor_date.year()),
        }
    }
}

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The last date in the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` lies within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// A label such as "1 Oct 2026 - 31 Oct 2026".
    pub fn label(&self) -> String {
        let start = format_date_label(self.start);
        let end = format_date_label(self.end);

        format!("{start} - {end}")
    }
}

fn week_bounds(anchor_date: Date) -> DateRange {
    let weekday_number = anchor_date.weekday().number_from_monday() as i64;
    let start = anchor_date - Duration::days(weekday_number - 1);
    let end = start + Duration::days(6);

    DateRange { start, end }
}

fn month_bounds(year: i32, month: Month) -> DateRange {
    let first = Date::from_calendar_date(year, month, 1);
    let next_year = if month == Month::December { year + 1 } else { year };
    let last = Date::from_calendar_date(next_year, month.next(), 1)
        .map(|next_first| next_first - Duration::days(1));

    match (first, last) {
        (Ok(start), Ok(end)) => DateRange { start, end },
        // Unreachable for dates within the supported year range.
        _ => DateRange {
            start: Date::MIN,
            end: Date::MAX,
        },
    }
}

fn year_bounds(year: i32) -> DateRange {
    let first = Date::from_calendar_date(year, Month::January, 1);
    let last = Date::from_calendar_date(year, Month::December, 31);

    match (first, last) {
        (Ok(start), Ok(end)) => DateRange { start, end },
        _ => DateRange {
            start: Date::MIN,
            end: Date::MAX,
        },
    }
}

fn format_date_label(date: Date) -> String {
    format!(
        "{} {} {}",
        date.day(),
        month_abbrev(date.month()),
        date.year()
    )
}

pub(crate) fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}
