//! Parsing and formatting for the date-time of a transaction.
//!
//! Date-times are entered as free text, so parsing accepts a handful of
//! ISO 8601-like layouts and rejects everything else.

use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::ValidationError;

const MINUTE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const SECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const SUBSECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const SPACED_MINUTE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const SPACED_SECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SPACED_SUBSECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse the text of a date-time field.
///
/// Accepts `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DDTHH:MM:SS.fff`, the same layouts with a space instead of `T`,
/// and a bare `YYYY-MM-DD`, which is taken to mean midnight. Surrounding
/// whitespace is ignored.
///
/// RFC 3339 text with an offset, e.g. `2025-03-01T08:30:00.000Z`, is also
/// accepted and read as the wall-clock time in UTC.
///
/// # Errors
/// Returns [ValidationError::InvalidDateTime] if the text matches none of the
/// layouts or names a date or time that does not exist.
pub fn parse_date_time(text: &str) -> Result<PrimitiveDateTime, ValidationError> {
    let trimmed = text.trim();

    for format in [
        MINUTE_FORMAT,
        SECOND_FORMAT,
        SUBSECOND_FORMAT,
        SPACED_MINUTE_FORMAT,
        SPACED_SECOND_FORMAT,
        SPACED_SUBSECOND_FORMAT,
    ] {
        if let Ok(date_time) = PrimitiveDateTime::parse(trimmed, format) {
            return Ok(date_time);
        }
    }

    if let Ok(date_time) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        let utc = date_time.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }

    Date::parse(trimmed, DATE_FORMAT)
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT))
        .map_err(|_| ValidationError::InvalidDateTime(text.to_owned()))
}

/// Format a date-time the way it is persisted.
///
/// Seconds and fractions of a second are only written when they are
/// non-zero, so date-times entered with minute precision keep the
/// `YYYY-MM-DDTHH:MM` shape and finer date-times read back unchanged.
pub fn format_date_time(date_time: PrimitiveDateTime) -> String {
    let format = if date_time.nanosecond() != 0 {
        SUBSECOND_FORMAT
    } else if date_time.second() != 0 {
        SECOND_FORMAT
    } else {
        MINUTE_FORMAT
    };

    // Only fails for years outside of 0000..=9999, which the parser never produces.
    date_time
        .format(format)
        .unwrap_or_else(|_| date_time.to_string())
}

/// Serde adapter that stores a [PrimitiveDateTime] as [format_date_time] text.
pub(crate) mod serde_format {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::PrimitiveDateTime;

    use super::{format_date_time, parse_date_time};

    pub fn serialize<S: Serializer>(
        date_time: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date_time(*date_time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PrimitiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;

        parse_date_time(&text).map_err(D::Error::custom)
    }
}
