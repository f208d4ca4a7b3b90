//! Resolves the configured timezone and the current local time.

use time::{OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use time_tz::{Offset, TimeZone};

/// The timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Ho_Chi_Minh";

/// Get the current UTC offset of a canonical timezone name, e.g. "Asia/Ho_Chi_Minh".
///
/// Returns `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current wall-clock time at `offset`, truncated to the minute.
pub(crate) fn now_local(offset: UtcOffset) -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let time = Time::from_hms(now.hour(), now.minute(), 0).unwrap_or(now.time());

    PrimitiveDateTime::new(now.date(), time)
}
