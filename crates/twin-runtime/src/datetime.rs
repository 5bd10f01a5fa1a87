//! Wall-clock stamps.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Current UTC time as RFC 3339 with millisecond precision.
pub(crate) fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

pub(crate) fn format_rfc3339(at: OffsetDateTime) -> String {
    let at = at
        .replace_nanosecond(u32::from(at.millisecond()) * 1_000_000)
        .unwrap_or(at);
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// RFC 3339 stamp with `:` and `.` replaced, usable in file names.
pub(crate) fn file_stamp(at: OffsetDateTime) -> String {
    format_rfc3339(at).replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn stamps_keep_millis() {
        let at = datetime!(2024-05-01 10:20:30.123_456 UTC);
        assert_eq!(format_rfc3339(at), "2024-05-01T10:20:30.123Z");
        assert_eq!(file_stamp(at), "2024-05-01T10-20-30-123Z");
    }
}
