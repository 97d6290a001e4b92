//! Timestamp renderings used on the wire.

use time::{
    OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

/// IMF-fixdate layout required by `Last-Modified` (RFC 9110 §5.6.7).
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// RFC 3339 string for response metadata.
pub fn rfc3339(at: OffsetDateTime) -> String {
    at.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// HTTP date; `None` when the instant cannot be represented (four-digit years only).
pub fn http_date(at: OffsetDateTime) -> Option<String> {
    at.to_offset(UtcOffset::UTC).format(HTTP_DATE).ok()
}
