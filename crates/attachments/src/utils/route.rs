//! Route-variable coercion.

/// Viewer ID used when the request carries no valid session
pub const NO_SESSION: i64 = 0;

/// Coerce a raw route variable to a non-negative ID.
///
/// Takes the optional sign and leading digits, then the absolute value.
/// Anything without leading digits becomes 0. Values beyond `i64::MAX`
/// saturate.
///
/// ```
/// use msgat_attachments::coerce_id;
///
/// assert_eq!(coerce_id("42"), 42);
/// assert_eq!(coerce_id("12abc"), 12);
/// assert_eq!(coerce_id("-7"), 7);
/// assert_eq!(coerce_id("abc"), 0);
/// ```
pub fn coerce_id(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    unsigned
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        })
}
