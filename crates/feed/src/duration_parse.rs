// ABOUTME: Duration and NPT time-offset parsing for episodes and chapters.
// ABOUTME: Accepts plain (fractional) seconds and colon-delimited [[HH:]MM:]SS[.fraction].

/// Parses a duration or chapter offset into whole seconds.
///
/// Accepts:
/// - plain integer or fractional seconds (`"90"`, `"61.08"`)
/// - Normal Play Time `[[HH:]MM:]SS[.fraction]` (`"01:02:03"`, `"61:08"`)
///
/// The rightmost field holds seconds and may carry a fraction, which is
/// truncated. Every field to its left is an integer worth sixty times the
/// field after it. Any malformed field makes the whole value unknown: None
/// is returned rather than a partial number.
pub fn parse_duration_seconds(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let fields: Vec<&str> = s.split(':').collect();
    if fields.len() > 3 {
        return None;
    }

    let (seconds_field, larger) = fields.split_last()?;
    let mut total: u64 = 0;
    for field in larger {
        total = total.checked_mul(60)?.checked_add(parse_whole(field)?)?;
    }
    total = total.checked_mul(60)?.checked_add(parse_seconds(seconds_field)?)?;

    u32::try_from(total).ok()
}

/// Parses an integer NPT field: ASCII digits only.
fn parse_whole(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Parses the seconds field: digits with an optional `.fraction`, truncated.
fn parse_seconds(field: &str) -> Option<u64> {
    let field = field.trim();
    match field.split_once('.') {
        Some((whole, fraction)) => {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if whole.is_empty() && !fraction.is_empty() {
                return Some(0);
            }
            parse_whole(whole)
        }
        None => parse_whole(field),
    }
}
