//! Disk-size policy for resize requests.
//!
//! Size slugs such as `512mb` or `2gb` are compared by their leading
//! integer, scaled by 1000 whenever the slug is not in megabytes.

/// Parses the leading integer of `raw` the way a lenient numeric prefix
/// parser does: leading whitespace and one sign are accepted, parsing stops
/// at the first non-digit, and a string with no leading digits has no value.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = trimmed
        .strip_prefix('-')
        .map(|rest| (true, rest))
        .or_else(|| trimmed.strip_prefix('+').map(|rest| (false, rest)))
        .unwrap_or((false, trimmed));
    let digits: Vec<i64> = unsigned
        .chars()
        .map_while(|ch| ch.to_digit(10))
        .map(i64::from)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits
        .into_iter()
        .fold(0_i64, |acc, digit| acc.saturating_mul(10).saturating_add(digit));
    Some(if negative { -magnitude } else { magnitude })
}

/// Normalises a size slug to an approximate megabyte figure.
#[must_use]
pub fn normalize_size(slug: &str) -> Option<i64> {
    let value = leading_integer(slug)?;
    if slug.contains("mb") {
        Some(value)
    } else {
        Some(value.saturating_mul(1000))
    }
}

/// Returns true when `new_size` is strictly larger than `old_size`. An
/// unparsable slug on either side never counts as an increase.
#[must_use]
pub fn is_disk_increase(old_size: &str, new_size: &str) -> bool {
    match (normalize_size(old_size), normalize_size(new_size)) {
        (Some(old), Some(new)) => new > old,
        _ => false,
    }
}
