//! Worklog modifier expressions.
//!
//! A modifier is a signed duration shorthand of the form `[+-][0-9]+[smh]`,
//! e.g. `+30m` or `-2h`, used to shift the last worklog's timestamp. The sign
//! is mandatory and the whole expression must match; trailing characters are
//! rejected. The unit is case-insensitive.

use chrono::Duration;

use crate::error::{Error, Result};

/// Parse a modifier expression into a signed duration.
pub fn parse_modifier(expr: &str) -> Result<Duration> {
    let mut chars = expr.chars();

    let sign: i64 = match chars.next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Err(bad_expression(expr)),
    };

    let body = chars.as_str();
    let Some(unit) = body.chars().last() else {
        return Err(bad_expression(expr));
    };

    let digits = &body[..body.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_expression(expr));
    }

    let magnitude: i64 = digits.parse().map_err(|_| bad_expression(expr))?;
    let offset = sign * magnitude;

    match unit.to_ascii_lowercase() {
        's' => Ok(Duration::seconds(offset)),
        'm' => Ok(Duration::minutes(offset)),
        'h' => Ok(Duration::hours(offset)),
        _ => Err(bad_expression(expr)),
    }
}

fn bad_expression(expr: &str) -> Error {
    Error::Parse(format!(
        "expression {expr:?} does not match required format: [+-][0-9]+[smh]"
    ))
}
