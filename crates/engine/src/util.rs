//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidField(format!("invalid {label} id")))
}

/// Tags are stored as a JSON array in a text column.
pub(crate) fn encode_tags(tags: &[String]) -> ResultEngine<String> {
    serde_json::to_string(tags).map_err(|err| EngineError::InvalidField(format!("tags: {err}")))
}

pub(crate) fn decode_tags(value: &str) -> ResultEngine<Vec<String>> {
    serde_json::from_str(value).map_err(|err| EngineError::InvalidField(format!("tags: {err}")))
}

/// Trim tags and drop empty ones, keeping the caller's order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidField(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_positive_amount(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn validate_non_negative_amount(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor < 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be >= 0")));
    }
    Ok(())
}

/// Adds `amount` to a running total, failing instead of wrapping.
pub(crate) fn add_to_total(total: i64, amount: i64, label: &str) -> ResultEngine<i64> {
    total
        .checked_add(amount)
        .ok_or_else(|| EngineError::InvalidAmount(format!("{label} overflows")))
}

/// `from` is inclusive and `to` is exclusive.
pub(crate) fn validate_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (from, to)
        && from >= to
    {
        return Err(EngineError::InvalidField(
            "invalid range: start must be < end".to_string(),
        ));
    }
    Ok(())
}

/// Case-insensitive `LIKE` pattern for substring search.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip_through_json() {
        let tags = vec!["work".to_string(), "travel".to_string()];
        let encoded = encode_tags(&tags).unwrap();
        assert_eq!(encoded, r#"["work","travel"]"#);
        assert_eq!(decode_tags(&encoded).unwrap(), tags);
    }

    #[test]
    fn normalize_tags_drops_blanks() {
        let tags = vec![" a ".to_string(), "  ".to_string(), "b".to_string()];
        assert_eq!(normalize_tags(tags), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" Food "), "%food%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn totals_do_not_wrap() {
        assert_eq!(add_to_total(1, 2, "total").unwrap(), 3);
        assert!(matches!(
            add_to_total(i64::MAX, 1, "total"),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn range_requires_start_before_end() {
        let now = Utc::now();
        assert!(validate_range(Some(now), Some(now)).is_err());
        assert!(validate_range(Some(now), None).is_ok());
    }
}
