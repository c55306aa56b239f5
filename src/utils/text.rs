use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;

use super::error::{AppError, AppResult};

/// Parses a path/body id, naming the entity in the error
pub fn parse_object_id(raw: &str, entity: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", entity)))
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Trimmed value, or `None` when the input is missing or blank
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

pub fn require(value: Option<&str>, field: &str) -> AppResult<String> {
    non_blank(value).ok_or_else(|| AppError::BadRequest(format!("{} is required.", field)))
}

/// Escapes regex metacharacters so user input is matched literally by `$regex`
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '#' | '-' | '&' | '~'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates and returns the
/// UTC form `YYYY-MM-DDTHH:MM:SSZ`, whose string order matches time order.
pub fn normalize_date(raw: &str, field: &str) -> AppResult<String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(format_utc(dt.with_timezone(&Utc)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(format_utc(naive.and_utc()));
        }
    }

    Err(AppError::BadRequest(format!("{} must be a valid date.", field)))
}

pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Comma separated tags → trimmed, non-empty list
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// "job" → "Job"
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("c++"), "c\\+\\+");
        assert_eq!(escape_regex("node.js (beta)"), "node\\.js \\(beta\\)");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn test_normalize_date_forms() {
        assert_eq!(normalize_date("2025-03-01", "Date").unwrap(), "2025-03-01T00:00:00Z");
        assert_eq!(
            normalize_date("2025-03-01T10:30:00+05:30", "Date").unwrap(),
            "2025-03-01T05:00:00Z"
        );
        assert_eq!(normalize_date(" 2025-03-01T10:30:00Z ", "Date").unwrap(), "2025-03-01T10:30:00Z");
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        let err = normalize_date("next friday", "Application Deadline").unwrap_err();
        assert_eq!(err.to_string(), "Application Deadline must be a valid date.");
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("rust, backend,, web "), vec!["rust", "backend", "web"]);
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_non_blank_and_require() {
        assert_eq!(non_blank(Some("  hi ")), Some("hi".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(require(Some(""), "Title").unwrap_err().to_string(), "Title is required.");
    }

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("65f1c2a9e4b0a1b2c3d4e5f6", "opportunity").is_ok());
        let err = parse_object_id("nope", "opportunity").unwrap_err();
        assert_eq!(err.to_string(), "Invalid opportunity ID");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("webinar"), "Webinar");
        assert_eq!(capitalize(""), "");
    }
}
