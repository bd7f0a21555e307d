use crate::error::{KilnError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

const FRIENDLY_DATE_FORMAT: &str = "%b %d, %Y";
const DETAILED_DATE_FORMAT: &str = "%b %d, %Y at %I:%M %p %:z";

/// Lowercase, dash-separated slug usable as an anchor or CSS class.
///
/// Whitespace and common punctuation separate words; any other character that
/// is not an ASCII letter or digit is dropped.
pub fn into_tag(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() {
            cleaned.push(character.to_ascii_lowercase());
        } else if character.is_whitespace() || "/,.!;:-".contains(character) {
            cleaned.push('-');
        }
    }
    cleaned
        .split('-')
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date);
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Ok(date);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight).fixed_offset())
        .ok_or_else(|| KilnError::InvalidDate {
            value: value.to_string(),
        })
}

pub fn friendly_date(date: &DateTime<FixedOffset>) -> String {
    date.format(FRIENDLY_DATE_FORMAT).to_string()
}

pub fn detailed_date(date: &DateTime<FixedOffset>) -> String {
    date.format(DETAILED_DATE_FORMAT).to_string()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Copy of `map` without empty or false entries.
pub fn drop_null_values(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(_, value)| !is_falsy(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Appends `args` to `url` as a query string, keys in sorted order.
pub fn url_with_args(url: &str, args: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, &Value)> = args.iter().collect();
    pairs.sort_by(|left, right| left.0.cmp(right.0));
    if pairs.is_empty() {
        return url.to_string();
    }

    let query = pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&query_value(value))
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_tag(tag: &str) -> bool {
        !tag.is_empty()
            && tag
                .split('-')
                .all(|piece| !piece.is_empty() && piece.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
    }

    #[test]
    fn test_into_tag() {
        assert_eq!(into_tag("Hello, World!"), "hello-world");
        assert_eq!(into_tag("  Rust / C++ tips: part 2 "), "rust-c-tips-part-2");
        assert_eq!(into_tag("déjà vu"), "dj-vu");
        assert_eq!(into_tag("---"), "");
    }

    #[test]
    fn test_into_tag_is_idempotent_slug() {
        for input in ["Hello, World!", "a--b", "Mixed CASE and 123", "x/y.z;w:v"] {
            let tag = into_tag(input);
            assert!(is_tag(&tag), "{input:?} produced {tag:?}");
            assert_eq!(into_tag(&tag), tag);
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let plain = parse_date("2021-03-04").unwrap();
        assert_eq!(plain.to_rfc3339(), "2021-03-04T00:00:00+00:00");

        let offset = parse_date("2021-03-04T10:30:00-05:00").unwrap();
        assert_eq!(offset.offset().local_minus_utc(), -5 * 3600);

        assert!(matches!(
            parse_date("yesterday"),
            Err(KilnError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_date_formatting() {
        let date = parse_date("2021-03-04T15:05:00+02:00").unwrap();
        assert_eq!(friendly_date(&date), "Mar 04, 2021");
        assert_eq!(detailed_date(&date), "Mar 04, 2021 at 03:05 PM +02:00");
    }

    #[test]
    fn test_drop_null_values() {
        let map = json!({
            "a": null,
            "b": "",
            "c": "kept",
            "d": false,
            "e": 0,
            "f": [1],
            "g": {}
        });
        let dropped = drop_null_values(map.as_object().unwrap());
        let keys: Vec<_> = dropped.keys().cloned().collect();
        assert_eq!(keys, vec!["c", "f"]);
    }

    #[test]
    fn test_url_with_args() {
        let args = json!({ "subject": "[blog/post]", "body": "hi there" });
        assert_eq!(
            url_with_args("mailto:me@example.com", args.as_object().unwrap()),
            "mailto:me@example.com?body=hi%20there&subject=%5Bblog%2Fpost%5D"
        );
        assert_eq!(
            url_with_args("https://example.com/?a=1", json!({ "b": 2 }).as_object().unwrap()),
            "https://example.com/?a=1&b=2"
        );
        assert_eq!(url_with_args("page.html", &Map::new()), "page.html");
    }
}
