//! Query URL Construction
//!
//! Turns an ordered list of query terms into the engine's query-string form
//! with type-aware value encoding. Pure string work: no I/O, deterministic
//! for identical inputs.
//!
//! Keys and scalar values are NOT URL-escaped here; callers are responsible
//! for pre-sanitizing free-form strings. Only timestamp values are encoded,
//! because the engine expects its combined date-time token in a specific
//! percent-encoded shape.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left bare when encoding timestamps: unreserved plus `/`.
const TIMESTAMP_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// A query term value with type-aware rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Rendered as-is via its string form.
    Scalar(String),
    /// Rendered as the engine's encoded combined date-time token.
    Timestamp(DateTime<Utc>),
    /// Expanded to one `key<sep>item` token per element, preserving order.
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Renders a timestamp in the engine's expected form.
///
/// The `YYYY-MM-DD HH:MM:SS.ffffff` rendering is percent-encoded, suffixed
/// with `Z`, and the encoded space is replaced by `T`, yielding
/// `YYYY-MM-DDTHH%3AMM%3ASS.ffffffZ`.
fn render_timestamp(ts: &DateTime<Utc>) -> String {
    let plain = ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    let quoted = utf8_percent_encode(&plain, TIMESTAMP_ENCODE_SET).to_string();
    format!("{}Z", quoted).replace("%20", "T")
}

/// Builds a query URL from a base URL and an ordered list of terms.
///
/// Terms are joined with `&` in caller-supplied order; the first term is not
/// prefixed. List values contribute one `key<sep>item` token per element.
///
/// # Example
///
/// ```
/// use cromrun::client::query::{build_query_url, QueryValue};
///
/// let terms = vec![
///     ("name".to_string(), QueryValue::from("align")),
///     ("status".to_string(), QueryValue::List(vec!["Running".into(), "Failed".into()])),
/// ];
/// let url = build_query_url("http://localhost:8000/api/workflows/v1/query?", &terms, "=");
/// assert_eq!(
///     url,
///     "http://localhost:8000/api/workflows/v1/query?name=align&status=Running&status=Failed"
/// );
/// ```
pub fn build_query_url(base_url: &str, terms: &[(String, QueryValue)], sep: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();

    for (key, value) in terms {
        match value {
            QueryValue::Scalar(s) => tokens.push(format!("{}{}{}", key, sep, s)),
            QueryValue::Timestamp(ts) => {
                tokens.push(format!("{}{}{}", key, sep, render_timestamp(ts)))
            }
            QueryValue::List(items) => {
                for item in items {
                    tokens.push(format!("{}{}{}", key, sep, item));
                }
            }
        }
    }

    format!("{}{}", base_url.trim_end(), tokens.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BASE: &str = "http://btl-cromwell:9000/api/workflows/v1/query?";

    #[test]
    fn test_scalar_terms_in_order() {
        let terms = vec![
            ("name".to_string(), QueryValue::from("hello")),
            ("id".to_string(), QueryValue::from("1234")),
        ];
        let url = build_query_url(BASE, &terms, "=");
        assert_eq!(url, format!("{}name=hello&id=1234", BASE));
    }

    #[test]
    fn test_no_trailing_or_leading_separator() {
        let terms = vec![("name".to_string(), QueryValue::from("hello"))];
        let url = build_query_url(BASE, &terms, "=");
        assert!(!url.ends_with('&'));
        assert!(!url.contains("?&"));
    }

    #[test]
    fn test_list_expands_to_repeated_keys() {
        let terms = vec![(
            "status".to_string(),
            QueryValue::List(vec!["Running".to_string(), "Failed".to_string()]),
        )];
        let url = build_query_url(BASE, &terms, "=");
        assert_eq!(url, format!("{}status=Running&status=Failed", BASE));
    }

    #[test]
    fn test_one_token_per_scalar_and_list_element() {
        let terms = vec![
            ("name".to_string(), QueryValue::from("wf")),
            (
                "status".to_string(),
                QueryValue::List(vec!["A".to_string(), "B".to_string(), "C".to_string()]),
            ),
            ("page".to_string(), QueryValue::from("1")),
        ];
        let url = build_query_url(BASE, &terms, "=");
        let query = url.trim_start_matches(BASE);
        assert_eq!(query.split('&').count(), 5);
    }

    #[test]
    fn test_timestamp_rendering() {
        let ts = Utc.with_ymd_and_hms(2019, 1, 2, 12, 30, 45).unwrap();
        let terms = vec![("start".to_string(), QueryValue::Timestamp(ts))];
        let url = build_query_url(BASE, &terms, "=");
        assert_eq!(
            url,
            format!("{}start=2019-01-02T12%3A30%3A45.000000Z", BASE)
        );
    }

    #[test]
    fn test_timestamp_has_t_marker_and_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2020, 6, 15, 1, 2, 3).unwrap();
        let rendered = render_timestamp(&ts);
        assert!(rendered.starts_with("2020-06-15T"));
        assert!(rendered.ends_with('Z'));
        assert!(!rendered.contains("%20"));
    }

    #[test]
    fn test_custom_separator() {
        let terms = vec![("label=sample-id".to_string(), QueryValue::from("s001"))];
        let url = build_query_url(BASE, &terms, "%3A");
        assert_eq!(url, format!("{}label=sample-id%3As001", BASE));
    }

    #[test]
    fn test_deterministic_for_equal_inputs() {
        let terms = vec![
            ("name".to_string(), QueryValue::from("wf")),
            ("id".to_string(), QueryValue::from("abcd")),
        ];
        let a = build_query_url(BASE, &terms, "=");
        let b = build_query_url(BASE, &terms, "=");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_terms_yield_base() {
        let url = build_query_url(BASE, &[], "=");
        assert_eq!(url, BASE);
    }

    #[test]
    fn test_base_url_trailing_whitespace_trimmed() {
        let terms = vec![("name".to_string(), QueryValue::from("wf"))];
        let url = build_query_url("http://h:1/query? ", &terms, "=");
        assert_eq!(url, "http://h:1/query?name=wf");
    }
}
