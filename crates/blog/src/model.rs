//! The unified blog-post shape and its helpers.

use serde_json::Value;
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;

/// Which source schema a post came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Whtwnd,
    Leaflet,
    StandardSite,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Whtwnd => "whtwnd",
            Platform::Leaflet => "leaflet",
            Platform::StandardSite => "standard",
        }
    }
}

/// One blog post, normalized from any of the source schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub title: String,
    pub url: String,
    pub created_at: Option<UtcDateTime>,
    pub platform: Platform,
    pub description: Option<String>,
    pub publication: Option<String>,
}

/// A named grouping of documents with a shared canonical URL base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publication {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub icon: Option<String>,
}

/// Canonical URL priority chain.
///
/// An explicit per-document path on the publication's base wins, then the
/// publication base plus the record key, then whatever platform default the
/// caller supplies. Bases are normalized to an https origin without a
/// trailing slash, paths to a single leading slash, so the pieces always
/// join with exactly one `/`.
pub(crate) fn canonical_url(
    base: Option<&str>,
    path: Option<&str>,
    rkey: &str,
    platform_default: impl FnOnce() -> String,
) -> String {
    let Some(base) = base.map(normalize_base).filter(|b| !b.is_empty()) else {
        return platform_default();
    };
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => format!("{base}/{}", path.trim_start_matches('/')),
        None => format!("{base}/{rkey}"),
    }
}

/// Publications spell their base as anything from a bare domain to a full
/// URL with a trailing slash.
fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Parse whichever timestamp field a schema uses, tolerating bad data.
pub(crate) fn parse_timestamp(value: &Value, fields: &[&str]) -> Option<UtcDateTime> {
    fields
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .and_then(|raw| time::OffsetDateTime::parse(raw, &Rfc3339).ok())
        .map(time::OffsetDateTime::to_utc)
}

/// Non-empty string field access.
pub(crate) fn text_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::explicit_path(Some("https://blog.example.com"), Some("/posts/hello"), "https://blog.example.com/posts/hello")]
    #[case::path_without_slash(Some("blog.example.com"), Some("posts/hello"), "https://blog.example.com/posts/hello")]
    #[case::base_plus_rkey(Some("https://blog.example.com/"), None, "https://blog.example.com/3kabc")]
    #[case::bare_domain(Some("blog.example.com"), None, "https://blog.example.com/3kabc")]
    fn url_priority_chain(#[case] base: Option<&str>, #[case] path: Option<&str>, #[case] expected: &str) {
        let url = canonical_url(base, path, "3kabc", || "https://fallback.example/x".to_string());
        assert_eq!(url, expected);
    }

    #[test]
    fn missing_base_falls_back_to_platform_default() {
        let url = canonical_url(None, Some("/ignored"), "3kabc", || "https://fallback.example/x".to_string());
        assert_eq!(url, "https://fallback.example/x");
    }

    #[test]
    fn timestamp_takes_the_first_present_field() {
        let value = json!({"publishedAt": "2024-01-02T00:00:00Z", "createdAt": "2020-01-01T00:00:00Z"});
        let parsed = parse_timestamp(&value, &["publishedAt", "createdAt"]).unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parse_timestamp(&json!({}), &["createdAt"]), None);
        assert_eq!(parse_timestamp(&json!({"createdAt": "yesterday"}), &["createdAt"]), None);
    }
}
