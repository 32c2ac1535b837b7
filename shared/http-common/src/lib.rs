//! Shared HTTP utilities for the phonebook workspace.
//!
//! Framework-agnostic helpers for response bodies and output escaping, used by
//! the phonebook-server handlers and view renderer.

// ============================================================================
// Content Types
// ============================================================================

/// Content type of rendered pages.
pub const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";

/// Content type of error responses.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

// ============================================================================
// Error Bodies
// ============================================================================

/// Body of a plain-text error response: the message followed by a newline.
pub fn error_body(message: &str) -> String {
    format!("{}\n", message)
}

// ============================================================================
// Form Values
// ============================================================================

/// Whether a `Content-Type` header value names a urlencoded form body.
/// Parameters such as `; charset=utf-8` are ignored.
pub fn is_form_urlencoded(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

/// Decoded key/value pairs of a request: form body pairs first, then query
/// string pairs.
///
/// Lookups never fail. A missing key reads as the empty string and a
/// repeated key reads as its first value, so a body value wins over the
/// same key in the query.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    /// Collect values from an optional urlencoded body and an optional raw
    /// query string.
    pub fn parse(body: Option<&[u8]>, query: Option<&str>) -> Self {
        let mut pairs: Vec<(String, String)> = body
            .map(|b| form_urlencoded::parse(b).into_owned().collect())
            .unwrap_or_default();
        if let Some(q) = query {
            pairs.extend(form_urlencoded::parse(q.as_bytes()).into_owned());
        }
        Self { pairs }
    }

    /// First value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Take the first value for `key` out as an owned string.
    pub fn take(&self, key: &str) -> String {
        self.get(key).to_string()
    }
}

// ============================================================================
// Output Escaping
// ============================================================================

/// Escape text for interpolation into HTML element content or a quoted
/// attribute value.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
