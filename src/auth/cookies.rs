//! Cookie records, Netscape cookie file parsing and reqwest jar loading.
//!
//! Parses the Netscape HTTP cookie file format (7 TAB-separated fields per line,
//! with the `#HttpOnly_` prefix convention) and loads cookies into a
//! `reqwest::cookie::Jar`, fanned out across the subdomains the platform uses.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::cookie::Jar;
use tracing::{debug, instrument, warn};

/// Prefix marking an HTTP-only cookie in Netscape exports.
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Subdomain variants every cookie is additionally registered under.
const SUBDOMAIN_PREFIXES: &[&str] = &["www.", "i."];

/// A single session cookie parsed from a browser export.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of session credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieRecord {
    /// Cookie host with any leading `.` removed (e.g., `instagram.com`).
    pub domain: String,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie was marked HTTP-only by the browser.
    pub http_only: bool,
    /// Unix timestamp for expiry; `None` for session cookies.
    pub expires: Option<u64>,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl CookieRecord {
    /// Creates a cookie record, normalizing the domain and path.
    ///
    /// Returns `None` when the name or the normalized host is empty; such
    /// records are dropped rather than reported.
    #[must_use]
    pub fn new(
        domain: &str,
        path: &str,
        secure: bool,
        http_only: bool,
        expires: Option<u64>,
        name: &str,
        value: impl Into<String>,
    ) -> Option<Self> {
        let host = normalize_host(domain);
        let name = name.trim();
        if host.is_empty() || name.is_empty() {
            return None;
        }
        let path = path.trim();
        Some(Self {
            domain: host.to_string(),
            path: if path.is_empty() { "/" } else { path }.to_string(),
            secure,
            http_only,
            expires: expires.filter(|&at| at > 0),
            name: name.to_string(),
            value: value.into(),
        })
    }

    /// Returns the cookie value as exported.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Result of parsing a session export: usable cookies plus skipped-entry notes.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<CookieRecord>,
    /// Warnings for skipped entries (1-based line or entry number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses Netscape-format cookie text.
///
/// Each data line carries `domain`, `domain-flag`, `path`, `secure`, `expires`,
/// `name`, `value`. Lines starting with `#HttpOnly_` are data lines for
/// HTTP-only cookies; any other `#` line is a comment. Fields are split on TABs,
/// falling back to runs of whitespace for hand-edited files. Malformed lines are
/// collected as warnings and never abort the parse.
#[instrument(level = "debug", skip(input))]
pub fn parse_netscape_cookies(input: &str) -> ParseResult {
    let mut result = ParseResult::default();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest.trim(), true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        match parse_cookie_line(line, http_only) {
            Ok(cookie) => {
                debug!(
                    line = line_number,
                    domain = %cookie.domain,
                    name = %cookie.name,
                    "parsed cookie"
                );
                result.cookies.push(cookie);
            }
            Err(reason) => {
                warn!(line = line_number, reason = %reason, "skipping malformed cookie line");
                result.warnings.push((line_number, reason));
            }
        }
    }

    result
}

fn parse_cookie_line(line: &str, http_only: bool) -> Result<CookieRecord, String> {
    let mut fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        fields = line.split_whitespace().collect();
    }
    if fields.len() < 7 {
        return Err(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        ));
    }

    let secure = parse_flag(fields[3]);
    let expires = fields[4]
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|unix| u64::try_from(unix).ok());
    let value = strip_quotes(fields[6..].join(" ").trim()).to_string();

    CookieRecord::new(
        fields[0], fields[2], secure, http_only, expires, fields[5], value,
    )
    .ok_or_else(|| "cookie domain or name field is empty".to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "TRUE" | "true" | "1")
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Strips surrounding whitespace and a leading `.` from a cookie domain.
#[must_use]
pub fn normalize_host(domain: &str) -> &str {
    let trimmed = domain.trim();
    trimmed.strip_prefix('.').unwrap_or(trimmed)
}

/// Removes bytes that are not valid RFC 6265 cookie-octets.
///
/// The permitted set is `0x21`, `0x23–0x2B`, `0x2D–0x3A`, `0x3C–0x5B` and
/// `0x5D–0x7E`. Everything else (quotes, commas, semicolons, backslashes, spaces,
/// non-ASCII) is dropped.
#[must_use]
pub fn sanitize_cookie_value(value: &str) -> String {
    value.bytes().filter(|&b| is_cookie_octet(b)).map(char::from).collect()
}

fn is_cookie_octet(b: u8) -> bool {
    b == 0x21
        || (0x23..=0x2B).contains(&b)
        || (0x2D..=0x3A).contains(&b)
        || (0x3C..=0x5B).contains(&b)
        || (0x5D..=0x7E).contains(&b)
}

/// Loads cookie records into a `reqwest::cookie::Jar`.
///
/// Every record is registered for its host and, unless already prefixed, for
/// the `www.` and `i.` variants of that host, each over both `http://` and
/// `https://`. Values are sanitized to cookie-octets first.
///
/// # Returns
///
/// An `Arc<Jar>` suitable for passing to `reqwest::ClientBuilder::cookie_provider()`.
#[instrument(level = "debug", skip(cookies), fields(count = cookies.len()))]
pub fn load_cookies_into_jar(cookies: &[CookieRecord]) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());

    let mut by_host: BTreeMap<&str, Vec<&CookieRecord>> = BTreeMap::new();
    for cookie in cookies {
        by_host.entry(cookie.domain.as_str()).or_default().push(cookie);
    }

    for (host, host_cookies) in by_host {
        let set_cookies: Vec<String> = host_cookies
            .iter()
            .map(|cookie| build_set_cookie_string(cookie))
            .collect();

        for origin in origin_hosts(host) {
            for scheme in ["https", "http"] {
                let Ok(url) = format!("{scheme}://{origin}/").parse::<url::Url>() else {
                    debug!(host = %origin, "skipping unparseable cookie origin");
                    continue;
                };
                for set_cookie in &set_cookies {
                    jar.add_cookie_str(set_cookie, &url);
                }
            }
        }
        debug!(host = %host, cookies = host_cookies.len(), "loaded cookies into jar");
    }

    jar
}

/// Returns the host plus its `www.` / `i.` variants.
fn origin_hosts(host: &str) -> Vec<String> {
    let mut hosts = vec![host.to_string()];
    for prefix in SUBDOMAIN_PREFIXES {
        if !host.starts_with(prefix) {
            hosts.push(format!("{prefix}{host}"));
        }
    }
    hosts
}

/// Builds a `Set-Cookie` header string from a `CookieRecord`.
fn build_set_cookie_string(cookie: &CookieRecord) -> String {
    let mut parts = vec![format!(
        "{}={}",
        cookie.name,
        sanitize_cookie_value(cookie.value())
    )];

    parts.push(format!("Domain={}", cookie.domain));
    parts.push(format!("Path={}", cookie.path));

    if cookie.secure {
        parts.push("Secure".to_string());
    }
    if cookie.http_only {
        parts.push("HttpOnly".to_string());
    }

    if let Some(expires) = cookie.expires {
        if let Some(expires_str) = unix_to_http_date(expires) {
            parts.push(format!("Expires={expires_str}"));
        } else {
            warn!(
                domain = %cookie.domain,
                name = %cookie.name,
                expires,
                "cookie expiry timestamp overflows SystemTime; treating as session cookie"
            );
        }
    }

    parts.join("; ")
}

/// Converts a Unix timestamp to an HTTP-date string (RFC 7231).
fn unix_to_http_date(timestamp: u64) -> Option<String> {
    use std::time::{Duration, UNIX_EPOCH};

    let time = UNIX_EPOCH.checked_add(Duration::from_secs(timestamp))?;
    Some(httpdate::fmt_http_date(time))
}
