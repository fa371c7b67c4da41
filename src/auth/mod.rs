//! Session export loading and cookie jar construction.
//!
//! This module turns a browser cookie export (Netscape `cookies.txt` or
//! Cookie-Editor JSON) into cookie records and a reqwest cookie jar scoped to
//! the platform's apex domain and the subdomains its API and CDN use.

mod cookies;
mod export;

pub use cookies::{
    CookieRecord, ParseResult, load_cookies_into_jar, normalize_host, parse_netscape_cookies,
    sanitize_cookie_value,
};
pub use export::{ExportFormat, LoadError, load_session_cookies, parse_session_export};
