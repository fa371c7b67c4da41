//! Integration tests for session export loading: file on disk to cookie jar.

use idl_core::auth::{LoadError, load_cookies_into_jar, load_session_cookies};
use reqwest::cookie::CookieStore;
use tempfile::TempDir;
use url::Url;

fn cookie_header(jar: &reqwest::cookie::Jar, url: &str) -> String {
    jar.cookies(&Url::parse(url).unwrap())
        .map(|value| value.to_str().unwrap().to_string())
        .unwrap_or_default()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_netscape_export_reaches_every_subdomain() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "cookies.txt",
        "# Netscape HTTP Cookie File\n\
         #HttpOnly_.instagram.com\tTRUE\t/\tTRUE\t1801846439\tsessionid\t\"4242%3Aabc\"\n\
         .instagram.com\tTRUE\t/\tTRUE\t0\tcsrftoken\tcsrf-1\n\
         this line is not a cookie\n",
    );

    let cookies = load_session_cookies(&path).unwrap();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].http_only);
    assert_eq!(cookies[0].value(), "4242%3Aabc");

    let jar = load_cookies_into_jar(&cookies);
    for origin in [
        "https://instagram.com/",
        "https://www.instagram.com/",
        "https://i.instagram.com/api/v1/",
    ] {
        let header = cookie_header(&jar, origin);
        assert!(header.contains("sessionid=4242%3Aabc"), "{origin}: {header}");
        assert!(header.contains("csrftoken=csrf-1"), "{origin}: {header}");
    }
    assert!(cookie_header(&jar, "https://example.com/").is_empty());
}

#[test]
fn test_cookie_editor_json_export_loads() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "cookies.json",
        r#"[
          {"name": "sessionid", "value": "abc", "domain": ".instagram.com", "path": "/",
           "secure": true, "httpOnly": true, "session": false, "expirationDate": 1801846439.5},
          {"name": "ds_user_id", "value": "4242", "domain": "www.instagram.com", "path": "/",
           "secure": true, "httpOnly": false, "session": true}
        ]"#,
    );

    let cookies = load_session_cookies(&path).unwrap();
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[0].expires, Some(1_801_846_439));
    assert_eq!(cookies[1].expires, None);

    let jar = load_cookies_into_jar(&cookies);
    let header = cookie_header(&jar, "https://www.instagram.com/");
    assert!(header.contains("sessionid=abc"), "{header}");
    assert!(header.contains("ds_user_id=4242"), "{header}");
}

#[test]
fn test_values_outside_cookie_octets_are_stripped() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "cookies.txt",
        ".instagram.com\tTRUE\t/\tTRUE\t0\trur\t\"a b,c;d\\e\"\n",
    );

    let jar = load_cookies_into_jar(&load_session_cookies(&path).unwrap());
    assert_eq!(cookie_header(&jar, "https://instagram.com/"), "rur=abcde");
}

#[test]
fn test_empty_and_malformed_exports_are_load_errors() {
    let dir = TempDir::new().unwrap();

    let empty = write(&dir, "empty.txt", "\u{feff}\n   \n");
    assert!(matches!(
        load_session_cookies(&empty).unwrap_err(),
        LoadError::EmptyFile { .. }
    ));

    let broken = write(&dir, "broken.json", "{\"cookies\": [");
    assert!(matches!(
        load_session_cookies(&broken).unwrap_err(),
        LoadError::InvalidJson { .. }
    ));

    let missing = dir.path().join("nope.txt");
    let err = load_session_cookies(&missing).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("nope.txt"));
}
