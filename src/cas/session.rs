//! Session cookie handling.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration, Cookie, SameSite};

use crate::config::CookieConfig;

/// Read the session id from the request's `Cookie` headers.
pub fn session_id(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Cookie binding the browser to session `id`.
pub fn session_cookie(config: &CookieConfig, id: &str) -> Cookie<'static> {
    let mut builder = Cookie::build((config.name.clone(), id.to_string()))
        .path(config.path.clone())
        .secure(config.secure)
        .http_only(config.http_only)
        .same_site(same_site(&config.same_site));

    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(secs) = config.max_age_secs {
        builder = builder.max_age(Duration::seconds(secs));
    }

    builder.build()
}

/// Cookie instructing the browser to drop the session.
pub fn removal_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = session_cookie(config, "");
    cookie.make_removal();
    cookie
}

/// Render a cookie as a `Set-Cookie` header value.
pub fn to_header_value(cookie: &Cookie<'_>) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).ok()
}

fn same_site(policy: &str) -> SameSite {
    match policy.to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; _cas_session=abc123; lang=en"),
        );

        assert_eq!(session_id(&headers, "_cas_session").as_deref(), Some("abc123"));
        assert_eq!(session_id(&headers, "other"), None);
    }

    #[test]
    fn test_session_id_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("_cas_session=xyz"));

        assert_eq!(session_id(&headers, "_cas_session").as_deref(), Some("xyz"));
    }

    #[test]
    fn test_empty_session_value_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("_cas_session="));
        assert_eq!(session_id(&headers, "_cas_session"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = CookieConfig {
            domain: Some("example.edu".into()),
            max_age_secs: Some(3600),
            ..CookieConfig::default()
        };
        let rendered = session_cookie(&config, "abc").to_string();

        assert!(rendered.starts_with("_cas_session=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Domain=example.edu"));
        assert!(rendered.contains("Max-Age=3600"));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let rendered = removal_cookie(&CookieConfig::default()).to_string();
        assert!(rendered.starts_with("_cas_session=;"));
        assert!(rendered.contains("Max-Age=0"));
    }
}
