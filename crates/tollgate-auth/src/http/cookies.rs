//! Credential cookie transport.
//!
//! Cookies are always written under the preferred (optionally `__Host-`
//! prefixed) name and read from a prioritized list that also covers legacy
//! names. Both cookies are `HttpOnly`.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::{CookieConfig, SameSitePolicy};

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}

fn build(config: &CookieConfig, name: String, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config.same_site))
        .path(config.path.clone())
        .max_age(max_age)
        .build()
}

/// Creates the access cookie.
#[must_use]
pub fn access_cookie(config: &CookieConfig, token: &str, max_age: Duration) -> Cookie<'static> {
    build(config, config.access_cookie_name(), token.to_string(), max_age)
}

/// Creates the refresh cookie.
#[must_use]
pub fn refresh_cookie(config: &CookieConfig, token: &str, max_age: Duration) -> Cookie<'static> {
    build(config, config.refresh_cookie_name(), token.to_string(), max_age)
}

/// Adds removal cookies for every access and refresh cookie name.
///
/// Removal cookies are added unconditionally, not only for names present on
/// the request.
#[must_use]
pub fn clear_credential_cookies(config: &CookieConfig, mut jar: CookieJar) -> CookieJar {
    for name in config
        .access_read_names()
        .into_iter()
        .chain(config.refresh_read_names())
    {
        let mut cookie = build(config, name, String::new(), Duration::ZERO);
        cookie.make_removal();
        jar = jar.add(cookie);
    }
    jar
}

/// Returns the first non-empty cookie value among `names`.
#[must_use]
pub fn read_first(jar: &CookieJar, names: &[String]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| jar.get(name))
        .map(|c| c.value().trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    fn insecure() -> CookieConfig {
        CookieConfig {
            secure: false,
            ..CookieConfig::default()
        }
    }

    #[test]
    fn test_access_cookie_attributes() {
        let cookie = access_cookie(&CookieConfig::default(), "tok", Duration::seconds(900));
        let rendered = cookie.to_string();

        assert_eq!(cookie.name(), "__Host-tollgate_access");
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=900"));
    }

    #[test]
    fn test_refresh_cookie_without_host_lock() {
        let cookie = refresh_cookie(&insecure(), "tok", Duration::days(30));
        assert_eq!(cookie.name(), "tollgate_refresh");
        assert!(!cookie.to_string().contains("Secure"));
    }

    #[test]
    fn test_read_first_prefers_current_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("refresh_token=legacy; tollgate_refresh=current"),
        );
        let jar = CookieJar::from_headers(&headers);

        let value = read_first(&jar, &insecure().refresh_read_names());
        assert_eq!(value.as_deref(), Some("current"));
    }

    #[test]
    fn test_read_first_falls_back_to_legacy() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh_token=legacy"));
        let jar = CookieJar::from_headers(&headers);

        let value = read_first(&jar, &insecure().refresh_read_names());
        assert_eq!(value.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_read_first_skips_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("tollgate_refresh="));
        let jar = CookieJar::from_headers(&headers);

        assert!(read_first(&jar, &insecure().refresh_read_names()).is_none());
    }

    #[test]
    fn test_clear_covers_every_name() {
        let config = CookieConfig::default();
        let jar = clear_credential_cookies(&config, CookieJar::new());

        for name in config
            .access_read_names()
            .iter()
            .chain(config.refresh_read_names().iter())
        {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }
}
