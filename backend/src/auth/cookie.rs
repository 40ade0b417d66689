//! Session cookie contract.
//!
//! The token only ever travels in the `access_token` cookie: `HttpOnly`,
//! `Path=/`, `Max-Age` equal to the session lifetime, `SameSite` from config
//! and `Secure` when `COOKIE_SECURE` is on.

use crate::config::Config;
use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

pub const SESSION_COOKIE: &str = "access_token";

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(config: &Config, token: &str) -> HeaderValue {
    cookie_header(config, token, config.session_max_age_seconds())
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_session_cookie(config: &Config) -> HeaderValue {
    cookie_header(config, "", 0)
}

fn cookie_header(config: &Config, value: &str, max_age: i64) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite={}",
        SESSION_COOKIE, value, max_age, config.cookie_samesite
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }

    // JWTs are base64url with dots, always a valid header value.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Reads the session token out of the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;

    #[test]
    fn test_cookie_attributes() {
        let config = Config::for_tests();
        let cookie = session_cookie(&config, "abc.def.ghi");
        assert_eq!(
            cookie.to_str().unwrap(),
            "access_token=abc.def.ghi; HttpOnly; Path=/; Max-Age=1800; SameSite=Lax"
        );

        let secure = Config {
            cookie_secure: true,
            cookie_samesite: SameSite::Strict,
            ..Config::for_tests()
        };
        let cookie = session_cookie(&secure, "abc");
        assert!(cookie.to_str().unwrap().ends_with("SameSite=Strict; Secure"));

        let cleared = clear_session_cookie(&config);
        assert!(cleared.to_str().unwrap().starts_with("access_token=; "));
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_session_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("abc.def".to_string()));

        headers.insert(COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(session_token(&headers), None);
    }
}
