use axum::http::{HeaderMap, HeaderValue, header};

use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `HttpOnly` session cookie scoped to the whole site.
pub fn session_cookie(
    name: &str,
    value: &str,
    max_age_secs: u64,
    secure: bool,
) -> Result<HeaderValue, ApiError> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}{secure}"
    ))
    .map_err(|err| ApiError::Internal(format!("invalid cookie value: {err}")))
}

pub fn expired_cookie(name: &str, secure: bool) -> Result<HeaderValue, ApiError> {
    session_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def; refreshToken="),
        );

        assert_eq!(read_cookie(&headers, ACCESS_TOKEN_COOKIE), Some("abc.def"));
        assert_eq!(read_cookie(&headers, REFRESH_TOKEN_COOKIE), None);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie(ACCESS_TOKEN_COOKIE, "tok", 60, true).unwrap();
        assert_eq!(
            cookie,
            "accessToken=tok; Path=/; HttpOnly; SameSite=Strict; Max-Age=60; Secure"
        );

        let cleared = expired_cookie(REFRESH_TOKEN_COOKIE, false).unwrap();
        assert_eq!(
            cleared,
            "refreshToken=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
        );
    }
}
