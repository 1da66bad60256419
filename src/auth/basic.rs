//! HTTP Basic authentication header handling.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasicAuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not valid ASCII")]
    InvalidHeaderValue,
    #[error("Authorization scheme is not Basic")]
    UnsupportedScheme,
    #[error("Invalid base64 encoding")]
    InvalidBase64,
    #[error("Credentials are not valid UTF-8")]
    InvalidUtf8,
    #[error("Invalid credentials format")]
    MissingColon,
}

/// Username and secret supplied by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    /// Extract credentials from the `Authorization` header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, BasicAuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(BasicAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| BasicAuthError::InvalidHeaderValue)?;
        Self::parse(value)
    }

    /// Parse a `Basic <base64(user:password)>` header value.
    pub fn parse(value: &str) -> Result<Self, BasicAuthError> {
        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .ok_or(BasicAuthError::UnsupportedScheme)?;
        if !scheme.eq_ignore_ascii_case("Basic") {
            return Err(BasicAuthError::UnsupportedScheme);
        }

        let decoded = general_purpose::STANDARD
            .decode(token.trim())
            .map_err(|_| BasicAuthError::InvalidBase64)?;
        let decoded = String::from_utf8(decoded).map_err(|_| BasicAuthError::InvalidUtf8)?;

        let (username, password) = decoded.split_once(':').ok_or(BasicAuthError::MissingColon)?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// `WWW-Authenticate` value for `realm`.
pub fn challenge(realm: &str) -> String {
    let mut escaped = String::with_capacity(realm.len());
    for c in realm.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("Basic realm=\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn encode(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn parses_valid_header() {
        let creds = BasicCredentials::parse(&encode("alice:s3cret")).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn password_may_contain_colons() {
        let creds = BasicCredentials::parse(&encode("bob:a:b:c")).unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.password, "a:b:c");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = format!("basic {}", general_purpose::STANDARD.encode("u:p"));
        assert!(BasicCredentials::parse(&value).is_ok());
    }

    #[test]
    fn malformed_headers() {
        assert_eq!(
            BasicCredentials::parse("Bearer abc"),
            Err(BasicAuthError::UnsupportedScheme)
        );
        assert_eq!(BasicCredentials::parse("Basic"), Err(BasicAuthError::UnsupportedScheme));
        assert_eq!(
            BasicCredentials::parse("Basic !!!"),
            Err(BasicAuthError::InvalidBase64)
        );
        assert_eq!(
            BasicCredentials::parse(&encode("no-colon")),
            Err(BasicAuthError::MissingColon)
        );
    }

    #[test]
    fn missing_header() {
        assert_eq!(
            BasicCredentials::from_headers(&HeaderMap::new()),
            Err(BasicAuthError::MissingHeader)
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&encode("u:p")).unwrap());
        assert!(BasicCredentials::from_headers(&headers).is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let creds = BasicCredentials::parse(&encode("alice:hunter2")).unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn challenge_quotes_realm() {
        assert_eq!(challenge("Secured Area"), "Basic realm=\"Secured Area\"");
        assert_eq!(challenge("a \"b\""), "Basic realm=\"a \\\"b\\\"\"");
    }
}
