//! HS256 access and refresh tokens.
//!
//! Access tokens carry enough of the user to log and authorize a request;
//! refresh tokens only carry the subject. Each kind has its own secret so one
//! can never be replayed as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: Uuid,
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Unique per issue so a rotated token never equals its predecessor.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Identity embedded into a freshly issued access token.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub user_name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1_000)),
        }
    }
}

pub struct TokenService {
    access: Keys,
    refresh: Keys,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        access_ttl_secs: u64,
        refresh_secret: &str,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access: Keys::new(access_secret, access_ttl_secs),
            refresh: Keys::new(refresh_secret, refresh_ttl_secs),
        }
    }

    pub fn issue_access(&self, subject: TokenSubject<'_>) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject.id,
            name: subject.name.to_string(),
            user_name: subject.user_name.to_string(),
            email: subject.email.to_string(),
            role: subject.role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access.ttl).timestamp(),
        };
        sign(&claims, &self.access.encoding)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.refresh.ttl).timestamp(),
        };
        sign(&claims, &self.refresh.encoding)
    }

    pub fn issue_pair(&self, subject: TokenSubject<'_>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject)?,
            refresh_token: self.issue_refresh(subject.id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access.decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh.decoding)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|err| TokenError::Signing(err.to_string()))
}

fn verify<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::Invalid("invalid signature".to_string()),
            _ => TokenError::Invalid(err.to_string()),
        })
}
