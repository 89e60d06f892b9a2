use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

pub mod password;

pub use password::{Argon2Hasher, PasswordError, PasswordHasher};

/// What a token holder may do through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Admin,
    Read,
    /// Only the permission tree of the user named in `sub`.
    #[serde(rename = "self")]
    SelfOnly,
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Scope::Admin),
            "read" => Ok(Scope::Read),
            "self" => Ok(Scope::SelfOnly),
            other => Err(format!("unknown scope '{other}' (expected admin, read or self)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity: an encoded user id or a service name.
    pub sub: String,
    pub scope: Scope,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, scope: Scope, expiry: Duration) -> Self {
        let now = Utc::now();
        let exp = now.checked_add_signed(expiry).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            sub: sub.into(),
            scope,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Authenticated caller, inserted into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject: String,
    pub scope: Scope,
}

impl Principal {
    /// The caller's user id when the subject is an encoded user id.
    pub fn user_id(&self) -> Option<i64> {
        crate::codec::decode(&self.subject).ok()
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            scope: claims.scope,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT expiry of {0} hours is out of range")]
    InvalidExpiry(u64),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// HS256 signing and validation keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("expiry", &self.expiry).finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, expiry: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, JwtError> {
        let hours = config.jwt_expiry_hours;
        let expiry = i64::try_from(hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or(JwtError::InvalidExpiry(hours))?;
        Self::new(&config.jwt_secret, expiry)
    }

    /// Sign a token for `sub` with the configured lifetime.
    pub fn issue(&self, sub: impl Into<String>, scope: Scope) -> Result<String, JwtError> {
        self.sign(&Claims::new(sub, scope, self.expiry))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}
