//! HS256 JWT issuing and verification
//!
//! Every function takes an explicit `now` so expiry can be tested without a
//! real clock. `exp` is checked here rather than by `jsonwebtoken`, which
//! would otherwise read the system time and apply leeway.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{User, UserId};

/// Value of the `type` claim on refresh tokens
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::Malformed,
        }
    }
}

/// Claims as they appear on the wire
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE)
    }
}

/// A verified access token.
///
/// Only `WithIssuedAt` can be invalidated by a later password change; tokens
/// minted at login carry no `iat` and stay valid until they expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessToken {
    Plain {
        user_id: UserId,
        expires_at: DateTime<Utc>,
    },
    WithIssuedAt {
        user_id: UserId,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    },
}

impl AccessToken {
    pub fn user_id(&self) -> UserId {
        match *self {
            Self::Plain { user_id, .. } | Self::WithIssuedAt { user_id, .. } => user_id,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        match *self {
            Self::Plain { expires_at, .. } | Self::WithIssuedAt { expires_at, .. } => expires_at,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Plain { .. } => None,
            Self::WithIssuedAt { issued_at, .. } => Some(issued_at),
        }
    }

    /// True when `user` changed their password after this token was issued.
    pub fn is_stale(&self, user: &User) -> bool {
        self.issued_at()
            .is_some_and(|iat| user.password_changed_after(iat))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenError::Malformed)
}

/// Signing and verification keys derived from the shared secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: std::time::Duration, refresh_ttl: std::time::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: Duration::from_std(access_ttl).unwrap_or(Duration::hours(1)),
            refresh_ttl: Duration::from_std(refresh_ttl).unwrap_or(Duration::days(7)),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Access token without `iat`, as minted at login and refresh.
    pub fn issue_access(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&Claims {
            user_id,
            exp: (now + self.access_ttl).timestamp(),
            iat: None,
            token_type: None,
        })
    }

    /// Access token carrying `iat = now`, minted right after a password change.
    pub fn issue_access_after_password_change(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&Claims {
            user_id,
            exp: (now + self.access_ttl).timestamp(),
            iat: Some(now.timestamp()),
            token_type: None,
        })
    }

    pub fn issue_refresh(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&Claims {
            user_id,
            exp: (now + self.refresh_ttl).timestamp(),
            iat: Some(now.timestamp()),
            token_type: Some(REFRESH_TOKEN_TYPE.to_string()),
        })
    }

    /// Signature, then structure, then expiry.
    fn decode_claims(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Refresh tokens are not accepted as access tokens.
    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        let claims = self.decode_claims(token, now)?;
        if claims.token_type.is_some() {
            return Err(TokenError::Malformed);
        }

        let expires_at = timestamp(claims.exp)?;
        Ok(match claims.iat {
            None => AccessToken::Plain {
                user_id: claims.user_id,
                expires_at,
            },
            Some(iat) => AccessToken::WithIssuedAt {
                user_id: claims.user_id,
                expires_at,
                issued_at: timestamp(iat)?,
            },
        })
    }

    pub fn verify_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshToken, TokenError> {
        let claims = self.decode_claims(token, now)?;
        if !claims.is_refresh() {
            return Err(TokenError::Malformed);
        }

        Ok(RefreshToken {
            user_id: claims.user_id,
            expires_at: timestamp(claims.exp)?,
            issued_at: claims.iat.map(timestamp).transpose()?,
        })
    }
}
