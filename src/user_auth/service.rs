use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::error::AuthError;
use super::extract::{AuthenticatedUser, ClientInfo};
use super::lockout::LoginGuard;
use super::password::{hash_password, verify_password};
use super::revocation::RevocationStore;
use super::token::{AccessToken, TokenKeys};
use crate::audit::{AuditEvent, AuditLog, action};
use crate::cache::Cache;
use crate::config::AuthConfig;
use crate::store::{NewUser, User, UserId, UserStore, normalize_email};

/// Source of the current time for token issuing and verification.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// User Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 6, max = 64))]
    #[schema(example = "secret1")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "secret1")]
    pub password: String,
}

/// Body of logout and refresh requests
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Tokens issued at login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Access token, valid for one hour
    pub token: String,
    /// Refresh token, valid for seven days
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Login, logout, refresh, password change and bearer authentication.
pub struct UserAuthService {
    users: Arc<dyn UserStore>,
    keys: TokenKeys,
    guard: LoginGuard,
    revocations: RevocationStore,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl UserAuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        cache: Arc<dyn Cache>,
        audit: Arc<dyn AuditLog>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            keys: TokenKeys::new(&config.jwt_secret, config.access_ttl(), config.refresh_ttl()),
            guard: LoginGuard::new(cache.clone(), &config.lockout),
            revocations: RevocationStore::new(cache),
            audit,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    fn record(&self, user_id: Option<UserId>, action: &'static str, detail: &str, client: &ClientInfo) {
        self.audit.append(AuditEvent {
            user_id,
            action,
            detail: detail.to_string(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            timestamp: self.clock.now(),
        });
    }

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest, client: &ClientInfo) -> Result<User, AuthError> {
        let password_hash =
            hash_password(&req.password).map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?;

        let user = self
            .users
            .create_user(NewUser {
                username: req.username,
                email: normalize_email(&req.email),
                password_hash,
            })
            .await
            .map_err(|e| {
                if let crate::store::StoreError::Unique(field) = e {
                    tracing::warn!(field, "Registration attempt for existing user");
                }
                AuthError::from(e)
            })?;

        tracing::info!(user_id = user.id, email = %user.email, "User registered");
        self.record(Some(user.id), action::REGISTER, "User registered", client);
        Ok(user)
    }

    /// Check lockout, verify credentials and issue an access/refresh pair.
    ///
    /// Unknown email and wrong password produce the same error and both count
    /// towards the lockout.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(email);

        if self.guard.is_locked(&email).await {
            tracing::warn!(email = %email, "Login rejected, account locked");
            return Err(AuthError::Locked);
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|u| verify_password(password, &u.password_hash));

        let Some(user) = user else {
            let locked = self.guard.record_failure(&email).await;
            tracing::warn!(email = %email, locked, "Login failed");
            self.record(None, action::LOGIN_FAILED, &format!("Failed login for {}", email), client);
            return Err(AuthError::InvalidCredentials);
        };

        self.guard.reset(&email).await;

        let now = self.clock.now();
        let token = self.keys.issue_access(user.id, now)?;
        let refresh_token = self.keys.issue_refresh(user.id, now)?;

        tracing::info!(user_id = user.id, "User logged in");
        self.record(Some(user.id), action::LOGIN, "User logged in", client);
        Ok(LoginResponse {
            token,
            refresh_token,
        })
    }

    /// Revoke `refresh_token` until its own expiry.
    ///
    /// Only signature and claims are checked; revoking an already revoked
    /// token succeeds.
    pub async fn logout(
        &self,
        caller: &AuthenticatedUser,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let refresh = self
            .keys
            .verify_refresh(refresh_token, now)
            .map_err(|e| {
                tracing::debug!(error = %e, "Logout with unusable refresh token");
                AuthError::InvalidToken
            })?;

        self.revocations
            .revoke(refresh_token, refresh.expires_at, now)
            .await
            .map_err(|e| AuthError::DependencyUnavailable(e.to_string()))?;

        tracing::info!(user_id = caller.user_id, "Refresh token revoked");
        self.record(
            Some(caller.user_id),
            action::LOGOUT,
            "User logged out and refresh token revoked",
            client,
        );
        Ok(())
    }

    /// Mint a new access token from a live refresh token. The refresh token
    /// is returned to the client unchanged.
    pub async fn refresh(&self, refresh_token: &str, client: &ClientInfo) -> Result<String, AuthError> {
        if self.revocations.is_revoked(refresh_token).await {
            tracing::warn!("Refresh attempted with revoked token");
            return Err(AuthError::Revoked);
        }

        let now = self.clock.now();
        let refresh = self
            .keys
            .verify_refresh(refresh_token, now)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh with unusable token");
                AuthError::InvalidToken
            })?;

        let access = self.keys.issue_access(refresh.user_id, now)?;
        self.record(Some(refresh.user_id), action::REFRESH, "Access token refreshed", client);
        Ok(access)
    }

    /// Store a new password hash and return a replacement access token that
    /// carries `iat`, so older tokens with `iat` become stale.
    pub async fn change_password(
        &self,
        user_id: UserId,
        new_password: &str,
        client: &ClientInfo,
    ) -> Result<String, AuthError> {
        let password_hash =
            hash_password(new_password).map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?;

        let now = self.clock.now();
        self.users
            .update_password(user_id, &password_hash, now)
            .await?;

        let token = self.keys.issue_access_after_password_change(user_id, now)?;

        tracing::info!(user_id, "Password changed");
        self.record(Some(user_id), action::PASSWORD_CHANGE, "Password changed", client);
        Ok(token)
    }

    /// Verify a bearer access token and apply the password-change check.
    pub async fn authenticate(&self, bearer: &str) -> Result<AuthenticatedUser, AuthError> {
        let token = self.keys.verify_access(bearer, self.clock.now())?;

        if let AccessToken::WithIssuedAt { user_id, .. } = token {
            // a deleted user has no password stamp to compare against
            if let Some(user) = self.users.find_by_id(user_id).await? {
                if token.is_stale(&user) {
                    tracing::warn!(user_id, "Rejected token issued before password change");
                    return Err(AuthError::StaleToken);
                }
            }
        }

        Ok(AuthenticatedUser {
            user_id: token.user_id(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::cache::MemoryCache;
    use crate::config::LockoutConfig;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct Fixture {
        service: UserAuthService,
        audit: Arc<MemoryAuditLog>,
        clock: Arc<ManualClock>,
    }

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 3600,
            lockout: LockoutConfig::default(),
        }
    }

    fn fixture() -> Fixture {
        let audit = Arc::new(MemoryAuditLog::new());
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let service = UserAuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
            audit.clone(),
            &config(),
        )
        .with_clock(clock.clone());
        Fixture {
            service,
            audit,
            clock,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip: "10.0.0.1".to_string(),
            user_agent: "unit-test".to_string(),
        }
    }

    async fn register(service: &UserAuthService) -> User {
        service
            .register(
                RegisterRequest {
                    username: "alice".to_string(),
                    email: "Alice@Example.com".to_string(),
                    password: "secret1".to_string(),
                },
                &client(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_tokens_for_user() {
        let f = fixture();
        let user = register(&f.service).await;

        let tokens = f
            .service
            .login("alice@example.com", "secret1", &client())
            .await
            .unwrap();

        let auth = f.service.authenticate(&tokens.token).await.unwrap();
        assert_eq!(auth.user_id, user.id);
        assert!(matches!(auth.token, AccessToken::Plain { .. }));
        assert_eq!(
            f.audit.actions(),
            vec![action::REGISTER, action::LOGIN]
        );
        let login_event = &f.audit.events()[1];
        assert_eq!(login_event.ip, "10.0.0.1");
        assert_eq!(login_event.user_agent, "unit-test");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let f = fixture();
        register(&f.service).await;

        let unknown = f.service.login("bob@example.com", "secret1", &client()).await;
        let wrong = f.service.login("alice@example.com", "nope", &client()).await;
        assert_eq!(unknown.unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let f = fixture();
        register(&f.service).await;
        let tokens = f
            .service
            .login("alice@example.com", "secret1", &client())
            .await
            .unwrap();

        assert_eq!(
            f.service.authenticate(&tokens.refresh_token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_access_token_expires_after_an_hour() {
        let f = fixture();
        register(&f.service).await;
        let tokens = f
            .service
            .login("alice@example.com", "secret1", &client())
            .await
            .unwrap();

        f.clock.advance(Duration::hours(1));
        assert!(f.service.authenticate(&tokens.token).await.is_ok());
        f.clock.advance(Duration::seconds(1));
        assert_eq!(
            f.service.authenticate(&tokens.token).await.unwrap_err(),
            AuthError::Expired
        );
    }

    #[tokio::test]
    async fn test_password_change_token_survives_its_own_change() {
        let f = fixture();
        let user = register(&f.service).await;

        let token = f
            .service
            .change_password(user.id, "secret2", &client())
            .await
            .unwrap();
        assert!(f.service.authenticate(&token).await.is_ok());

        f.clock.advance(Duration::seconds(10));
        f.service
            .change_password(user.id, "secret3", &client())
            .await
            .unwrap();
        assert_eq!(
            f.service.authenticate(&token).await.unwrap_err(),
            AuthError::StaleToken
        );
    }
}
