//! Core business logic for the authentication system.
//!
//! Session lifecycle: login issues a token, every protected request
//! re-validates it (signature, expiry, revocation ledger, then the user's
//! session epoch), logout and credential changes revoke it.

use crate::auth::models::*;
use crate::database::models::User;
use crate::errors::{ServiceError, ServiceResult, TokenError};
use crate::repositories::user_repository::UserRepository;
use crate::services::user_service::UserService;
use crate::services::validate_input;
use crate::state::AppState;
use crate::utils::jwt::{Claims, IssuedToken};
use tracing::{debug, info, warn};

/// The authenticated caller, inserted into request extensions by the
/// session middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

/// Authentication service for login, logout and session validation
pub struct AuthService<'a> {
    state: &'a AppState,
    user_service: UserService<'a>,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            user_service: UserService::new(&state.pool, &state.passwords),
        }
    }

    /// Checks the credentials and issues a session token.
    ///
    /// Unknown users and wrong passwords fail identically with
    /// `InvalidCredentials` after the same amount of bcrypt work.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<(User, IssuedToken)> {
        validate_input(&request)?;
        self.state
            .login_limiter
            .check_username(&request.username)
            .map_err(|retry_after_secs| ServiceError::RateLimited { retry_after_secs })?;

        let user = match self
            .user_service
            .authenticate_user(&request.username, &request.password)
            .await
        {
            Ok(user) => user,
            Err(ServiceError::InvalidCredentials) => {
                info!(username = %request.username, "Failed login attempt");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let issued = self
            .state
            .tokens
            .issue(user.id, &user.username, user.session_epoch)?;
        info!(user_id = user.id, username = %user.username, jti = %issued.claims.jti, "User logged in");
        Ok((user, issued))
    }

    /// Resolves a presented token to the current user.
    ///
    /// # Errors
    /// `Unauthenticated` when the token is missing, invalid, expired, revoked,
    /// belongs to a user that no longer exists or predates the user's last
    /// credential change.
    pub async fn authenticate_session(&self, token: Option<&str>) -> ServiceResult<CurrentUser> {
        let token = token.ok_or(ServiceError::from(TokenError::Invalid))?;
        let claims = self.state.tokens.verify(&self.state.pool, token).await?;

        // Bound by id: a later account reusing the username gets a new id.
        let user = UserRepository::new(&self.state.pool)
            .get_user_by_id(claims.uid)
            .await?
            .ok_or_else(|| {
                debug!(user = %claims.sub, uid = claims.uid, "Token subject no longer exists");
                ServiceError::from(TokenError::Revoked)
            })?;

        if user.session_epoch != claims.sev {
            debug!(
                user = %claims.sub,
                token_epoch = claims.sev,
                current_epoch = user.session_epoch,
                "Token predates a credential change"
            );
            return Err(TokenError::Revoked.into());
        }

        Ok(CurrentUser { user, claims })
    }

    /// Revokes the presented token if it still verifies. Never fails: the
    /// caller clears the cookie regardless.
    pub async fn logout(&self, token: Option<&str>) {
        let Some(token) = token else {
            debug!("Logout without a session cookie");
            return;
        };

        match self.state.tokens.verify(&self.state.pool, token).await {
            Ok(claims) => {
                if let Err(e) = self.state.tokens.revoke(&self.state.pool, &claims).await {
                    warn!(jti = %claims.jti, "Failed to revoke token on logout: {}", e);
                } else {
                    info!(user = %claims.sub, jti = %claims.jti, "User logged out");
                }
            }
            Err(ServiceError::Unauthenticated { reason }) => {
                debug!(%reason, "Logout with an unusable token");
            }
            Err(e) => warn!("Token check failed during logout: {}", e),
        }
    }

    /// Registers a new user, if registration is open.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<UserInfo> {
        if !self.state.config.registration_enabled {
            return Err(ServiceError::permission_denied("Registration is disabled"));
        }

        let user = self
            .user_service
            .register_user(&request.username, &request.password)
            .await?;
        Ok(UserInfo::from(&user))
    }

    pub async fn change_password(
        &self,
        current: &CurrentUser,
        request: ChangePasswordRequest,
    ) -> ServiceResult<()> {
        validate_input(&request)?;
        self.user_service
            .change_password(&current.user, &request.current_password, &request.new_password)
            .await?;
        self.revoke_current(current).await;
        Ok(())
    }

    pub async fn change_username(
        &self,
        current: &CurrentUser,
        request: ChangeUsernameRequest,
    ) -> ServiceResult<UserInfo> {
        validate_input(&request)?;
        let user = self
            .user_service
            .change_username(&current.user, &request.current_password, &request.new_username)
            .await?;
        self.revoke_current(current).await;
        Ok(UserInfo::from(&user))
    }

    pub async fn delete_account(
        &self,
        current: &CurrentUser,
        request: DeleteAccountRequest,
    ) -> ServiceResult<()> {
        validate_input(&request)?;
        self.user_service
            .delete_user(&current.user, &request.current_password)
            .await?;
        self.revoke_current(current).await;
        Ok(())
    }

    /// The epoch bump already invalidates the token; the ledger entry makes
    /// the revocation explicit for this jti.
    async fn revoke_current(&self, current: &CurrentUser) {
        if let Err(e) = self
            .state
            .tokens
            .revoke(&self.state.pool, &current.claims)
            .await
        {
            warn!(jti = %current.claims.jti, "Failed to revoke token after credential change: {}", e);
        }
    }
}
