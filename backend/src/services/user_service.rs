//! User business logic service.
//!
//! Handles registration, credential checks and credential changes. Every
//! credential change bumps the user's session epoch, which revokes all
//! tokens issued before it.

use crate::database::models::{CreateUser, User, validate_username};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::utils::generate_random_string::generate_secure_password;
use crate::utils::password::PasswordHasher;
use sqlx::SqlitePool;
use tracing::info;

pub const DEFAULT_USERNAME: &str = "admin";

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 100;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    passwords: &'a PasswordHasher,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `passwords` - Shared bcrypt hasher
    pub fn new(pool: &'a SqlitePool, passwords: &'a PasswordHasher) -> Self {
        Self { pool, passwords }
    }

    /// Registers a new user.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Username or password rule violations
    /// - Duplicate usernames
    pub async fn register_user(&self, username: &str, password: &str) -> ServiceResult<User> {
        validate_username(username).map_err(|e| {
            ServiceError::validation(e.message.map(|m| m.to_string()).unwrap_or_default())
        })?;
        validate_password(password)?;

        let repo = UserRepository::new(self.pool);
        if repo.username_exists(username).await? {
            return Err(ServiceError::already_exists("User", username));
        }

        let password_hash = self.passwords.hash_password(password).await?;

        let user = repo
            .create_user(CreateUser {
                username: username.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| ServiceError::from_write(e, "User", username))?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Checks a username/password pair.
    ///
    /// The bcrypt comparison runs whether or not the user exists, and both
    /// failure cases return the same `InvalidCredentials` error.
    pub async fn authenticate_user(&self, username: &str, password: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo.get_user_by_username(username).await?;

        let verified = self
            .passwords
            .verify_password(password, user.as_ref().map(|u| u.password_hash.as_str()))
            .await;

        match user {
            Some(user) if verified => Ok(user),
            _ => Err(ServiceError::InvalidCredentials),
        }
    }

    /// Replaces the user's password after re-checking the current one.
    ///
    /// A wrong current password is a validation failure, not an
    /// authentication failure: the session itself is still valid.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> ServiceResult<User> {
        self.require_current_password(user, current_password).await?;
        validate_password(new_password)?;

        let password_hash = self.passwords.hash_password(new_password).await?;
        let updated = UserRepository::new(self.pool)
            .update_password(user.id, &password_hash)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user.id))?;

        info!(user_id = user.id, "Password changed, sessions invalidated");
        Ok(updated)
    }

    /// Renames the user after re-checking the current password.
    pub async fn change_username(
        &self,
        user: &User,
        current_password: &str,
        new_username: &str,
    ) -> ServiceResult<User> {
        self.require_current_password(user, current_password).await?;
        validate_username(new_username).map_err(|e| {
            ServiceError::validation(e.message.map(|m| m.to_string()).unwrap_or_default())
        })?;

        if new_username == user.username {
            return Err(ServiceError::invalid_operation(
                "New username must differ from the current one",
            ));
        }

        let repo = UserRepository::new(self.pool);
        if repo.username_exists_excluding(new_username, user.id).await? {
            return Err(ServiceError::already_exists("User", new_username));
        }

        let updated = repo
            .update_username(user.id, new_username)
            .await
            .map_err(|e| ServiceError::from_write(e, "User", new_username))?
            .ok_or_else(|| ServiceError::not_found("User", user.id))?;

        info!(
            user_id = user.id,
            old = %user.username,
            new = %updated.username,
            "Username changed, sessions invalidated"
        );
        Ok(updated)
    }

    /// Deletes the user after re-checking the current password.
    pub async fn delete_user(&self, user: &User, current_password: &str) -> ServiceResult<()> {
        self.require_current_password(user, current_password).await?;

        if !UserRepository::new(self.pool).delete_user(user.id).await? {
            return Err(ServiceError::not_found("User", user.id));
        }

        info!(user_id = user.id, username = %user.username, "User deleted");
        Ok(())
    }

    /// Creates the `admin` user with a random password if no user exists.
    ///
    /// # Returns
    /// The generated password, `None` if users already existed
    pub async fn ensure_default_user(&self) -> ServiceResult<Option<String>> {
        let repo = UserRepository::new(self.pool);
        if repo.count_users().await? > 0 {
            info!("Users already exist, skipping default user creation");
            return Ok(None);
        }

        let password = generate_secure_password(20);
        let password_hash = self.passwords.hash_password(&password).await?;
        let user = repo
            .create_user(CreateUser {
                username: DEFAULT_USERNAME.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| ServiceError::from_write(e, "User", DEFAULT_USERNAME))?;

        info!(user_id = user.id, username = DEFAULT_USERNAME, "Default user created");
        Ok(Some(password))
    }

    async fn require_current_password(&self, user: &User, password: &str) -> ServiceResult<()> {
        if self
            .passwords
            .verify_password(password, Some(&user.password_hash))
            .await
        {
            Ok(())
        } else {
            Err(ServiceError::validation(
                "current_password: Current password is incorrect",
            ))
        }
    }
}

fn validate_password(password: &str) -> ServiceResult<()> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(ServiceError::validation(format!(
            "password: Password must be between {}-{} characters",
            MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn setup() -> (Database, PasswordHasher) {
        (
            Database::in_memory().await.unwrap(),
            PasswordHasher::new(4).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);

        let user = service.register_user("alice", "Passw0rd1").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "Passw0rd1");

        let authenticated = service.authenticate_user("alice", "Passw0rd1").await.unwrap();
        assert_eq!(authenticated.id, user.id);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);
        service.register_user("alice", "Passw0rd1").await.unwrap();

        let wrong_password = service.authenticate_user("alice", "nope").await.unwrap_err();
        let unknown_user = service.authenticate_user("mallory", "nope").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
        assert!(matches!(unknown_user, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_rules() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);

        assert!(matches!(
            service.register_user("al", "Passw0rd1").await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(matches!(
            service.register_user("alice", "short").await,
            Err(ServiceError::Validation { .. })
        ));

        service.register_user("alice", "Passw0rd1").await.unwrap();
        assert!(matches!(
            service.register_user("alice", "Passw0rd2").await,
            Err(ServiceError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);
        let user = service.register_user("alice", "Passw0rd1").await.unwrap();

        assert!(matches!(
            service.change_password(&user, "wrong", "NewPassw0rd").await,
            Err(ServiceError::Validation { .. })
        ));

        let updated = service
            .change_password(&user, "Passw0rd1", "NewPassw0rd")
            .await
            .unwrap();
        assert_eq!(updated.session_epoch, user.session_epoch + 1);
        assert!(service.authenticate_user("alice", "Passw0rd1").await.is_err());
        assert!(service.authenticate_user("alice", "NewPassw0rd").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_username() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);
        let alice = service.register_user("alice", "Passw0rd1").await.unwrap();
        service.register_user("bob", "Passw0rd1").await.unwrap();

        assert!(matches!(
            service.change_username(&alice, "Passw0rd1", "bob").await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        assert!(matches!(
            service.change_username(&alice, "Passw0rd1", "alice").await,
            Err(ServiceError::InvalidOperation { .. })
        ));

        let renamed = service
            .change_username(&alice, "Passw0rd1", "alicia")
            .await
            .unwrap();
        assert_eq!(renamed.username, "alicia");
        assert_eq!(renamed.session_epoch, alice.session_epoch + 1);
    }

    #[tokio::test]
    async fn test_default_user_only_when_empty() {
        let (db, passwords) = setup().await;
        let service = UserService::new(db.pool(), &passwords);

        let password = service.ensure_default_user().await.unwrap().unwrap();
        assert!(service.authenticate_user(DEFAULT_USERNAME, &password).await.is_ok());
        assert!(service.ensure_default_user().await.unwrap().is_none());
    }
}
