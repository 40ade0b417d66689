//! Database repository for user management operations.
//!
//! Provides CRUD operations for system users

use crate::database::models::{CreateUser, User};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, password_hash, session_epoch, created_at, updated_at";

/// Repository for user database operations.
///
/// Handles all persistence operations for the User entity. Credential
/// updates also bump the session epoch so that tokens issued before the
/// change stop verifying.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO containing the username and password hash
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, session_epoch, created_at, updated_at)
             VALUES (?, ?, 0, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(user)
    }

    /// Retrieves a user by their username.
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Checks if a username already exists in the system.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Checks if username exists excluding a specific user.
    pub async fn username_exists_excluding(
        &self,
        username: &str,
        exclude_user_id: i64,
    ) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(exclude_user_id)
                .fetch_one(self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Total number of users, used by the default-user bootstrap.
    pub async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Replaces the password hash and bumps the session epoch.
    ///
    /// # Returns
    /// The updated user, `None` if it no longer exists
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET password_hash = ?, session_epoch = session_epoch + 1, updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Renames a user and bumps the session epoch.
    ///
    /// # Returns
    /// The updated user, `None` if it no longer exists
    pub async fn update_username(&self, id: i64, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = ?, session_epoch = session_epoch + 1, updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Hard-deletes a user.
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn create(repo: &UserRepository<'_>, username: &str) -> User {
        repo.create_user(CreateUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = create(&repo, "alice").await;
        assert_eq!(user.session_epoch, 0);

        let by_name = repo.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(repo.username_exists("alice").await.unwrap());
        assert!(!repo.username_exists_excluding("alice", user.id).await.unwrap());
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        create(&repo, "alice").await;
        let duplicate = repo
            .create_user(CreateUser {
                username: "alice".to_string(),
                password_hash: "other".to_string(),
            })
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_credential_updates_bump_epoch() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        let user = create(&repo, "alice").await;

        let user = repo.update_password(user.id, "new-hash").await.unwrap().unwrap();
        assert_eq!(user.session_epoch, 1);
        assert_eq!(user.password_hash, "new-hash");

        let user = repo.update_username(user.id, "alicia").await.unwrap().unwrap();
        assert_eq!(user.session_epoch, 2);
        assert!(repo.get_user_by_username("alice").await.unwrap().is_none());

        assert!(repo.delete_user(user.id).await.unwrap());
        assert!(repo.get_user_by_id(user.id).await.unwrap().is_none());
    }
}
