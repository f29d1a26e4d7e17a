/// Account manager implementation using runtime queries
use crate::{
    db::{self, models::User},
    error::{AppError, AppResult},
    search::{DocumentKind, IndexNotifier},
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    notifier: IndexNotifier,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, notifier: IndexNotifier) -> Self {
        Self { db, notifier }
    }

    /// Register a user under a verified uid
    pub async fn register(&self, uid: &str, username: &str) -> AppResult<User> {
        Self::validate_username(username)?;

        let user = User {
            uid: uid.to_string(),
            username: username.to_string(),
            total_videos: 0,
            created_at: Utc::now(),
        };

        // The unique constraints arbitrate concurrent registrations
        let inserted = sqlx::query(
            "INSERT INTO users (uid, username, total_videos, created_at) VALUES (?1, ?2, 0, ?3)",
        )
        .bind(&user.uid)
        .bind(&user.username)
        .bind(user.created_at)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if db::is_unique_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "User {} or username {} already registered",
                    uid, username
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(uid, username, "registered user");

        self.notifier.upsert(
            DocumentKind::User,
            uid,
            serde_json::json!({ "uid": uid, "username": username }),
        );

        Ok(user)
    }

    /// Look up a user by uid
    pub async fn get(&self, uid: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT uid, username, total_videos, created_at FROM users WHERE uid = ?1",
        )
        .bind(uid)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", uid)))
    }

    /// Validate username format
    fn validate_username(username: &str) -> AppResult<()> {
        if username.len() < 3 || username.len() > 30 {
            return Err(AppError::InvalidArgument(
                "Username must be 3-30 characters".to_string(),
            ));
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(AppError::InvalidArgument(
                "Username may only contain letters, digits, '_' and '.'".to_string(),
            ));
        }

        Ok(())
    }
}
