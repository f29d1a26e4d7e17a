/// Admin Role Management
use crate::admin::AuditLogEntry;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;

/// Admin role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can view counters, no destructive actions
    Moderator,
    /// Can remove content and resync counters
    Admin,
    /// Full access, can grant/revoke roles
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(AppError::InvalidArgument(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// Admin role record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRole {
    pub id: i64,
    pub uid: String,
    pub role: Role,
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub notes: Option<String>,
}

/// Admin role manager
///
/// Uids listed in the configuration act as `SuperAdmin` without a stored
/// grant, so a fresh deployment can bootstrap its first administrators.
#[derive(Clone)]
pub struct AdminRoleManager {
    db: SqlitePool,
    configured: Arc<HashSet<String>>,
}

impl AdminRoleManager {
    pub fn new(db: SqlitePool, configured_admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            db,
            configured: Arc::new(configured_admins.into_iter().collect()),
        }
    }

    /// Grant admin role to a uid
    pub async fn grant_role(
        &self,
        uid: &str,
        role: Role,
        granted_by: &str,
        notes: Option<String>,
    ) -> AppResult<AdminRole> {
        let now = Utc::now();

        if let Some(existing) = self.get_role(uid).await? {
            return Err(AppError::Conflict(format!(
                "User already has active role: {}",
                existing.role.as_str()
            )));
        }

        // A revoked grant keeps its row; reuse it
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO admin_roles (uid, role, granted_by, granted_at, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(uid) DO UPDATE SET
                role = excluded.role,
                granted_by = excluded.granted_by,
                granted_at = excluded.granted_at,
                notes = excluded.notes,
                revoked = 0,
                revoked_at = NULL,
                revoked_by = NULL
            RETURNING id
            "#,
        )
        .bind(uid)
        .bind(role.as_str())
        .bind(granted_by)
        .bind(now)
        .bind(&notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(uid, role = role.as_str(), granted_by, "granted admin role");

        Ok(AdminRole {
            id,
            uid: uid.to_string(),
            role,
            granted_by: Some(granted_by.to_string()),
            granted_at: now,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
            notes,
        })
    }

    /// Revoke admin role
    pub async fn revoke_role(
        &self,
        uid: &str,
        revoked_by: &str,
        reason: Option<String>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE admin_roles
            SET revoked = 1,
                revoked_at = ?1,
                revoked_by = ?2,
                notes = COALESCE(?3, notes)
            WHERE uid = ?4 AND revoked = 0
            "#,
        )
        .bind(Utc::now())
        .bind(revoked_by)
        .bind(&reason)
        .bind(uid)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No active role found for {}", uid)));
        }

        tracing::info!(uid, revoked_by, "revoked admin role");

        Ok(())
    }

    /// Get active admin role for a uid
    pub async fn get_role(&self, uid: &str) -> AppResult<Option<AdminRole>> {
        let row = sqlx::query(
            r#"
            SELECT id, uid, role, granted_by, granted_at, revoked, revoked_at, revoked_by, notes
            FROM admin_roles
            WHERE uid = ?1 AND revoked = 0
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_str: String = row.get("role");

        Ok(Some(AdminRole {
            id: row.get("id"),
            uid: row.get("uid"),
            role: Role::parse(&role_str)?,
            granted_by: row.get("granted_by"),
            granted_at: row.try_get("granted_at")?,
            revoked: row.get("revoked"),
            revoked_at: row.try_get("revoked_at")?,
            revoked_by: row.get("revoked_by"),
            notes: row.get("notes"),
        }))
    }

    /// Effective role of a uid, counting configured administrators
    pub async fn effective_role(&self, uid: &str) -> AppResult<Option<Role>> {
        if self.configured.contains(uid) {
            return Ok(Some(Role::SuperAdmin));
        }

        Ok(self.get_role(uid).await?.map(|r| r.role))
    }

    /// Check if a uid has at least a specific role
    pub async fn has_role(&self, uid: &str, required_role: Role) -> AppResult<bool> {
        Ok(self
            .effective_role(uid)
            .await?
            .is_some_and(|role| role.can_act_as(required_role)))
    }

    /// Fail with `Forbidden` unless the uid holds at least `required_role`
    pub async fn require_role(&self, uid: &str, required_role: Role) -> AppResult<Role> {
        match self.effective_role(uid).await? {
            Some(role) if role.can_act_as(required_role) => Ok(role),
            _ => Err(AppError::Forbidden(format!(
                "{} role required",
                required_role.as_str()
            ))),
        }
    }

    /// Log admin action to audit log
    pub async fn log_action(
        &self,
        admin_uid: &str,
        action: &str,
        subject: Option<&str>,
        details: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (admin_uid, action, subject, details, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(admin_uid)
        .bind(action)
        .bind(subject)
        .bind(details)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Most recent audit log entries, newest first
    pub async fn recent_actions(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, admin_uid, action, subject, details, timestamp
            FROM admin_audit_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::SuperAdmin > Role::Admin);
        assert!(Role::Admin > Role::Moderator);

        assert!(Role::SuperAdmin.can_act_as(Role::Admin));
        assert!(Role::Admin.can_act_as(Role::Moderator));

        assert!(!Role::Moderator.can_act_as(Role::Admin));
        assert!(!Role::Admin.can_act_as(Role::SuperAdmin));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("moderator").unwrap(), Role::Moderator);
        assert_eq!(Role::parse("ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::parse("superadmin").unwrap(), Role::SuperAdmin);

        assert!(Role::parse("owner").is_err());
    }

    #[tokio::test]
    async fn test_grant_and_get_role() {
        let (_dir, pool) = db::test_pool().await;
        let manager = AdminRoleManager::new(pool, Vec::new());

        let role = manager
            .grant_role("alice", Role::Admin, "root", Some("First admin".to_string()))
            .await
            .unwrap();

        assert_eq!(role.uid, "alice");
        assert!(!role.revoked);

        let retrieved = manager.get_role("alice").await.unwrap().unwrap();
        assert_eq!(retrieved.role, Role::Admin);

        assert!(manager.has_role("alice", Role::Admin).await.unwrap());
        assert!(manager.has_role("alice", Role::Moderator).await.unwrap());
        assert!(!manager.has_role("alice", Role::SuperAdmin).await.unwrap());

        assert!(matches!(
            manager.grant_role("alice", Role::Moderator, "root", None).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_and_regrant() {
        let (_dir, pool) = db::test_pool().await;
        let manager = AdminRoleManager::new(pool, Vec::new());

        manager
            .grant_role("bob", Role::Moderator, "root", None)
            .await
            .unwrap();
        manager
            .revoke_role("bob", "root", Some("No longer needed".to_string()))
            .await
            .unwrap();

        assert!(manager.get_role("bob").await.unwrap().is_none());
        assert!(matches!(
            manager.revoke_role("bob", "root", None).await,
            Err(AppError::NotFound(_))
        ));

        manager.grant_role("bob", Role::Admin, "root", None).await.unwrap();
        assert!(manager.has_role("bob", Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_configured_admins_and_audit_log() {
        let (_dir, pool) = db::test_pool().await;
        let manager = AdminRoleManager::new(pool, vec!["root".to_string()]);

        assert_eq!(
            manager.require_role("root", Role::SuperAdmin).await.unwrap(),
            Role::SuperAdmin
        );
        assert!(matches!(
            manager.require_role("mallory", Role::Moderator).await,
            Err(AppError::Forbidden(_))
        ));

        manager
            .log_action("root", "delete_content", Some("v1"), None)
            .await
            .unwrap();
        let entries = manager.recent_actions(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject.as_deref(), Some("v1"));
    }
}
