/// Administration
///
/// Administrator roles, the bootstrap list of configured administrators and
/// the audit log of administrative actions.

pub mod roles;

pub use roles::{AdminRole, AdminRoleManager, Role};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Admin action audit log entry
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_uid: String,
    pub action: String,
    pub subject: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}
