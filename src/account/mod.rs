/// User directory
///
/// Registration and lookup of the users that own content. Credentials are
/// handled by the identity provider; only the uid from a verified token and
/// a unique username are stored here.

mod manager;

pub use manager::AccountManager;

use serde::{Deserialize, Serialize};

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}
