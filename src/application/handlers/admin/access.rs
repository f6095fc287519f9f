//! Admin allowlist check and query parameter normalization.

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{AdminError, PageRequest};

/// Emails allowed on the admin pages. Empty admits every signed-in user.
#[derive(Debug, Clone, Default)]
pub struct AdminAccess {
    allowlist: Vec<String>,
}

impl AdminAccess {
    pub fn new(allowlist: Vec<String>) -> Self {
        Self { allowlist }
    }

    pub fn open() -> Self {
        Self::default()
    }

    pub fn authorize(&self, user: &AuthenticatedUser) -> Result<(), AdminError> {
        if user.is_admin(&self.allowlist) {
            Ok(())
        } else {
            tracing::warn!(user_id = %user.id, "Admin access denied");
            Err(AdminError::Forbidden)
        }
    }
}

/// Page number from the query string; anything below one clamps to one.
pub fn page_request(raw: Option<i64>) -> PageRequest {
    PageRequest::new(raw.map(|page| u32::try_from(page.max(1)).unwrap_or(u32::MAX)))
}
