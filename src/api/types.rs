//! Shared types for the API layer.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::UserRole;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Caller identity forwarded by the gateway, injected into request
/// extensions by the identity middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: UserRole,
}

impl Identity {
    pub fn require(&self, role: UserRole) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Doctors and admins.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
