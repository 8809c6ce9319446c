//! Role checks for admin-only routes.

use charisma_core::error::AppError;
use charisma_entity::user::UserRole;

use crate::extractors::AuthUser;

/// Checks that the authenticated user has the Admin role.
pub fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.role != UserRole::Admin {
        return Err(AppError::authorization("Admin access required"));
    }
    Ok(())
}
