use thiserror::Error;

use crate::db_types::UserId;

#[allow(async_fn_in_trait)]
pub trait PermissionManagement: Clone {
    /// The names of the permissions granted by the user's admin role. Inactive roles grant nothing.
    async fn fetch_permissions(&self, user_id: &UserId) -> Result<Vec<String>, PermissionError>;

    /// Sets (or with `None`, clears) the user's admin role. The role is given by name.
    async fn assign_admin_role(&self, user_id: &UserId, role: Option<&str>) -> Result<(), PermissionError>;
}

#[derive(Debug, Clone, Error)]
pub enum PermissionError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Admin role {0} does not exist")]
    RoleNotFound(String),
    #[error("Permission {0} is required")]
    Forbidden(String),
}

impl PermissionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::RoleNotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
        }
    }
}

impl From<sqlx::Error> for PermissionError {
    fn from(e: sqlx::Error) -> Self {
        PermissionError::DatabaseError(e.to_string())
    }
}
