//! Persistence contracts for the RBAC entities and their assignments.
//!
//! Every read filters soft-deleted rows. Uniqueness of names and emails is
//! checked by the service layer first and enforced again by each backend
//! (partial unique indexes in Postgres, a single write lock in memory), so a
//! lost check-then-insert race still surfaces as the same domain error.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::database::models::{
    AssignmentFilter, AssignmentRow, EntityKind, NewPermission, NewRole, NewSystem, NewUser,
    Permission, PermissionFilter, PermissionPatch, PermissionTreeRow, Role, RoleFilter,
    RolePatch, RolePermission, System, SystemFilter, SystemPatch, User, UserFilter, UserPatch,
    UserSystemRole,
};
use crate::database::Page;

pub mod memory;
pub mod postgres;

#[cfg(test)]
mod postgres_tests;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} name already exists")]
    DuplicateName { entity: EntityKind },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("assignment already exists")]
    AssignmentExists,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self, filter: &UserFilter, page: Page) -> StoreResult<Vec<User>>;
    async fn count_users(&self, filter: &UserFilter) -> StoreResult<i64>;
    async fn count_users_by_status(&self, activo: bool) -> StoreResult<i64>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_correo(&self, correo: &str) -> StoreResult<Option<User>>;
    /// Whether a non-deleted user other than `exclude` already uses `correo`.
    async fn correo_taken(&self, correo: &str, exclude: Option<i64>) -> StoreResult<bool>;
    async fn create_user(&self, user: NewUser) -> StoreResult<i64>;
    /// Apply the present fields. `false` when nothing was applied or the user
    /// is missing or deleted.
    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<bool>;
    async fn set_user_active(&self, id: i64, activo: bool) -> StoreResult<bool>;
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait SystemStore: Send + Sync {
    async fn list_systems(&self, filter: &SystemFilter, page: Page) -> StoreResult<Vec<System>>;
    async fn count_systems(&self, filter: &SystemFilter) -> StoreResult<i64>;
    async fn get_system(&self, id: i64) -> StoreResult<Option<System>>;
    async fn system_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool>;
    async fn create_system(&self, system: NewSystem) -> StoreResult<i64>;
    async fn update_system(&self, id: i64, patch: SystemPatch) -> StoreResult<bool>;
    async fn delete_system(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list_roles(&self, filter: &RoleFilter, page: Page) -> StoreResult<Vec<Role>>;
    async fn count_roles(&self, filter: &RoleFilter) -> StoreResult<i64>;
    async fn get_role(&self, id: i64) -> StoreResult<Option<Role>>;
    async fn role_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool>;
    async fn create_role(&self, role: NewRole) -> StoreResult<i64>;
    async fn update_role(&self, id: i64, patch: RolePatch) -> StoreResult<bool>;
    async fn delete_role(&self, id: i64) -> StoreResult<bool>;
    /// Distinct live roles a user holds through any live system, by name.
    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: Page,
    ) -> StoreResult<Vec<Permission>>;
    async fn count_permissions(&self, filter: &PermissionFilter) -> StoreResult<i64>;
    async fn get_permission(&self, id: i64) -> StoreResult<Option<Permission>>;
    async fn permission_name_taken(&self, nombre: &str, exclude: Option<i64>)
        -> StoreResult<bool>;
    async fn create_permission(&self, permission: NewPermission) -> StoreResult<i64>;
    async fn update_permission(&self, id: i64, patch: PermissionPatch) -> StoreResult<bool>;
    async fn delete_permission(&self, id: i64) -> StoreResult<bool>;
    /// Live permissions granted to a role, by name.
    async fn permissions_of_role(&self, role_id: i64) -> StoreResult<Vec<Permission>>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn user_role_exists(&self, key: UserSystemRole) -> StoreResult<bool>;
    /// Fails with `AssignmentExists` when the triple is already present.
    async fn assign_user_role(&self, key: UserSystemRole) -> StoreResult<bool>;
    /// Exact-match delete; `false` when no row matched.
    async fn remove_user_role(&self, key: UserSystemRole) -> StoreResult<bool>;

    async fn role_permission_exists(&self, key: RolePermission) -> StoreResult<bool>;
    async fn assign_role_permission(&self, key: RolePermission) -> StoreResult<bool>;
    async fn remove_role_permission(&self, key: RolePermission) -> StoreResult<bool>;

    /// A user's (system, role, permission) lines ordered by system, role and
    /// permission name. Branches under soft-deleted parents are hidden.
    async fn user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
        page: Page,
    ) -> StoreResult<Vec<AssignmentRow>>;
    async fn count_user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
    ) -> StoreResult<i64>;
}

/// Source of the flat user → system → role → permission join consumed by the
/// permission aggregator.
pub trait PermissionTreeSource: Send + Sync {
    /// Rows for every live user, or only `user_id` when given, ordered by user
    /// id, system name, role name and permission name.
    fn permission_rows(&self, user_id: Option<i64>) -> BoxStream<'_, StoreResult<PermissionTreeRow>>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Everything the service layer needs from a backend.
pub trait RbacStore:
    UserStore
    + SystemStore
    + RoleStore
    + PermissionStore
    + AssignmentStore
    + PermissionTreeSource
    + StoreHealth
{
}

impl<T> RbacStore for T where
    T: UserStore
        + SystemStore
        + RoleStore
        + PermissionStore
        + AssignmentStore
        + PermissionTreeSource
        + StoreHealth
{
}
