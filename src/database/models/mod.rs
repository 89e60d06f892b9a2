pub mod assignment;
pub mod permission;
pub mod role;
pub mod system;
pub mod user;

pub use assignment::{
    AssignmentFilter, AssignmentRow, AssignmentView, PermissionTreeRow, RolePermission,
    UserSystemRole,
};
pub use permission::{NewPermission, Permission, PermissionFilter, PermissionPatch, PermissionView};
pub use role::{NewRole, Role, RoleFilter, RolePatch, RoleView};
pub use system::{NewSystem, System, SystemFilter, SystemPatch, SystemView};
pub use user::{NewUser, User, UserFilter, UserPatch, UserView};

/// Entity kinds, used to scope identifier and uniqueness errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    System,
    Role,
    Permission,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::System => "System",
            EntityKind::Role => "Role",
            EntityKind::Permission => "Permission",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Treat empty or whitespace-only strings as absent.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
