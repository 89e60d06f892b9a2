use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::codec;

/// Key of the `usuario_sistema_rol` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserSystemRole {
    pub usuario_id: i64,
    pub sistema_id: i64,
    pub rol_id: i64,
}

/// Key of the `rol_permiso` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RolePermission {
    pub rol_id: i64,
    pub permiso_id: i64,
}

/// One (system, role, permission?) line of a user's assignments.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AssignmentRow {
    pub sistema_id: i64,
    pub sistema_nombre: String,
    pub rol_id: i64,
    pub rol_nombre: String,
    pub permiso_id: Option<i64>,
    pub permiso_nombre: Option<String>,
}

/// Filters for a user's assignment listing: substring on system name and role
/// name plus a free-text search across system, role and permission names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilter {
    pub sistema: Option<String>,
    pub rol: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentView {
    pub sistema_id: String,
    pub sistema_nombre: String,
    pub rol_id: String,
    pub rol_nombre: String,
    pub permiso_id: Option<String>,
    pub permiso_nombre: Option<String>,
}

impl From<&AssignmentRow> for AssignmentView {
    fn from(row: &AssignmentRow) -> Self {
        Self {
            sistema_id: codec::encode(row.sistema_id),
            sistema_nombre: row.sistema_nombre.clone(),
            rol_id: codec::encode(row.rol_id),
            rol_nombre: row.rol_nombre.clone(),
            permiso_id: codec::encode_opt(row.permiso_id),
            permiso_nombre: row.permiso_nombre.clone(),
        }
    }
}

/// Flat row of the user → system → role → permission left join. Everything
/// to the right of the user columns may be null.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PermissionTreeRow {
    pub usuario_id: i64,
    pub nombre: String,
    pub apellido: String,
    pub departamento: String,
    pub correo: String,
    pub activo: bool,
    pub sistema_id: Option<i64>,
    pub sistema_nombre: Option<String>,
    pub rol_id: Option<i64>,
    pub rol_nombre: Option<String>,
    pub nivel_jerarquia: Option<i32>,
    pub permiso_id: Option<i64>,
    pub permiso_nombre: Option<String>,
}
