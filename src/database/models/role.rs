use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::codec;

#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: i64,
    pub nombre: String,
    pub nivel_jerarquia: i32,
    pub eliminado: bool,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub nombre: String,
    pub nivel_jerarquia: i32,
    pub created_by: Option<i64>,
}

/// Partial update. `updated_by` is bookkeeping: it is written alongside a real
/// change but never counts as one.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub nombre: Option<String>,
    pub nivel_jerarquia: Option<i32>,
    pub updated_by: Option<i64>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        super::present(&self.nombre).is_none() && self.nivel_jerarquia.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: String,
    pub nombre: String,
    pub nivel_jerarquia: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl From<&Role> for RoleView {
    fn from(role: &Role) -> Self {
        Self {
            id: codec::encode(role.id),
            nombre: role.nombre.clone(),
            nivel_jerarquia: role.nivel_jerarquia,
            created_by: codec::encode_opt(role.created_by),
            updated_by: codec::encode_opt(role.updated_by),
        }
    }
}
