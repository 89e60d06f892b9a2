use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::codec;

#[derive(Debug, Clone, FromRow)]
pub struct Permission {
    pub id: i64,
    pub nombre: String,
    pub eliminado: bool,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub nombre: String,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionPatch {
    pub nombre: Option<String>,
    pub updated_by: Option<i64>,
}

impl PermissionPatch {
    pub fn is_empty(&self) -> bool {
        super::present(&self.nombre).is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionView {
    pub id: String,
    pub nombre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl From<&Permission> for PermissionView {
    fn from(permission: &Permission) -> Self {
        Self {
            id: codec::encode(permission.id),
            nombre: permission.nombre.clone(),
            created_by: codec::encode_opt(permission.created_by),
            updated_by: codec::encode_opt(permission.updated_by),
        }
    }
}
