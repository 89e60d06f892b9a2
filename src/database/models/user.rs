use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::codec;

/// A row of the `usuarios` table. Never serialized directly: `clave` holds
/// the password hash and must not leave the process.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub nombre: String,
    pub apellido: String,
    pub departamento: String,
    pub correo: String,
    pub clave: String,
    pub activo: bool,
    pub eliminado: bool,
    pub usuario_creador: Option<i64>,
}

/// Insert payload. `clave_hash` is already hashed by the service layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nombre: String,
    pub apellido: String,
    pub departamento: String,
    pub correo: String,
    pub clave_hash: String,
    pub usuario_creador: Option<i64>,
}

/// Partial update. Only `Some` non-empty fields are applied.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub departamento: Option<String>,
    pub correo: Option<String>,
    pub clave_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        super::present(&self.nombre).is_none()
            && super::present(&self.apellido).is_none()
            && super::present(&self.departamento).is_none()
            && super::present(&self.correo).is_none()
            && super::present(&self.clave_hash).is_none()
    }
}

/// List filters: case-insensitive substring on `departamento`, an optional
/// status filter and a free-text search over nombre, apellido and correo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub departamento: Option<String>,
    pub activo: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub departamento: String,
    pub correo: String,
    pub activo: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: codec::encode(user.id),
            nombre: user.nombre.clone(),
            apellido: user.apellido.clone(),
            departamento: user.departamento.clone(),
            correo: user.correo.clone(),
            activo: user.activo,
        }
    }
}
