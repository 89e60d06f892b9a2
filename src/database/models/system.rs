use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::codec;

#[derive(Debug, Clone, FromRow)]
pub struct System {
    pub id: i64,
    pub nombre: String,
    pub descripcion: String,
    pub eliminado: bool,
}

#[derive(Debug, Clone)]
pub struct NewSystem {
    pub nombre: String,
    pub descripcion: String,
}

#[derive(Debug, Clone, Default)]
pub struct SystemPatch {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
}

impl SystemPatch {
    pub fn is_empty(&self) -> bool {
        super::present(&self.nombre).is_none() && super::present(&self.descripcion).is_none()
    }
}

/// Free-text search over nombre and descripcion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemView {
    pub id: String,
    pub nombre: String,
    pub descripcion: String,
    pub eliminado: bool,
}

impl From<&System> for SystemView {
    fn from(system: &System) -> Self {
        Self {
            id: codec::encode(system.id),
            nombre: system.nombre.clone(),
            descripcion: system.descripcion.clone(),
            eliminado: system.eliminado,
        }
    }
}
