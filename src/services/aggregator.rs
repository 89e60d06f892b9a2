//! Folds the flat user → system → role → permission join into one nested tree
//! per user.
//!
//! The join multiplies rows (systems × roles × permissions per user), so the
//! fold keys every level by id, keeps the first-seen order of each level, and
//! drops repeated permission leaves. Branches that end early (a user without
//! assignments, a role without permissions) are kept as empty lists.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use super::validation::decode_id;
use crate::codec;
use crate::database::models::{EntityKind, PermissionTreeRow};
use crate::store::{PermissionTreeSource, RbacStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPermissionTree {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub departamento: String,
    pub correo: String,
    pub activo: bool,
    pub sistemas: Vec<SystemBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemBranch {
    pub id: String,
    pub nombre: String,
    pub roles: Vec<RoleBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBranch {
    pub id: String,
    pub nombre: String,
    pub nivel_jerarquia: i32,
    pub permisos: Vec<PermissionLeaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionLeaf {
    pub id: String,
    pub nombre: String,
}

/// Insertion-ordered map from raw id to a child bucket.
struct Ordered<T> {
    index: HashMap<i64, usize>,
    items: Vec<T>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Ordered<T> {
    fn entry(&mut self, id: i64, make: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.items.push(make());
                self.index.insert(id, self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[slot]
    }
}

struct RoleBucket {
    id: i64,
    nombre: String,
    nivel_jerarquia: i32,
    permisos: Ordered<PermissionLeaf>,
}

struct SystemBucket {
    id: i64,
    nombre: String,
    roles: Ordered<RoleBucket>,
}

struct UserBucket {
    id: i64,
    nombre: String,
    apellido: String,
    departamento: String,
    correo: String,
    activo: bool,
    sistemas: Ordered<SystemBucket>,
}

/// Accumulates rows one at a time; `finish` yields trees ordered by user id.
#[derive(Default)]
pub struct TreeBuilder {
    users: BTreeMap<i64, UserBucket>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: PermissionTreeRow) {
        let user = self.users.entry(row.usuario_id).or_insert_with(|| UserBucket {
            id: row.usuario_id,
            nombre: row.nombre.clone(),
            apellido: row.apellido.clone(),
            departamento: row.departamento.clone(),
            correo: row.correo.clone(),
            activo: row.activo,
            sistemas: Ordered::default(),
        });

        let Some(sistema_id) = row.sistema_id else {
            return;
        };
        let system = user.sistemas.entry(sistema_id, || SystemBucket {
            id: sistema_id,
            nombre: row.sistema_nombre.clone().unwrap_or_default(),
            roles: Ordered::default(),
        });

        let Some(rol_id) = row.rol_id else {
            return;
        };
        let role = system.roles.entry(rol_id, || RoleBucket {
            id: rol_id,
            nombre: row.rol_nombre.clone().unwrap_or_default(),
            nivel_jerarquia: row.nivel_jerarquia.unwrap_or_default(),
            permisos: Ordered::default(),
        });

        if let Some(permiso_id) = row.permiso_id {
            role.permisos.entry(permiso_id, || PermissionLeaf {
                id: codec::encode(permiso_id),
                nombre: row.permiso_nombre.clone().unwrap_or_default(),
            });
        }
    }

    pub fn finish(self) -> Vec<UserPermissionTree> {
        self.users
            .into_values()
            .map(|user| UserPermissionTree {
                id: codec::encode(user.id),
                nombre: user.nombre,
                apellido: user.apellido,
                departamento: user.departamento,
                correo: user.correo,
                activo: user.activo,
                sistemas: user
                    .sistemas
                    .items
                    .into_iter()
                    .map(|system| SystemBranch {
                        id: codec::encode(system.id),
                        nombre: system.nombre,
                        roles: system
                            .roles
                            .items
                            .into_iter()
                            .map(|role| RoleBranch {
                                id: codec::encode(role.id),
                                nombre: role.nombre,
                                nivel_jerarquia: role.nivel_jerarquia,
                                permisos: role.permisos.items,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Drain a row stream through a `TreeBuilder`.
pub async fn fold_rows<S>(rows: S) -> Result<Vec<UserPermissionTree>, StoreError>
where
    S: Stream<Item = Result<PermissionTreeRow, StoreError>>,
{
    rows.try_fold(TreeBuilder::new(), |mut builder, row| async move {
        builder.push(row);
        Ok(builder)
    })
    .await
    .map(TreeBuilder::finish)
}

#[derive(Clone)]
pub struct PermissionAggregator {
    store: Arc<dyn RbacStore>,
}

impl PermissionAggregator {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// Trees for every live user.
    pub async fn all(&self) -> ServiceResult<Vec<UserPermissionTree>> {
        Ok(fold_rows(self.store.permission_rows(None)).await?)
    }

    /// Tree for one user, by decoded id.
    pub async fn for_user_id(&self, user_id: i64) -> ServiceResult<UserPermissionTree> {
        fold_rows(self.store.permission_rows(Some(user_id)))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(EntityKind::User))
    }

    pub async fn for_user(&self, opaque: &str) -> ServiceResult<UserPermissionTree> {
        let user_id = decode_id(EntityKind::User, opaque)?;
        self.for_user_id(user_id).await
    }
}
