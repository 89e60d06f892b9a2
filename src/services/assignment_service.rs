use std::sync::Arc;

use serde::Deserialize;

use super::error::{ServiceError, ServiceResult};
use super::validation::decode_id;
use super::{ListPage, PageSettings};
use crate::database::models::{
    AssignmentFilter, AssignmentView, EntityKind, RolePermission, UserSystemRole,
};
use crate::store::{AssignmentStore, PermissionStore, RbacStore, RoleStore, SystemStore, UserStore};

/// Body of a user → (system, role) grant.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRoleInput {
    pub sistema_id: String,
    pub rol_id: String,
}

/// Body of a role → permission grant.
#[derive(Debug, Clone, Deserialize)]
pub struct RolePermissionInput {
    pub permiso_id: String,
}

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn RbacStore>,
    pages: PageSettings,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn RbacStore>, pages: PageSettings) -> Self {
        Self { store, pages }
    }

    fn user_role_key(user: &str, sistema: &str, rol: &str) -> ServiceResult<UserSystemRole> {
        Ok(UserSystemRole {
            usuario_id: decode_id(EntityKind::User, user)?,
            sistema_id: decode_id(EntityKind::System, sistema)?,
            rol_id: decode_id(EntityKind::Role, rol)?,
        })
    }

    fn role_permission_key(rol: &str, permiso: &str) -> ServiceResult<RolePermission> {
        Ok(RolePermission {
            rol_id: decode_id(EntityKind::Role, rol)?,
            permiso_id: decode_id(EntityKind::Permission, permiso)?,
        })
    }

    async fn ensure_user(&self, id: i64) -> ServiceResult<()> {
        match self.store.get_user(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::User)),
        }
    }

    async fn ensure_system(&self, id: i64) -> ServiceResult<()> {
        match self.store.get_system(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::System)),
        }
    }

    async fn ensure_role(&self, id: i64) -> ServiceResult<()> {
        match self.store.get_role(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::Role)),
        }
    }

    async fn ensure_permission(&self, id: i64) -> ServiceResult<()> {
        match self.store.get_permission(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::Permission)),
        }
    }

    /// Grant `rol` within `sistema` to `user`. All three must exist and be
    /// live; an existing identical grant is an error.
    pub async fn assign_user_role(
        &self,
        user: &str,
        sistema: &str,
        rol: &str,
    ) -> ServiceResult<bool> {
        let key = Self::user_role_key(user, sistema, rol)?;
        self.ensure_user(key.usuario_id).await?;
        self.ensure_system(key.sistema_id).await?;
        self.ensure_role(key.rol_id).await?;

        if self.store.user_role_exists(key).await? {
            return Err(ServiceError::AssignmentExists);
        }
        let assigned = self.store.assign_user_role(key).await?;
        tracing::info!(
            "Assigned role {} in system {} to user {}",
            key.rol_id,
            key.sistema_id,
            key.usuario_id
        );
        Ok(assigned)
    }

    /// Exact-match removal; `false` when the grant did not exist.
    pub async fn remove_user_role(
        &self,
        user: &str,
        sistema: &str,
        rol: &str,
    ) -> ServiceResult<bool> {
        let key = Self::user_role_key(user, sistema, rol)?;
        Ok(self.store.remove_user_role(key).await?)
    }

    pub async fn assign_role_permission(&self, rol: &str, permiso: &str) -> ServiceResult<bool> {
        let key = Self::role_permission_key(rol, permiso)?;
        self.ensure_role(key.rol_id).await?;
        self.ensure_permission(key.permiso_id).await?;

        if self.store.role_permission_exists(key).await? {
            return Err(ServiceError::AssignmentExists);
        }
        let assigned = self.store.assign_role_permission(key).await?;
        tracing::info!("Granted permission {} to role {}", key.permiso_id, key.rol_id);
        Ok(assigned)
    }

    pub async fn remove_role_permission(&self, rol: &str, permiso: &str) -> ServiceResult<bool> {
        let key = Self::role_permission_key(rol, permiso)?;
        Ok(self.store.remove_role_permission(key).await?)
    }

    /// One page of a user's (system, role, permission) lines.
    pub async fn user_assignments(
        &self,
        user: &str,
        filter: &AssignmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<ListPage<AssignmentView>> {
        let user_id = decode_id(EntityKind::User, user)?;
        self.ensure_user(user_id).await?;
        let page = self.pages.resolve(limit, offset)?;

        let rows = self.store.user_assignments(user_id, filter, page).await?;
        Ok(ListPage {
            records_total: self
                .store
                .count_user_assignments(user_id, &AssignmentFilter::default())
                .await?,
            records_filtered: self.store.count_user_assignments(user_id, filter).await?,
            data: rows.iter().map(AssignmentView::from).collect(),
        })
    }
}
