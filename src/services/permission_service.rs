use std::sync::Arc;

use serde::Deserialize;

use super::error::{ServiceError, ServiceResult};
use super::validation::{self, decode_id};
use super::{resolve_actor, ListPage, PageSettings};
use crate::codec;
use crate::database::models::{
    present, EntityKind, NewPermission, PermissionFilter, PermissionPatch, PermissionView,
};
use crate::database::Page;
use crate::store::{PermissionStore, RbacStore, RoleStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionInput {
    pub nombre: Option<String>,
}

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn RbacStore>,
    pages: PageSettings,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RbacStore>, pages: PageSettings) -> Self {
        Self { store, pages }
    }

    pub async fn list(
        &self,
        filter: &PermissionFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<ListPage<PermissionView>> {
        let page = self.pages.resolve(limit, offset)?;
        let permissions = self.store.list_permissions(filter, page).await?;
        Ok(ListPage {
            records_total: self
                .store
                .count_permissions(&PermissionFilter::default())
                .await?,
            records_filtered: self.store.count_permissions(filter).await?,
            data: permissions.iter().map(PermissionView::from).collect(),
        })
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<PermissionView>> {
        let permissions = self
            .store
            .list_permissions(&PermissionFilter::default(), Page::all())
            .await?;
        Ok(permissions.iter().map(PermissionView::from).collect())
    }

    pub async fn get(&self, opaque: &str) -> ServiceResult<Option<PermissionView>> {
        let id = decode_id(EntityKind::Permission, opaque)?;
        Ok(self
            .store
            .get_permission(id)
            .await?
            .as_ref()
            .map(PermissionView::from))
    }

    pub async fn require(&self, opaque: &str) -> ServiceResult<PermissionView> {
        self.get(opaque)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Permission))
    }

    pub async fn create(
        &self,
        input: PermissionInput,
        actor: Option<i64>,
    ) -> ServiceResult<String> {
        let nombre = validation::required("nombre", &input.nombre)?;
        if self.store.permission_name_taken(&nombre, None).await? {
            return Err(ServiceError::DuplicateName {
                entity: EntityKind::Permission,
            });
        }

        let created_by = resolve_actor(self.store.as_ref(), actor).await?;
        let id = self
            .store
            .create_permission(NewPermission { nombre, created_by })
            .await?;
        tracing::info!("Created permission {}", id);
        Ok(codec::encode(id))
    }

    pub async fn update(
        &self,
        opaque: &str,
        input: PermissionInput,
        actor: Option<i64>,
    ) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::Permission, opaque)?;
        let Some(current) = self.store.get_permission(id).await? else {
            return Ok(false);
        };
        let Some(nombre) = present(&input.nombre).filter(|v| *v != current.nombre) else {
            return Ok(false);
        };
        if self.store.permission_name_taken(nombre, Some(id)).await? {
            return Err(ServiceError::DuplicateName {
                entity: EntityKind::Permission,
            });
        }

        let patch = PermissionPatch {
            nombre: Some(nombre.to_string()),
            updated_by: resolve_actor(self.store.as_ref(), actor).await?,
        };
        Ok(self.store.update_permission(id, patch).await?)
    }

    pub async fn delete(&self, opaque: &str) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::Permission, opaque)?;
        Ok(self.store.delete_permission(id).await?)
    }

    /// Permissions granted to a role, by name.
    pub async fn permissions_of_role(&self, role: &str) -> ServiceResult<Vec<PermissionView>> {
        let role_id = decode_id(EntityKind::Role, role)?;
        if self.store.get_role(role_id).await?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Role));
        }
        let permissions = self.store.permissions_of_role(role_id).await?;
        Ok(permissions.iter().map(PermissionView::from).collect())
    }
}
