use std::sync::Arc;

use serde::Deserialize;

use super::error::{ServiceError, ServiceResult};
use super::validation::{self, decode_id};
use super::{resolve_actor, ListPage, PageSettings};
use crate::codec;
use crate::database::models::{present, EntityKind, NewRole, RoleFilter, RolePatch, RoleView};
use crate::database::Page;
use crate::store::{RbacStore, RoleStore, UserStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleInput {
    pub nombre: Option<String>,
    pub nivel_jerarquia: Option<i64>,
}

#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn RbacStore>,
    pages: PageSettings,
}

impl RoleService {
    pub fn new(store: Arc<dyn RbacStore>, pages: PageSettings) -> Self {
        Self { store, pages }
    }

    pub async fn list(
        &self,
        filter: &RoleFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<ListPage<RoleView>> {
        let page = self.pages.resolve(limit, offset)?;
        let roles = self.store.list_roles(filter, page).await?;
        Ok(ListPage {
            records_total: self.store.count_roles(&RoleFilter::default()).await?,
            records_filtered: self.store.count_roles(filter).await?,
            data: roles.iter().map(RoleView::from).collect(),
        })
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<RoleView>> {
        let roles = self
            .store
            .list_roles(&RoleFilter::default(), Page::all())
            .await?;
        Ok(roles.iter().map(RoleView::from).collect())
    }

    pub async fn get(&self, opaque: &str) -> ServiceResult<Option<RoleView>> {
        let id = decode_id(EntityKind::Role, opaque)?;
        Ok(self.store.get_role(id).await?.as_ref().map(RoleView::from))
    }

    pub async fn require(&self, opaque: &str) -> ServiceResult<RoleView> {
        self.get(opaque)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Role))
    }

    pub async fn create(&self, input: RoleInput, actor: Option<i64>) -> ServiceResult<String> {
        let nombre = validation::required("nombre", &input.nombre)?;
        let nivel = input.nivel_jerarquia.ok_or_else(|| {
            ServiceError::validation("nivel_jerarquia", "nivel_jerarquia is required")
        })?;
        let nivel_jerarquia = validation::hierarchy_level("nivel_jerarquia", nivel)?;

        if self.store.role_name_taken(&nombre, None).await? {
            return Err(ServiceError::DuplicateName {
                entity: EntityKind::Role,
            });
        }

        let created_by = resolve_actor(self.store.as_ref(), actor).await?;
        let id = self
            .store
            .create_role(NewRole {
                nombre,
                nivel_jerarquia,
                created_by,
            })
            .await?;
        tracing::info!("Created role {}", id);
        Ok(codec::encode(id))
    }

    pub async fn update(
        &self,
        opaque: &str,
        input: RoleInput,
        actor: Option<i64>,
    ) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::Role, opaque)?;
        let Some(current) = self.store.get_role(id).await? else {
            return Ok(false);
        };

        let mut patch = RolePatch::default();
        if let Some(v) = present(&input.nombre).filter(|v| *v != current.nombre) {
            if self.store.role_name_taken(v, Some(id)).await? {
                return Err(ServiceError::DuplicateName {
                    entity: EntityKind::Role,
                });
            }
            patch.nombre = Some(v.to_string());
        }
        if let Some(nivel) = input.nivel_jerarquia {
            let nivel = validation::hierarchy_level("nivel_jerarquia", nivel)?;
            if nivel != current.nivel_jerarquia {
                patch.nivel_jerarquia = Some(nivel);
            }
        }

        if patch.is_empty() {
            return Ok(false);
        }
        patch.updated_by = resolve_actor(self.store.as_ref(), actor).await?;
        Ok(self.store.update_role(id, patch).await?)
    }

    pub async fn delete(&self, opaque: &str) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::Role, opaque)?;
        Ok(self.store.delete_role(id).await?)
    }

    /// Roles a user currently holds across all systems.
    pub async fn roles_of_user(&self, user: &str) -> ServiceResult<Vec<RoleView>> {
        let user_id = decode_id(EntityKind::User, user)?;
        if self.store.get_user(user_id).await?.is_none() {
            return Err(ServiceError::not_found(EntityKind::User));
        }
        let roles = self.store.roles_of_user(user_id).await?;
        Ok(roles.iter().map(RoleView::from).collect())
    }
}
