use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use super::validation::{self, decode_id};
use super::{resolve_actor, ListPage, PageSettings};
use crate::auth::PasswordHasher;
use crate::database::models::{present, EntityKind, NewUser, UserFilter, UserPatch, UserView};
use crate::database::Page;
use crate::store::{RbacStore, UserStore};

/// Create/update payload. On update every field is optional and blank values
/// count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub departamento: Option<String>,
    pub correo: Option<String>,
    pub clave: Option<String>,
}

/// User page with the active/inactive totals shown next to the table.
#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    #[serde(flatten)]
    pub page: ListPage<UserView>,
    pub total_activos: i64,
    pub total_inactivos: i64,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RbacStore>,
    hasher: Arc<dyn PasswordHasher>,
    password_min_length: usize,
    pages: PageSettings,
}

impl UserService {
    pub fn new(
        store: Arc<dyn RbacStore>,
        hasher: Arc<dyn PasswordHasher>,
        password_min_length: usize,
        pages: PageSettings,
    ) -> Self {
        Self {
            store,
            hasher,
            password_min_length,
            pages,
        }
    }

    pub async fn list(
        &self,
        filter: &UserFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<UserList> {
        let page = self.pages.resolve(limit, offset)?;
        let users = self.store.list_users(filter, page).await?;
        let records_total = self.store.count_users(&UserFilter::default()).await?;
        let records_filtered = self.store.count_users(filter).await?;
        let total_activos = self.store.count_users_by_status(true).await?;
        let total_inactivos = self.store.count_users_by_status(false).await?;

        Ok(UserList {
            page: ListPage {
                records_total,
                records_filtered,
                data: users.iter().map(UserView::from).collect(),
            },
            total_activos,
            total_inactivos,
        })
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<UserView>> {
        let users = self
            .store
            .list_users(&UserFilter::default(), Page::all())
            .await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// `None` when the user does not exist or is soft-deleted.
    pub async fn get(&self, opaque: &str) -> ServiceResult<Option<UserView>> {
        let id = decode_id(EntityKind::User, opaque)?;
        Ok(self.store.get_user(id).await?.as_ref().map(UserView::from))
    }

    pub async fn require(&self, opaque: &str) -> ServiceResult<UserView> {
        self.get(opaque)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User))
    }

    /// Create an inactive user and return its encoded id.
    pub async fn create(&self, input: UserInput, actor: Option<i64>) -> ServiceResult<String> {
        let nombre = validation::required("nombre", &input.nombre)?;
        let apellido = validation::required("apellido", &input.apellido)?;
        let departamento = validation::required("departamento", &input.departamento)?;
        let correo = validation::required("correo", &input.correo)?;
        validation::email("correo", &correo)?;
        let clave = input
            .clave
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ServiceError::validation("clave", "clave is required"))?;
        validation::password("clave", clave, self.password_min_length)?;

        if self.store.correo_taken(&correo, None).await? {
            return Err(ServiceError::DuplicateEmail);
        }

        let clave_hash = self.hash(clave).await?;
        let usuario_creador = resolve_actor(self.store.as_ref(), actor).await?;

        let id = self
            .store
            .create_user(NewUser {
                nombre,
                apellido,
                departamento,
                correo,
                clave_hash,
                usuario_creador,
            })
            .await?;

        tracing::info!("Created user {}", id);
        Ok(crate::codec::encode(id))
    }

    /// Apply the supplied fields that differ from the stored ones. A new
    /// password always counts as a change and is re-hashed.
    pub async fn update(&self, opaque: &str, input: UserInput) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::User, opaque)?;
        let Some(current) = self.store.get_user(id).await? else {
            return Ok(false);
        };

        let mut patch = UserPatch::default();
        if let Some(v) = present(&input.nombre).filter(|v| *v != current.nombre) {
            patch.nombre = Some(v.to_string());
        }
        if let Some(v) = present(&input.apellido).filter(|v| *v != current.apellido) {
            patch.apellido = Some(v.to_string());
        }
        if let Some(v) = present(&input.departamento).filter(|v| *v != current.departamento) {
            patch.departamento = Some(v.to_string());
        }
        if let Some(v) = present(&input.correo) {
            validation::email("correo", v)?;
            if v != current.correo {
                if self.store.correo_taken(v, Some(id)).await? {
                    return Err(ServiceError::DuplicateEmail);
                }
                patch.correo = Some(v.to_string());
            }
        }
        if let Some(clave) = input.clave.as_deref().filter(|c| !c.is_empty()) {
            validation::password("clave", clave, self.password_min_length)?;
            patch.clave_hash = Some(self.hash(clave).await?);
        }

        if patch.is_empty() {
            tracing::debug!("No changes to apply for user {}", id);
            return Ok(false);
        }
        Ok(self.store.update_user(id, patch).await?)
    }

    /// Activate or suspend a user.
    pub async fn set_active(&self, opaque: &str, activo: bool) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::User, opaque)?;
        let changed = self.store.set_user_active(id, activo).await?;
        if changed {
            tracing::info!("User {} activo={}", id, activo);
        }
        Ok(changed)
    }

    pub async fn delete(&self, opaque: &str) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::User, opaque)?;
        Ok(self.store.delete_user(id).await?)
    }

    /// The active user whose credentials match, if any.
    pub async fn verify_credentials(
        &self,
        correo: &str,
        clave: &str,
    ) -> ServiceResult<Option<UserView>> {
        let Some(user) = self.store.find_user_by_correo(correo).await? else {
            return Ok(None);
        };
        if !user.activo {
            tracing::debug!("Credential check for inactive user {}", user.id);
            return Ok(None);
        }

        let hasher = Arc::clone(&self.hasher);
        let plain = clave.to_string();
        let stored = user.clave.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plain, &stored))
            .await
            .map_err(anyhow::Error::new)?;

        Ok(matches.then(|| UserView::from(&user)))
    }

    async fn hash(&self, plain: &str) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(anyhow::Error::new)??;
        Ok(hash)
    }
}
