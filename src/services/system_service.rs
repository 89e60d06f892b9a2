use std::sync::Arc;

use serde::Deserialize;

use super::error::{ServiceError, ServiceResult};
use super::validation::{self, decode_id};
use super::{ListPage, PageSettings};
use crate::codec;
use crate::database::models::{present, EntityKind, NewSystem, SystemFilter, SystemPatch, SystemView};
use crate::database::Page;
use crate::store::{RbacStore, SystemStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInput {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
}

#[derive(Clone)]
pub struct SystemService {
    store: Arc<dyn RbacStore>,
    pages: PageSettings,
}

impl SystemService {
    pub fn new(store: Arc<dyn RbacStore>, pages: PageSettings) -> Self {
        Self { store, pages }
    }

    pub async fn list(
        &self,
        filter: &SystemFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<ListPage<SystemView>> {
        let page = self.pages.resolve(limit, offset)?;
        let systems = self.store.list_systems(filter, page).await?;
        Ok(ListPage {
            records_total: self.store.count_systems(&SystemFilter::default()).await?,
            records_filtered: self.store.count_systems(filter).await?,
            data: systems.iter().map(SystemView::from).collect(),
        })
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<SystemView>> {
        let systems = self
            .store
            .list_systems(&SystemFilter::default(), Page::all())
            .await?;
        Ok(systems.iter().map(SystemView::from).collect())
    }

    pub async fn get(&self, opaque: &str) -> ServiceResult<Option<SystemView>> {
        let id = decode_id(EntityKind::System, opaque)?;
        Ok(self.store.get_system(id).await?.as_ref().map(SystemView::from))
    }

    pub async fn require(&self, opaque: &str) -> ServiceResult<SystemView> {
        self.get(opaque)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::System))
    }

    pub async fn create(&self, input: SystemInput) -> ServiceResult<String> {
        let nombre = validation::required("nombre", &input.nombre)?;
        let descripcion = present(&input.descripcion).unwrap_or_default().to_string();

        if self.store.system_name_taken(&nombre, None).await? {
            return Err(ServiceError::DuplicateName {
                entity: EntityKind::System,
            });
        }

        let id = self
            .store
            .create_system(NewSystem {
                nombre,
                descripcion,
            })
            .await?;
        tracing::info!("Created system {}", id);
        Ok(codec::encode(id))
    }

    pub async fn update(&self, opaque: &str, input: SystemInput) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::System, opaque)?;
        let Some(current) = self.store.get_system(id).await? else {
            return Ok(false);
        };

        let mut patch = SystemPatch::default();
        if let Some(v) = present(&input.nombre).filter(|v| *v != current.nombre) {
            if self.store.system_name_taken(v, Some(id)).await? {
                return Err(ServiceError::DuplicateName {
                    entity: EntityKind::System,
                });
            }
            patch.nombre = Some(v.to_string());
        }
        if let Some(v) = present(&input.descripcion).filter(|v| *v != current.descripcion) {
            patch.descripcion = Some(v.to_string());
        }

        if patch.is_empty() {
            return Ok(false);
        }
        Ok(self.store.update_system(id, patch).await?)
    }

    pub async fn delete(&self, opaque: &str) -> ServiceResult<bool> {
        let id = decode_id(EntityKind::System, opaque)?;
        Ok(self.store.delete_system(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::services;

    fn input(nombre: &str) -> SystemInput {
        SystemInput {
            nombre: Some(nombre.into()),
            descripcion: Some("Planificación".into()),
        }
    }

    #[tokio::test]
    async fn names_are_unique_among_live_systems() {
        let (services, _) = services();
        let erp = services.systems.create(input("ERP")).await.unwrap();
        let err = services.systems.create(input("erp")).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DuplicateName {
                entity: EntityKind::System
            }
        ));

        services.systems.delete(&erp).await.unwrap();
        services.systems.create(input("ERP")).await.unwrap();
    }

    #[tokio::test]
    async fn nombre_is_required() {
        let (services, _) = services();
        let err = services
            .systems
            .create(SystemInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "nombre", .. }));
    }

    #[tokio::test]
    async fn search_covers_name_and_description() {
        let (services, _) = services();
        services.systems.create(input("ERP")).await.unwrap();
        services
            .systems
            .create(SystemInput {
                nombre: Some("CRM".into()),
                descripcion: Some("Clientes".into()),
            })
            .await
            .unwrap();

        let filter = SystemFilter {
            search: Some("cliente".into()),
        };
        let page = services.systems.list(&filter, None, None).await.unwrap();
        assert_eq!(page.records_total, 2);
        assert_eq!(page.records_filtered, 1);
        assert_eq!(page.data[0].nombre, "CRM");
    }

    #[tokio::test]
    async fn update_renames_and_keeps_description() {
        let (services, _) = services();
        let id = services.systems.create(input("ERP")).await.unwrap();
        let changed = services
            .systems
            .update(
                &id,
                SystemInput {
                    nombre: Some("ERP2".into()),
                    descripcion: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert!(changed);
        let system = services.systems.require(&id).await.unwrap();
        assert_eq!(system.nombre, "ERP2");
        assert_eq!(system.descripcion, "Planificación");
    }
}
