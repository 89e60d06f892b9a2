//! Service layer: decodes and validates input, enforces the business rules,
//! and is the only caller of the store.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::PasswordHasher;
use crate::config::AppConfig;
use crate::database::Page;
use crate::store::{RbacStore, UserStore};

pub mod aggregator;
pub mod assignment_service;
pub mod error;
pub mod permission_service;
pub mod policy;
pub mod role_service;
pub mod system_service;
pub mod user_service;
pub mod validation;

pub use aggregator::{PermissionAggregator, UserPermissionTree};
pub use assignment_service::{AssignmentService, RolePermissionInput, UserRoleInput};
pub use error::{ServiceError, ServiceResult};
pub use permission_service::{PermissionInput, PermissionService};
pub use policy::{authorize, Action};
pub use role_service::{RoleInput, RoleService};
pub use system_service::{SystemInput, SystemService};
pub use user_service::{UserInput, UserList, UserService};

/// Default and maximum page size for list operations.
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl PageSettings {
    pub fn resolve(&self, limit: Option<i64>, offset: Option<i64>) -> ServiceResult<Page> {
        Ok(Page::new(
            limit.unwrap_or(self.default_limit),
            offset.unwrap_or(0),
            self.max_limit,
        )?)
    }
}

/// One page of a list plus the totals a DataTables client needs.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage<T> {
    pub records_total: i64,
    pub records_filtered: i64,
    pub data: Vec<T>,
}

/// The service graph, wired once at startup and shared by the handlers.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub systems: SystemService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub assignments: AssignmentService,
    pub trees: PermissionAggregator,
}

impl Services {
    pub fn new(
        store: Arc<dyn RbacStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: &AppConfig,
    ) -> Self {
        let pages = PageSettings {
            default_limit: config.api.default_page_size,
            max_limit: config.api.max_page_size,
        };
        Self {
            users: UserService::new(
                store.clone(),
                hasher,
                config.security.password_min_length,
                pages,
            ),
            systems: SystemService::new(store.clone(), pages),
            roles: RoleService::new(store.clone(), pages),
            permissions: PermissionService::new(store.clone(), pages),
            assignments: AssignmentService::new(store.clone(), pages),
            trees: PermissionAggregator::new(store),
        }
    }
}

/// Resolve the acting user for audit columns. Subjects that are not live
/// users (service tokens) record nothing.
pub(crate) async fn resolve_actor(
    store: &dyn RbacStore,
    actor: Option<i64>,
) -> ServiceResult<Option<i64>> {
    match actor {
        Some(id) => Ok(store.get_user(id).await?.map(|u| u.id)),
        None => Ok(None),
    }
}
