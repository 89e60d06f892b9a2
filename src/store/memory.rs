//! In-memory implementation of the RBAC store.
//!
//! All tables live in one `State` behind a single `tokio::sync::RwLock`, so a
//! uniqueness check and the insert that follows it happen under the same
//! write lock. Not durable: state is lost on restart. Used when no
//! `DATABASE_URL` is configured and throughout the test suite.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;

use super::{
    AssignmentStore, PermissionStore, PermissionTreeSource, RoleStore, StoreError, StoreHealth,
    StoreResult, SystemStore, UserStore,
};
use crate::database::models::{
    present, AssignmentFilter, AssignmentRow, EntityKind, NewPermission, NewRole, NewSystem,
    NewUser, Permission, PermissionFilter, PermissionPatch, PermissionTreeRow, Role, RoleFilter,
    RolePatch, RolePermission, System, SystemFilter, SystemPatch, User, UserFilter, UserPatch,
    UserSystemRole,
};
use crate::database::query::{contains_ci, same_key, search_term};
use crate::database::Page;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    systems: BTreeMap<i64, System>,
    roles: BTreeMap<i64, Role>,
    permissions: BTreeMap<i64, Permission>,
    user_roles: BTreeSet<UserSystemRole>,
    role_permissions: BTreeSet<RolePermission>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id).filter(|u| !u.eliminado)
    }

    fn live_system(&self, id: i64) -> Option<&System> {
        self.systems.get(&id).filter(|s| !s.eliminado)
    }

    fn live_role(&self, id: i64) -> Option<&Role> {
        self.roles.get(&id).filter(|r| !r.eliminado)
    }

    fn live_permission(&self, id: i64) -> Option<&Permission> {
        self.permissions.get(&id).filter(|p| !p.eliminado)
    }

    fn correo_taken(&self, correo: &str, exclude: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| !u.eliminado && Some(u.id) != exclude && same_key(&u.correo, correo))
    }

    fn system_name_taken(&self, nombre: &str, exclude: Option<i64>) -> bool {
        self.systems
            .values()
            .any(|s| !s.eliminado && Some(s.id) != exclude && same_key(&s.nombre, nombre))
    }

    fn role_name_taken(&self, nombre: &str, exclude: Option<i64>) -> bool {
        self.roles
            .values()
            .any(|r| !r.eliminado && Some(r.id) != exclude && same_key(&r.nombre, nombre))
    }

    fn permission_name_taken(&self, nombre: &str, exclude: Option<i64>) -> bool {
        self.permissions
            .values()
            .any(|p| !p.eliminado && Some(p.id) != exclude && same_key(&p.nombre, nombre))
    }

    /// Live permissions of a live role, ordered by name.
    fn role_permissions_sorted(&self, role_id: i64) -> Vec<&Permission> {
        let mut permisos: Vec<&Permission> = self
            .role_permissions
            .iter()
            .filter(|rp| rp.rol_id == role_id)
            .filter_map(|rp| self.live_permission(rp.permiso_id))
            .collect();
        permisos.sort_by(|a, b| a.nombre.cmp(&b.nombre).then(a.id.cmp(&b.id)));
        permisos
    }

    /// The user's (system, role) pairs whose system and role are both live,
    /// ordered by system name then role name.
    fn user_branches(&self, user_id: i64) -> Vec<(&System, &Role)> {
        let mut branches: Vec<(&System, &Role)> = self
            .user_roles
            .iter()
            .filter(|a| a.usuario_id == user_id)
            .filter_map(|a| Some((self.live_system(a.sistema_id)?, self.live_role(a.rol_id)?)))
            .collect();
        branches.sort_by(|(s1, r1), (s2, r2)| {
            s1.nombre
                .cmp(&s2.nombre)
                .then(s1.id.cmp(&s2.id))
                .then(r1.nombre.cmp(&r2.nombre))
                .then(r1.id.cmp(&r2.id))
        });
        branches
    }

    fn assignment_rows(&self, user_id: i64) -> Vec<AssignmentRow> {
        let mut rows = Vec::new();
        for (sistema, rol) in self.user_branches(user_id) {
            let permisos = self.role_permissions_sorted(rol.id);
            if permisos.is_empty() {
                rows.push(AssignmentRow {
                    sistema_id: sistema.id,
                    sistema_nombre: sistema.nombre.clone(),
                    rol_id: rol.id,
                    rol_nombre: rol.nombre.clone(),
                    permiso_id: None,
                    permiso_nombre: None,
                });
            }
            for permiso in permisos {
                rows.push(AssignmentRow {
                    sistema_id: sistema.id,
                    sistema_nombre: sistema.nombre.clone(),
                    rol_id: rol.id,
                    rol_nombre: rol.nombre.clone(),
                    permiso_id: Some(permiso.id),
                    permiso_nombre: Some(permiso.nombre.clone()),
                });
            }
        }
        rows
    }

    fn tree_rows(&self, user_id: Option<i64>) -> Vec<PermissionTreeRow> {
        let mut rows = Vec::new();
        let users = self
            .users
            .values()
            .filter(|u| !u.eliminado)
            .filter(|u| user_id.map_or(true, |id| u.id == id));

        for user in users {
            let base = PermissionTreeRow {
                usuario_id: user.id,
                nombre: user.nombre.clone(),
                apellido: user.apellido.clone(),
                departamento: user.departamento.clone(),
                correo: user.correo.clone(),
                activo: user.activo,
                sistema_id: None,
                sistema_nombre: None,
                rol_id: None,
                rol_nombre: None,
                nivel_jerarquia: None,
                permiso_id: None,
                permiso_nombre: None,
            };

            let branches = self.user_branches(user.id);
            if branches.is_empty() {
                rows.push(base);
                continue;
            }

            for (sistema, rol) in branches {
                let branch = PermissionTreeRow {
                    sistema_id: Some(sistema.id),
                    sistema_nombre: Some(sistema.nombre.clone()),
                    rol_id: Some(rol.id),
                    rol_nombre: Some(rol.nombre.clone()),
                    nivel_jerarquia: Some(rol.nivel_jerarquia),
                    ..base.clone()
                };
                let permisos = self.role_permissions_sorted(rol.id);
                if permisos.is_empty() {
                    rows.push(branch);
                    continue;
                }
                for permiso in permisos {
                    rows.push(PermissionTreeRow {
                        permiso_id: Some(permiso.id),
                        permiso_nombre: Some(permiso.nombre.clone()),
                        ..branch.clone()
                    });
                }
            }
        }
        rows
    }
}

fn user_matches(user: &User, filter: &UserFilter) -> bool {
    if user.eliminado {
        return false;
    }
    if let Some(dep) = search_term(&filter.departamento) {
        if !contains_ci(&user.departamento, dep) {
            return false;
        }
    }
    if let Some(activo) = filter.activo {
        if user.activo != activo {
            return false;
        }
    }
    match search_term(&filter.search) {
        Some(term) => [&user.nombre, &user.apellido, &user.correo]
            .iter()
            .any(|field| contains_ci(field, term)),
        None => true,
    }
}

fn system_matches(system: &System, filter: &SystemFilter) -> bool {
    !system.eliminado
        && search_term(&filter.search).map_or(true, |term| {
            contains_ci(&system.nombre, term) || contains_ci(&system.descripcion, term)
        })
}

fn assignment_matches(row: &AssignmentRow, filter: &AssignmentFilter) -> bool {
    if let Some(sistema) = search_term(&filter.sistema) {
        if !contains_ci(&row.sistema_nombre, sistema) {
            return false;
        }
    }
    if let Some(rol) = search_term(&filter.rol) {
        if !contains_ci(&row.rol_nombre, rol) {
            return false;
        }
    }
    match search_term(&filter.search) {
        Some(term) => {
            contains_ci(&row.sistema_nombre, term)
                || contains_ci(&row.rol_nombre, term)
                || row
                    .permiso_nombre
                    .as_deref()
                    .map_or(false, |p| contains_ci(p, term))
        }
        None => true,
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// In-memory RBAC store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self, filter: &UserFilter, page: Page) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let rows: Vec<User> = state
            .users
            .values()
            .filter(|u| user_matches(u, filter))
            .cloned()
            .collect();
        Ok(page.slice(&rows))
    }

    async fn count_users(&self, filter: &UserFilter) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(count(state.users.values().filter(|u| user_matches(u, filter)).count()))
    }

    async fn count_users_by_status(&self, activo: bool) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(count(
            state
                .users
                .values()
                .filter(|u| !u.eliminado && u.activo == activo)
                .count(),
        ))
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.live_user(id).cloned())
    }

    async fn find_user_by_correo(&self, correo: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| !u.eliminado && same_key(&u.correo, correo))
            .cloned())
    }

    async fn correo_taken(&self, correo: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(self.state.read().await.correo_taken(correo, exclude))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        if state.correo_taken(&user.correo, None) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = state.allocate_id();
        state.users.insert(
            id,
            User {
                id,
                nombre: user.nombre,
                apellido: user.apellido,
                departamento: user.departamento,
                correo: user.correo,
                clave: user.clave_hash,
                activo: false,
                eliminado: false,
                usuario_creador: user.usuario_creador,
            },
        );
        Ok(id)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if patch.is_empty() || state.live_user(id).is_none() {
            return Ok(false);
        }
        if let Some(correo) = present(&patch.correo) {
            if state.correo_taken(correo, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(v) = present(&patch.nombre) {
            user.nombre = v.to_string();
        }
        if let Some(v) = present(&patch.apellido) {
            user.apellido = v.to_string();
        }
        if let Some(v) = present(&patch.departamento) {
            user.departamento = v.to_string();
        }
        if let Some(v) = present(&patch.correo) {
            user.correo = v.to_string();
        }
        if let Some(v) = present(&patch.clave_hash) {
            user.clave = v.to_string();
        }
        Ok(true)
    }

    async fn set_user_active(&self, id: i64, activo: bool) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id).filter(|u| !u.eliminado) {
            Some(user) => {
                user.activo = activo;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id).filter(|u| !u.eliminado) {
            Some(user) => {
                user.eliminado = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SystemStore for MemoryStore {
    async fn list_systems(&self, filter: &SystemFilter, page: Page) -> StoreResult<Vec<System>> {
        let state = self.state.read().await;
        let rows: Vec<System> = state
            .systems
            .values()
            .filter(|s| system_matches(s, filter))
            .cloned()
            .collect();
        Ok(page.slice(&rows))
    }

    async fn count_systems(&self, filter: &SystemFilter) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(count(state.systems.values().filter(|s| system_matches(s, filter)).count()))
    }

    async fn get_system(&self, id: i64) -> StoreResult<Option<System>> {
        Ok(self.state.read().await.live_system(id).cloned())
    }

    async fn system_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(self.state.read().await.system_name_taken(nombre, exclude))
    }

    async fn create_system(&self, system: NewSystem) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        if state.system_name_taken(&system.nombre, None) {
            return Err(StoreError::DuplicateName { entity: EntityKind::System });
        }
        let id = state.allocate_id();
        state.systems.insert(
            id,
            System {
                id,
                nombre: system.nombre,
                descripcion: system.descripcion,
                eliminado: false,
            },
        );
        Ok(id)
    }

    async fn update_system(&self, id: i64, patch: SystemPatch) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if patch.is_empty() || state.live_system(id).is_none() {
            return Ok(false);
        }
        if let Some(nombre) = present(&patch.nombre) {
            if state.system_name_taken(nombre, Some(id)) {
                return Err(StoreError::DuplicateName { entity: EntityKind::System });
            }
        }
        let Some(system) = state.systems.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(v) = present(&patch.nombre) {
            system.nombre = v.to_string();
        }
        if let Some(v) = present(&patch.descripcion) {
            system.descripcion = v.to_string();
        }
        Ok(true)
    }

    async fn delete_system(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.systems.get_mut(&id).filter(|s| !s.eliminado) {
            Some(system) => {
                system.eliminado = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn list_roles(&self, filter: &RoleFilter, page: Page) -> StoreResult<Vec<Role>> {
        let state = self.state.read().await;
        let term = search_term(&filter.search);
        let rows: Vec<Role> = state
            .roles
            .values()
            .filter(|r| !r.eliminado && term.map_or(true, |t| contains_ci(&r.nombre, t)))
            .cloned()
            .collect();
        Ok(page.slice(&rows))
    }

    async fn count_roles(&self, filter: &RoleFilter) -> StoreResult<i64> {
        let state = self.state.read().await;
        let term = search_term(&filter.search);
        Ok(count(
            state
                .roles
                .values()
                .filter(|r| !r.eliminado && term.map_or(true, |t| contains_ci(&r.nombre, t)))
                .count(),
        ))
    }

    async fn get_role(&self, id: i64) -> StoreResult<Option<Role>> {
        Ok(self.state.read().await.live_role(id).cloned())
    }

    async fn role_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool> {
        Ok(self.state.read().await.role_name_taken(nombre, exclude))
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        if state.role_name_taken(&role.nombre, None) {
            return Err(StoreError::DuplicateName { entity: EntityKind::Role });
        }
        let id = state.allocate_id();
        state.roles.insert(
            id,
            Role {
                id,
                nombre: role.nombre,
                nivel_jerarquia: role.nivel_jerarquia,
                eliminado: false,
                created_by: role.created_by,
                updated_by: None,
            },
        );
        Ok(id)
    }

    async fn update_role(&self, id: i64, patch: RolePatch) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if patch.is_empty() || state.live_role(id).is_none() {
            return Ok(false);
        }
        if let Some(nombre) = present(&patch.nombre) {
            if state.role_name_taken(nombre, Some(id)) {
                return Err(StoreError::DuplicateName { entity: EntityKind::Role });
            }
        }
        let Some(role) = state.roles.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(v) = present(&patch.nombre) {
            role.nombre = v.to_string();
        }
        if let Some(v) = patch.nivel_jerarquia {
            role.nivel_jerarquia = v;
        }
        if patch.updated_by.is_some() {
            role.updated_by = patch.updated_by;
        }
        Ok(true)
    }

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.roles.get_mut(&id).filter(|r| !r.eliminado) {
            Some(role) => {
                role.eliminado = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        let state = self.state.read().await;
        if state.live_user(user_id).is_none() {
            return Ok(Vec::new());
        }
        let mut seen = BTreeSet::new();
        let mut roles: Vec<Role> = state
            .user_branches(user_id)
            .into_iter()
            .filter(|(_, rol)| seen.insert(rol.id))
            .map(|(_, rol)| rol.clone())
            .collect();
        roles.sort_by(|a, b| a.nombre.cmp(&b.nombre).then(a.id.cmp(&b.id)));
        Ok(roles)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: Page,
    ) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        let term = search_term(&filter.search);
        let rows: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| !p.eliminado && term.map_or(true, |t| contains_ci(&p.nombre, t)))
            .cloned()
            .collect();
        Ok(page.slice(&rows))
    }

    async fn count_permissions(&self, filter: &PermissionFilter) -> StoreResult<i64> {
        let state = self.state.read().await;
        let term = search_term(&filter.search);
        Ok(count(
            state
                .permissions
                .values()
                .filter(|p| !p.eliminado && term.map_or(true, |t| contains_ci(&p.nombre, t)))
                .count(),
        ))
    }

    async fn get_permission(&self, id: i64) -> StoreResult<Option<Permission>> {
        Ok(self.state.read().await.live_permission(id).cloned())
    }

    async fn permission_name_taken(
        &self,
        nombre: &str,
        exclude: Option<i64>,
    ) -> StoreResult<bool> {
        Ok(self.state.read().await.permission_name_taken(nombre, exclude))
    }

    async fn create_permission(&self, permission: NewPermission) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        if state.permission_name_taken(&permission.nombre, None) {
            return Err(StoreError::DuplicateName { entity: EntityKind::Permission });
        }
        let id = state.allocate_id();
        state.permissions.insert(
            id,
            Permission {
                id,
                nombre: permission.nombre,
                eliminado: false,
                created_by: permission.created_by,
                updated_by: None,
            },
        );
        Ok(id)
    }

    async fn update_permission(&self, id: i64, patch: PermissionPatch) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if patch.is_empty() || state.live_permission(id).is_none() {
            return Ok(false);
        }
        let Some(nombre) = present(&patch.nombre).map(str::to_string) else {
            return Ok(false);
        };
        if state.permission_name_taken(&nombre, Some(id)) {
            return Err(StoreError::DuplicateName { entity: EntityKind::Permission });
        }
        let Some(permission) = state.permissions.get_mut(&id) else {
            return Ok(false);
        };
        permission.nombre = nombre;
        if patch.updated_by.is_some() {
            permission.updated_by = patch.updated_by;
        }
        Ok(true)
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.permissions.get_mut(&id).filter(|p| !p.eliminado) {
            Some(permission) => {
                permission.eliminado = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn permissions_of_role(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        if state.live_role(role_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(state
            .role_permissions_sorted(role_id)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn user_role_exists(&self, key: UserSystemRole) -> StoreResult<bool> {
        Ok(self.state.read().await.user_roles.contains(&key))
    }

    async fn assign_user_role(&self, key: UserSystemRole) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.user_roles.insert(key) {
            return Err(StoreError::AssignmentExists);
        }
        Ok(true)
    }

    async fn remove_user_role(&self, key: UserSystemRole) -> StoreResult<bool> {
        Ok(self.state.write().await.user_roles.remove(&key))
    }

    async fn role_permission_exists(&self, key: RolePermission) -> StoreResult<bool> {
        Ok(self.state.read().await.role_permissions.contains(&key))
    }

    async fn assign_role_permission(&self, key: RolePermission) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.role_permissions.insert(key) {
            return Err(StoreError::AssignmentExists);
        }
        Ok(true)
    }

    async fn remove_role_permission(&self, key: RolePermission) -> StoreResult<bool> {
        Ok(self.state.write().await.role_permissions.remove(&key))
    }

    async fn user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
        page: Page,
    ) -> StoreResult<Vec<AssignmentRow>> {
        let state = self.state.read().await;
        let rows: Vec<AssignmentRow> = state
            .assignment_rows(user_id)
            .into_iter()
            .filter(|row| assignment_matches(row, filter))
            .collect();
        Ok(page.slice(&rows))
    }

    async fn count_user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
    ) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(count(
            state
                .assignment_rows(user_id)
                .iter()
                .filter(|row| assignment_matches(row, filter))
                .count(),
        ))
    }
}

impl PermissionTreeSource for MemoryStore {
    fn permission_rows(
        &self,
        user_id: Option<i64>,
    ) -> BoxStream<'_, StoreResult<PermissionTreeRow>> {
        let state = Arc::clone(&self.state);
        stream::once(async move { state.read_owned().await.tree_rows(user_id) })
            .flat_map(|rows| stream::iter(rows.into_iter().map(Ok)))
            .boxed()
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
