use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{map_write_error, PostgresStore};
use crate::database::models::{AssignmentFilter, AssignmentRow, RolePermission, UserSystemRole};
use crate::database::query::{like_pattern, search_term};
use crate::database::Page;
use crate::store::{AssignmentStore, StoreResult};

/// FROM/WHERE shared by the listing and its count. Soft-deleted systems,
/// roles and permissions drop out of the joins.
const ASSIGNMENT_FROM: &str = " FROM usuario_sistema_rol usr \
     JOIN sistema s ON s.id = usr.sistema_id AND NOT s.eliminado \
     JOIN roles r ON r.id = usr.rol_id AND NOT r.eliminado \
     LEFT JOIN (rol_permiso rp JOIN permisos p ON p.id = rp.permiso_id AND NOT p.eliminado) \
          ON rp.rol_id = r.id \
     WHERE usr.usuario_id = ";

fn push_assignment_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AssignmentFilter) {
    if let Some(sistema) = search_term(&filter.sistema) {
        qb.push(" AND s.nombre ILIKE ").push_bind(like_pattern(sistema));
    }
    if let Some(rol) = search_term(&filter.rol) {
        qb.push(" AND r.nombre ILIKE ").push_bind(like_pattern(rol));
    }
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        qb.push(" AND (s.nombre ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.nombre ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.nombre ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl AssignmentStore for PostgresStore {
    async fn user_role_exists(&self, key: UserSystemRole) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM usuario_sistema_rol \
             WHERE usuario_id = $1 AND sistema_id = $2 AND rol_id = $3)",
        )
        .bind(key.usuario_id)
        .bind(key.sistema_id)
        .bind(key.rol_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn assign_user_role(&self, key: UserSystemRole) -> StoreResult<bool> {
        sqlx::query(
            "INSERT INTO usuario_sistema_rol (usuario_id, sistema_id, rol_id) VALUES ($1, $2, $3)",
        )
        .bind(key.usuario_id)
        .bind(key.sistema_id)
        .bind(key.rol_id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(true)
    }

    async fn remove_user_role(&self, key: UserSystemRole) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM usuario_sistema_rol WHERE usuario_id = $1 AND sistema_id = $2 AND rol_id = $3",
        )
        .bind(key.usuario_id)
        .bind(key.sistema_id)
        .bind(key.rol_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_permission_exists(&self, key: RolePermission) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rol_permiso WHERE rol_id = $1 AND permiso_id = $2)",
        )
        .bind(key.rol_id)
        .bind(key.permiso_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn assign_role_permission(&self, key: RolePermission) -> StoreResult<bool> {
        sqlx::query("INSERT INTO rol_permiso (rol_id, permiso_id) VALUES ($1, $2)")
            .bind(key.rol_id)
            .bind(key.permiso_id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(true)
    }

    async fn remove_role_permission(&self, key: RolePermission) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM rol_permiso WHERE rol_id = $1 AND permiso_id = $2")
            .bind(key.rol_id)
            .bind(key.permiso_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
        page: Page,
    ) -> StoreResult<Vec<AssignmentRow>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT s.id AS sistema_id, s.nombre AS sistema_nombre, \
             r.id AS rol_id, r.nombre AS rol_nombre, \
             p.id AS permiso_id, p.nombre AS permiso_nombre",
        );
        qb.push(ASSIGNMENT_FROM).push_bind(user_id);
        push_assignment_filter(&mut qb, filter);
        qb.push(" ORDER BY s.nombre, s.id, r.nombre, r.id, p.nombre, p.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        Ok(qb
            .build_query_as::<AssignmentRow>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_user_assignments(
        &self,
        user_id: i64,
        filter: &AssignmentFilter,
    ) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        qb.push(ASSIGNMENT_FROM).push_bind(user_id);
        push_assignment_filter(&mut qb, filter);
        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }
}
