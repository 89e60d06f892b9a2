use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{key_taken, map_write_error, push_search, soft_delete, PostgresStore};
use crate::database::models::{
    present, NewPermission, Permission, PermissionFilter, PermissionPatch,
};
use crate::database::query::search_term;
use crate::database::Page;
use crate::store::{PermissionStore, StoreResult};

const PERMISSION_COLUMNS: &str = "id, nombre, eliminado, created_by, updated_by";

fn push_permission_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PermissionFilter) {
    if let Some(term) = search_term(&filter.search) {
        push_search(qb, &["nombre"], term);
    }
}

#[async_trait]
impl PermissionStore for PostgresStore {
    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: Page,
    ) -> StoreResult<Vec<Permission>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PERMISSION_COLUMNS} FROM permisos WHERE NOT eliminado"
        ));
        push_permission_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        Ok(qb.build_query_as::<Permission>().fetch_all(&self.pool).await?)
    }

    async fn count_permissions(&self, filter: &PermissionFilter) -> StoreResult<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM permisos WHERE NOT eliminado");
        push_permission_filter(&mut qb, filter);
        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }

    async fn get_permission(&self, id: i64) -> StoreResult<Option<Permission>> {
        let sql =
            format!("SELECT {PERMISSION_COLUMNS} FROM permisos WHERE id = $1 AND NOT eliminado");
        Ok(sqlx::query_as::<_, Permission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn permission_name_taken(
        &self,
        nombre: &str,
        exclude: Option<i64>,
    ) -> StoreResult<bool> {
        key_taken(&self.pool, "permisos", "nombre", nombre, exclude).await
    }

    async fn create_permission(&self, permission: NewPermission) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO permisos (nombre, created_by) VALUES ($1, $2) RETURNING id",
        )
        .bind(permission.nombre)
        .bind(permission.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(id)
    }

    async fn update_permission(&self, id: i64, patch: PermissionPatch) -> StoreResult<bool> {
        let Some(nombre) = present(&patch.nombre) else {
            return Ok(false);
        };

        let result = sqlx::query(
            "UPDATE permisos SET nombre = $2, updated_by = COALESCE($3, updated_by), updated_at = NOW() \
             WHERE id = $1 AND NOT eliminado",
        )
        .bind(id)
        .bind(nombre)
        .bind(patch.updated_by)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<bool> {
        soft_delete(&self.pool, "permisos", id).await
    }

    async fn permissions_of_role(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT p.id, p.nombre, p.eliminado, p.created_by, p.updated_by \
             FROM permisos p \
             JOIN rol_permiso rp ON rp.permiso_id = p.id \
             JOIN roles r ON r.id = rp.rol_id AND NOT r.eliminado \
             WHERE rp.rol_id = $1 AND NOT p.eliminado \
             ORDER BY p.nombre, p.id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }
}
