use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{key_taken, map_write_error, push_search, soft_delete, PostgresStore};
use crate::database::models::{present, NewSystem, System, SystemFilter, SystemPatch};
use crate::database::query::search_term;
use crate::database::Page;
use crate::store::{StoreResult, SystemStore};

const SYSTEM_COLUMNS: &str = "id, nombre, descripcion, eliminado";

fn push_system_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &SystemFilter) {
    if let Some(term) = search_term(&filter.search) {
        push_search(qb, &["nombre", "descripcion"], term);
    }
}

#[async_trait]
impl SystemStore for PostgresStore {
    async fn list_systems(&self, filter: &SystemFilter, page: Page) -> StoreResult<Vec<System>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SYSTEM_COLUMNS} FROM sistema WHERE NOT eliminado"
        ));
        push_system_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        Ok(qb.build_query_as::<System>().fetch_all(&self.pool).await?)
    }

    async fn count_systems(&self, filter: &SystemFilter) -> StoreResult<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sistema WHERE NOT eliminado");
        push_system_filter(&mut qb, filter);
        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }

    async fn get_system(&self, id: i64) -> StoreResult<Option<System>> {
        let sql = format!("SELECT {SYSTEM_COLUMNS} FROM sistema WHERE id = $1 AND NOT eliminado");
        Ok(sqlx::query_as::<_, System>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn system_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool> {
        key_taken(&self.pool, "sistema", "nombre", nombre, exclude).await
    }

    async fn create_system(&self, system: NewSystem) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sistema (nombre, descripcion) VALUES ($1, $2) RETURNING id",
        )
        .bind(system.nombre)
        .bind(system.descripcion)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(id)
    }

    async fn update_system(&self, id: i64, patch: SystemPatch) -> StoreResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE sistema SET ");
        let mut set = qb.separated(", ");
        if let Some(v) = present(&patch.nombre) {
            set.push("nombre = ").push_bind_unseparated(v.to_string());
        }
        if let Some(v) = present(&patch.descripcion) {
            set.push("descripcion = ").push_bind_unseparated(v.to_string());
        }
        set.push("updated_at = NOW()");
        qb.push(" WHERE id = ").push_bind(id).push(" AND NOT eliminado");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_system(&self, id: i64) -> StoreResult<bool> {
        soft_delete(&self.pool, "sistema", id).await
    }
}
