use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{key_taken, map_write_error, push_search, soft_delete, PostgresStore};
use crate::database::models::{present, NewRole, Role, RoleFilter, RolePatch};
use crate::database::query::search_term;
use crate::database::Page;
use crate::store::{RoleStore, StoreResult};

const ROLE_COLUMNS: &str = "id, nombre, nivel_jerarquia, eliminado, created_by, updated_by";

fn push_role_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    if let Some(term) = search_term(&filter.search) {
        push_search(qb, &["nombre"], term);
    }
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn list_roles(&self, filter: &RoleFilter, page: Page) -> StoreResult<Vec<Role>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE NOT eliminado"
        ));
        push_role_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        Ok(qb.build_query_as::<Role>().fetch_all(&self.pool).await?)
    }

    async fn count_roles(&self, filter: &RoleFilter) -> StoreResult<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles WHERE NOT eliminado");
        push_role_filter(&mut qb, filter);
        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }

    async fn get_role(&self, id: i64) -> StoreResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND NOT eliminado");
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn role_name_taken(&self, nombre: &str, exclude: Option<i64>) -> StoreResult<bool> {
        key_taken(&self.pool, "roles", "nombre", nombre, exclude).await
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO roles (nombre, nivel_jerarquia, created_by) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(role.nombre)
        .bind(role.nivel_jerarquia)
        .bind(role.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(id)
    }

    async fn update_role(&self, id: i64, patch: RolePatch) -> StoreResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE roles SET ");
        let mut set = qb.separated(", ");
        if let Some(v) = present(&patch.nombre) {
            set.push("nombre = ").push_bind_unseparated(v.to_string());
        }
        if let Some(v) = patch.nivel_jerarquia {
            set.push("nivel_jerarquia = ").push_bind_unseparated(v);
        }
        if let Some(v) = patch.updated_by {
            set.push("updated_by = ").push_bind_unseparated(v);
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

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        soft_delete(&self.pool, "roles", id).await
    }

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT DISTINCT r.id, r.nombre, r.nivel_jerarquia, r.eliminado, r.created_by, r.updated_by \
             FROM roles r \
             JOIN usuario_sistema_rol usr ON usr.rol_id = r.id \
             JOIN sistema s ON s.id = usr.sistema_id AND NOT s.eliminado \
             JOIN usuarios u ON u.id = usr.usuario_id AND NOT u.eliminado \
             WHERE usr.usuario_id = $1 AND NOT r.eliminado \
             ORDER BY r.nombre, r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}
