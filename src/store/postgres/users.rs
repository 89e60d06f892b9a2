use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{key_taken, map_write_error, push_search, soft_delete, PostgresStore};
use crate::database::models::{present, NewUser, User, UserFilter, UserPatch};
use crate::database::query::{like_pattern, search_term};
use crate::database::Page;
use crate::store::{StoreResult, UserStore};

const USER_COLUMNS: &str =
    "id, nombre, apellido, departamento, correo, clave, activo, eliminado, usuario_creador";

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(dep) = search_term(&filter.departamento) {
        qb.push(" AND departamento ILIKE ").push_bind(like_pattern(dep));
    }
    if let Some(activo) = filter.activo {
        qb.push(" AND activo = ").push_bind(activo);
    }
    if let Some(term) = search_term(&filter.search) {
        push_search(qb, &["nombre", "apellido", "correo"], term);
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn list_users(&self, filter: &UserFilter, page: Page) -> StoreResult<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE NOT eliminado"
        ));
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn count_users(&self, filter: &UserFilter) -> StoreResult<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM usuarios WHERE NOT eliminado");
        push_user_filter(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn count_users_by_status(&self, activo: bool) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM usuarios WHERE NOT eliminado AND activo = $1",
        )
        .bind(activo)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1 AND NOT eliminado");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_correo(&self, correo: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE LOWER(correo) = LOWER($1) AND NOT eliminado"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(correo.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn correo_taken(&self, correo: &str, exclude: Option<i64>) -> StoreResult<bool> {
        key_taken(&self.pool, "usuarios", "correo", correo, exclude).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO usuarios (nombre, apellido, departamento, correo, clave, activo, usuario_creador) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) RETURNING id",
        )
        .bind(user.nombre)
        .bind(user.apellido)
        .bind(user.departamento)
        .bind(user.correo)
        .bind(user.clave_hash)
        .bind(user.usuario_creador)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(id)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE usuarios SET ");
        let mut set = qb.separated(", ");
        let fields = [
            ("nombre = ", &patch.nombre),
            ("apellido = ", &patch.apellido),
            ("departamento = ", &patch.departamento),
            ("correo = ", &patch.correo),
            ("clave = ", &patch.clave_hash),
        ];
        for (column, value) in fields {
            if let Some(v) = present(value) {
                set.push(column).push_bind_unseparated(v.to_string());
            }
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

    async fn set_user_active(&self, id: i64, activo: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE usuarios SET activo = $2, updated_at = NOW() WHERE id = $1 AND NOT eliminado",
        )
        .bind(id)
        .bind(activo)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        soft_delete(&self.pool, "usuarios", id).await
    }
}
