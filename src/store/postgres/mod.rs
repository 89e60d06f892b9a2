//! Postgres implementation of the RBAC store.
//!
//! Queries are checked at runtime (`sqlx::query_as` / `QueryBuilder`) so the
//! crate builds without a live database. The schema lives in `migrations/`.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{PermissionTreeSource, StoreError, StoreHealth, StoreResult};
use crate::database::models::{EntityKind, PermissionTreeRow};
use crate::database::query::like_pattern;

mod assignments;
mod permissions;
mod roles;
mod systems;
mod users;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PERMISSION_TREE_SQL: &str = r#"
SELECT u.id AS usuario_id, u.nombre, u.apellido, u.departamento, u.correo, u.activo,
       s.id AS sistema_id, s.nombre AS sistema_nombre,
       r.id AS rol_id, r.nombre AS rol_nombre, r.nivel_jerarquia,
       p.id AS permiso_id, p.nombre AS permiso_nombre
FROM usuarios u
LEFT JOIN (usuario_sistema_rol usr
           JOIN sistema s ON s.id = usr.sistema_id AND NOT s.eliminado
           JOIN roles r ON r.id = usr.rol_id AND NOT r.eliminado)
       ON usr.usuario_id = u.id
LEFT JOIN (rol_permiso rp
           JOIN permisos p ON p.id = rp.permiso_id AND NOT p.eliminado)
       ON rp.rol_id = r.id
WHERE NOT u.eliminado AND ($1::BIGINT IS NULL OR u.id = $1)
ORDER BY u.id, s.nombre, s.id, r.nombre, r.id, p.nombre, p.id
"#;

impl PermissionTreeSource for PostgresStore {
    fn permission_rows(
        &self,
        user_id: Option<i64>,
    ) -> BoxStream<'_, StoreResult<PermissionTreeRow>> {
        sqlx::query_as::<_, PermissionTreeRow>(PERMISSION_TREE_SQL)
            .bind(user_id)
            .fetch(&self.pool)
            .map_err(StoreError::from)
            .boxed()
    }
}

#[async_trait]
impl StoreHealth for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Map a unique violation (SQLSTATE 23505) onto the domain error for the
/// constraint that fired. Anything else stays a database error.
pub(crate) fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            if let Some(mapped) = db_err.constraint().and_then(constraint_error) {
                return mapped;
            }
        }
    }
    StoreError::Database(err)
}

fn constraint_error(constraint: &str) -> Option<StoreError> {
    match constraint {
        "usuarios_correo_vigente_key" => Some(StoreError::DuplicateEmail),
        "sistema_nombre_vigente_key" => Some(StoreError::DuplicateName { entity: EntityKind::System }),
        "roles_nombre_vigente_key" => Some(StoreError::DuplicateName { entity: EntityKind::Role }),
        "permisos_nombre_vigente_key" => {
            Some(StoreError::DuplicateName { entity: EntityKind::Permission })
        }
        "usuario_sistema_rol_pkey" | "rol_permiso_pkey" => Some(StoreError::AssignmentExists),
        _ => None,
    }
}

/// Append `AND (col1 ILIKE $n OR col2 ILIKE $n ...)` for a free-text term.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], term: &str) {
    let pattern = like_pattern(term);
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    qb.push(")");
}

/// Shared `SELECT EXISTS(...)` for the name/email uniqueness pre-checks.
pub(crate) async fn key_taken(
    pool: &PgPool,
    table: &str,
    column: &str,
    value: &str,
    exclude: Option<i64>,
) -> StoreResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE NOT eliminado \
         AND LOWER({column}) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2))"
    );
    let taken: bool = sqlx::query_scalar(&sql)
        .bind(value.trim())
        .bind(exclude)
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

/// Shared soft delete: flips `eliminado` on a live row.
pub(crate) async fn soft_delete(pool: &PgPool, table: &str, id: i64) -> StoreResult<bool> {
    let sql = format!(
        "UPDATE {table} SET eliminado = TRUE, updated_at = NOW() WHERE id = $1 AND NOT eliminado"
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_constraints() {
        assert!(matches!(
            constraint_error("usuarios_correo_vigente_key"),
            Some(StoreError::DuplicateEmail)
        ));
        assert!(matches!(
            constraint_error("roles_nombre_vigente_key"),
            Some(StoreError::DuplicateName { entity: EntityKind::Role })
        ));
        assert!(matches!(
            constraint_error("rol_permiso_pkey"),
            Some(StoreError::AssignmentExists)
        ));
        assert!(constraint_error("some_other_key").is_none());
    }

    #[test]
    fn builds_multi_column_search() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM sistema WHERE NOT eliminado");
        push_search(&mut qb, &["nombre", "descripcion"], "erp");
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM sistema WHERE NOT eliminado AND (nombre ILIKE $1 OR descripcion ILIKE $2)"
        );
    }
}
