//! `PostgresStore` against a real database.
//!
//! Run with `cargo test --features pg-tests postgres_tests` and `DATABASE_URL`
//! (or `RBAC_TEST_DATABASE_URL`) pointing at a scratch Postgres. Each test
//! migrates its own schema, so tests do not share rows and need no ordering.
//! Without a URL every test returns early.
#![cfg(feature = "pg-tests")]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection};

use super::postgres::PostgresStore;
use super::{
    AssignmentStore, PermissionStore, PermissionTreeSource, RoleStore, StoreError, SystemStore,
    UserStore,
};
use crate::database::models::{
    AssignmentFilter, EntityKind, NewPermission, NewRole, NewSystem, NewUser, RolePermission,
    SystemFilter, UserSystemRole,
};
use crate::database::Page;
use crate::services::aggregator::fold_rows;

static SCHEMA_SEQ: AtomicUsize = AtomicUsize::new(0);

fn pg_url() -> Option<String> {
    std::env::var("RBAC_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// A store over a freshly created and migrated schema.
async fn store() -> Option<PostgresStore> {
    let Some(url) = pg_url() else {
        eprintln!("skipping pg-tests: DATABASE_URL not set");
        return None;
    };

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let schema = format!(
        "rbac_test_{}_{}_{}",
        std::process::id(),
        nanos,
        SCHEMA_SEQ.fetch_add(1, Ordering::SeqCst)
    );

    let mut conn = PgConnection::connect(&url).await.expect("connect");
    sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
        .execute(&mut conn)
        .await
        .expect("create schema");
    conn.close().await.expect("close");

    let options = PgConnectOptions::from_str(&url)
        .expect("database url")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    Some(PostgresStore::new(pool))
}

fn new_user(correo: &str) -> NewUser {
    NewUser {
        nombre: "Ana".into(),
        apellido: "Pérez".into(),
        departamento: "Ventas".into(),
        correo: correo.into(),
        clave_hash: "hash".into(),
        usuario_creador: None,
    }
}

fn new_system(nombre: &str) -> NewSystem {
    NewSystem {
        nombre: nombre.into(),
        descripcion: String::new(),
    }
}

fn new_role(nombre: &str) -> NewRole {
    NewRole {
        nombre: nombre.into(),
        nivel_jerarquia: 1,
        created_by: None,
    }
}

fn new_permission(nombre: &str) -> NewPermission {
    NewPermission {
        nombre: nombre.into(),
        created_by: None,
    }
}

#[tokio::test]
async fn email_is_unique_until_the_holder_is_soft_deleted() {
    let Some(store) = store().await else { return };

    let id = store.create_user(new_user("ana@x.com")).await.unwrap();
    assert!(store.correo_taken("ANA@x.com", None).await.unwrap());
    assert!(!store.correo_taken("ana@x.com", Some(id)).await.unwrap());

    // the insert itself hits usuarios_correo_vigente_key
    let err = store.create_user(new_user("ANA@X.COM")).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail));

    assert!(store.delete_user(id).await.unwrap());
    assert!(!store.delete_user(id).await.unwrap());
    assert!(store.get_user(id).await.unwrap().is_none());

    let again = store.create_user(new_user("ana@x.com")).await.unwrap();
    assert_ne!(again, id);
    let found = store.find_user_by_correo("Ana@X.com").await.unwrap().unwrap();
    assert_eq!(found.id, again);
}

#[tokio::test]
async fn duplicate_names_surface_from_the_partial_indexes() {
    let Some(store) = store().await else { return };

    store.create_system(new_system("ERP")).await.unwrap();
    let err = store.create_system(new_system("erp")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateName {
            entity: EntityKind::System
        }
    ));

    store.create_role(new_role("Admin")).await.unwrap();
    let err = store.create_role(new_role("ADMIN")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateName {
            entity: EntityKind::Role
        }
    ));

    let p = store.create_permission(new_permission("leer")).await.unwrap();
    let err = store
        .create_permission(new_permission("Leer"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateName {
            entity: EntityKind::Permission
        }
    ));

    assert!(store.delete_permission(p).await.unwrap());
    store.create_permission(new_permission("leer")).await.unwrap();
}

#[tokio::test]
async fn duplicate_grants_surface_from_the_primary_keys() {
    let Some(store) = store().await else { return };

    let u = store.create_user(new_user("a@x.com")).await.unwrap();
    let s = store.create_system(new_system("ERP")).await.unwrap();
    let r = store.create_role(new_role("Admin")).await.unwrap();
    let p = store.create_permission(new_permission("leer")).await.unwrap();

    let grant = UserSystemRole {
        usuario_id: u,
        sistema_id: s,
        rol_id: r,
    };
    assert!(store.assign_user_role(grant).await.unwrap());
    assert!(store.user_role_exists(grant).await.unwrap());
    let err = store.assign_user_role(grant).await.unwrap_err();
    assert!(matches!(err, StoreError::AssignmentExists));

    let perm = RolePermission {
        rol_id: r,
        permiso_id: p,
    };
    assert!(store.assign_role_permission(perm).await.unwrap());
    let err = store.assign_role_permission(perm).await.unwrap_err();
    assert!(matches!(err, StoreError::AssignmentExists));

    assert!(store.remove_user_role(grant).await.unwrap());
    assert!(!store.remove_user_role(grant).await.unwrap());
}

#[tokio::test]
async fn permission_tree_collapses_the_join_fan_out() {
    let Some(store) = store().await else { return };

    let u = store.create_user(new_user("a@x.com")).await.unwrap();
    let loner = store.create_user(new_user("solo@x.com")).await.unwrap();
    let a = store.create_system(new_system("A")).await.unwrap();
    let b = store.create_system(new_system("B")).await.unwrap();
    let x = store.create_role(new_role("X")).await.unwrap();
    let y = store.create_role(new_role("Y")).await.unwrap();
    let p1 = store.create_permission(new_permission("P1")).await.unwrap();
    let p2 = store.create_permission(new_permission("P2")).await.unwrap();

    for permiso_id in [p1, p2] {
        store
            .assign_role_permission(RolePermission { rol_id: x, permiso_id })
            .await
            .unwrap();
    }
    for (sistema_id, rol_id) in [(a, x), (b, y)] {
        store
            .assign_user_role(UserSystemRole {
                usuario_id: u,
                sistema_id,
                rol_id,
            })
            .await
            .unwrap();
    }

    let trees = fold_rows(store.permission_rows(Some(u))).await.unwrap();
    assert_eq!(trees.len(), 1);
    let sistemas = &trees[0].sistemas;
    assert_eq!(sistemas.len(), 2);
    assert_eq!(sistemas[0].nombre, "A");
    assert_eq!(sistemas[0].roles.len(), 1);
    let names: Vec<&str> = sistemas[0].roles[0]
        .permisos
        .iter()
        .map(|p| p.nombre.as_str())
        .collect();
    assert_eq!(names, vec!["P1", "P2"]);
    assert_eq!(sistemas[1].nombre, "B");
    assert_eq!(sistemas[1].roles[0].nombre, "Y");
    assert!(sistemas[1].roles[0].permisos.is_empty());

    let everyone = fold_rows(store.permission_rows(None)).await.unwrap();
    assert_eq!(everyone.len(), 2);
    assert_eq!(everyone[1].id, crate::codec::encode(loner));
    assert!(everyone[1].sistemas.is_empty());

    // soft-deleting a system hides its branch but keeps the grant row
    assert!(store.delete_system(b).await.unwrap());
    let trees = fold_rows(store.permission_rows(Some(u))).await.unwrap();
    assert_eq!(trees[0].sistemas.len(), 1);
    assert!(store
        .user_role_exists(UserSystemRole {
            usuario_id: u,
            sistema_id: b,
            rol_id: y,
        })
        .await
        .unwrap());
}

#[tokio::test]
async fn assignment_rows_are_sorted_and_filtered() {
    let Some(store) = store().await else { return };

    let u = store.create_user(new_user("a@x.com")).await.unwrap();
    let ventas = store.create_system(new_system("Ventas")).await.unwrap();
    let compras = store.create_system(new_system("Compras")).await.unwrap();
    let admin = store.create_role(new_role("Admin")).await.unwrap();
    let leer = store.create_permission(new_permission("leer")).await.unwrap();
    let escribir = store
        .create_permission(new_permission("escribir"))
        .await
        .unwrap();

    for permiso_id in [leer, escribir] {
        store
            .assign_role_permission(RolePermission {
                rol_id: admin,
                permiso_id,
            })
            .await
            .unwrap();
    }
    for sistema_id in [ventas, compras] {
        store
            .assign_user_role(UserSystemRole {
                usuario_id: u,
                sistema_id,
                rol_id: admin,
            })
            .await
            .unwrap();
    }

    let all = AssignmentFilter::default();
    let rows = store
        .user_assignments(u, &all, Page::all())
        .await
        .unwrap();
    let order: Vec<(String, Option<String>)> = rows
        .iter()
        .map(|r| (r.sistema_nombre.clone(), r.permiso_nombre.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Compras".to_string(), Some("escribir".to_string())),
            ("Compras".to_string(), Some("leer".to_string())),
            ("Ventas".to_string(), Some("escribir".to_string())),
            ("Ventas".to_string(), Some("leer".to_string())),
        ]
    );

    let by_system = AssignmentFilter {
        sistema: Some("vent".into()),
        ..Default::default()
    };
    assert_eq!(store.count_user_assignments(u, &all).await.unwrap(), 4);
    assert_eq!(store.count_user_assignments(u, &by_system).await.unwrap(), 2);
}

#[tokio::test]
async fn pages_partition_five_rows() {
    let Some(store) = store().await else { return };

    for nombre in ["S1", "S2", "S3", "S4", "S5"] {
        store.create_system(new_system(nombre)).await.unwrap();
    }
    let filter = SystemFilter::default();
    assert_eq!(store.count_systems(&filter).await.unwrap(), 5);

    let mut seen = Vec::new();
    for (offset, expected) in [(0, 2), (2, 2), (4, 1), (6, 0)] {
        let page = Page::new(2, offset, 100).unwrap();
        let systems = store.list_systems(&filter, page).await.unwrap();
        assert_eq!(systems.len(), expected, "offset {}", offset);
        seen.extend(systems.into_iter().map(|s| s.nombre));
    }
    assert_eq!(seen, vec!["S1", "S2", "S3", "S4", "S5"]);
}
