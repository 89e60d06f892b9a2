mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use rbac_admin_api::auth::Scope;

struct Fixture {
    user: String,
    ventas: String,
    compras: String,
    admin_role: String,
    viewer_role: String,
    leer: String,
    escribir: String,
}

/// user → (Ventas, Admin{leer, escribir}), (Compras, Viewer{leer})
async fn fixture(app: &TestApp) -> Fixture {
    let user = app.create_user("ana@x.com").await;
    let ventas = app.create_system("Ventas").await;
    let compras = app.create_system("Compras").await;
    let admin_role = app.create_role("Admin", 1).await;
    let viewer_role = app.create_role("Viewer", 2).await;
    let leer = app.create_permission("leer").await;
    let escribir = app.create_permission("escribir").await;

    for (rol, permiso) in [(&admin_role, &leer), (&admin_role, &escribir), (&viewer_role, &leer)] {
        let (status, body) = app
            .post(
                &format!("/api/v1/roles/{}/permisos", rol),
                &app.admin(),
                json!({ "permiso_id": permiso }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }
    for (sistema, rol) in [(&ventas, &admin_role), (&compras, &viewer_role)] {
        let (status, body) = app
            .post(
                &format!("/api/v1/usuarios/{}/asignaciones", user),
                &app.admin(),
                json!({ "sistema_id": sistema, "rol_id": rol }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    Fixture {
        user,
        ventas,
        compras,
        admin_role,
        viewer_role,
        leer,
        escribir,
    }
}

fn names(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["nombre"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn granting_twice_is_a_conflict() {
    let app = TestApp::new();
    let f = fixture(&app).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/usuarios/{}/asignaciones", f.user),
            &app.admin(),
            json!({ "sistema_id": f.ventas, "rol_id": f.admin_role }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app
        .post(
            &format!("/api/v1/roles/{}/permisos", f.admin_role),
            &app.admin(),
            json!({ "permiso_id": f.leer }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn granting_to_a_missing_entity_is_not_found() {
    let app = TestApp::new();
    let f = fixture(&app).await;

    // "999" encoded
    let (status, _) = app
        .post(
            &format!("/api/v1/usuarios/{}/asignaciones", f.user),
            &app.admin(),
            json!({ "sistema_id": "OTk5", "rol_id": f.admin_role }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            &format!("/api/v1/usuarios/{}/asignaciones", f.user),
            &app.admin(),
            json!({ "sistema_id": "???", "rol_id": f.admin_role }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assignment_listing_is_sorted_and_filterable() {
    let app = TestApp::new();
    let f = fixture(&app).await;
    let uri = format!("/api/v1/usuarios/{}/asignaciones", f.user);

    let (status, body) = app.get(&format!("{}?draw=1", uri), &app.reader()).await;
    assert_eq!(status, StatusCode::OK);
    // Compras/Viewer/leer, Ventas/Admin/escribir, Ventas/Admin/leer
    assert_eq!(body["recordsTotal"], 3);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows[0]["sistema_nombre"], "Compras");
    assert_eq!(rows[1]["permiso_nombre"], "escribir");
    assert_eq!(rows[2]["permiso_nombre"], "leer");

    let (_, body) = app
        .get(&format!("{}?sistema=ventas", uri), &app.reader())
        .await;
    assert_eq!(body["recordsTotal"], 3);
    assert_eq!(body["recordsFiltered"], 2);

    let (_, body) = app
        .get(&format!("{}?limit=1&offset=1", uri), &app.reader())
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["sistema_id"], f.ventas.as_str());
}

#[tokio::test]
async fn removing_a_grant_is_exact_and_reports_absence() {
    let app = TestApp::new();
    let f = fixture(&app).await;
    let uri = format!(
        "/api/v1/usuarios/{}/asignaciones/{}/{}",
        f.user, f.ventas, f.admin_role
    );

    let (_, body) = app.delete(&uri, &app.admin()).await;
    assert_eq!(body["success"], true);
    let (_, body) = app.delete(&uri, &app.admin()).await;
    assert_eq!(body["success"], false);

    let (_, roles) = app
        .get(&format!("/api/v1/usuarios/{}/roles", f.user), &app.reader())
        .await;
    assert_eq!(names(&roles), vec!["Viewer"]);
}

#[tokio::test]
async fn role_permissions_are_listed_and_revoked() {
    let app = TestApp::new();
    let f = fixture(&app).await;

    let (_, perms) = app
        .get(&format!("/api/v1/roles/{}/permisos", f.admin_role), &app.reader())
        .await;
    assert_eq!(names(&perms), vec!["escribir", "leer"]);

    let (_, body) = app
        .delete(
            &format!("/api/v1/roles/{}/permisos/{}", f.admin_role, f.escribir),
            &app.admin(),
        )
        .await;
    assert_eq!(body["success"], true);

    let (_, perms) = app
        .get(&format!("/api/v1/roles/{}/permisos", f.admin_role), &app.reader())
        .await;
    assert_eq!(names(&perms), vec!["leer"]);
}

#[tokio::test]
async fn permission_tree_reflects_every_grant() {
    let app = TestApp::new();
    let f = fixture(&app).await;

    let (status, tree) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", f.user), &app.reader())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["id"], f.user.as_str());

    let sistemas = tree["sistemas"].as_array().unwrap();
    assert_eq!(sistemas.len(), 2);
    let ventas = sistemas
        .iter()
        .find(|s| s["id"] == f.ventas.as_str())
        .unwrap();
    assert_eq!(ventas["roles"][0]["id"], f.admin_role.as_str());
    let mut perms = names(&ventas["roles"][0]["permisos"]);
    perms.sort();
    assert_eq!(perms, vec!["escribir", "leer"]);

    let compras = sistemas
        .iter()
        .find(|s| s["id"] == f.compras.as_str())
        .unwrap();
    assert_eq!(compras["roles"][0]["id"], f.viewer_role.as_str());
    assert_eq!(names(&compras["roles"][0]["permisos"]), vec!["leer"]);
}

#[tokio::test]
async fn all_trees_include_users_without_grants() {
    let app = TestApp::new();
    let f = fixture(&app).await;
    let loner = app.create_user("solo@x.com").await;

    let (status, trees) = app.get("/api/v1/permisos-usuarios", &app.reader()).await;
    assert_eq!(status, StatusCode::OK);
    let trees = trees.as_array().unwrap();
    assert_eq!(trees.len(), 2);
    assert!(trees.iter().any(|t| t["id"] == f.user.as_str()));
    let solo = trees.iter().find(|t| t["id"] == loner.as_str()).unwrap();
    assert!(solo["sistemas"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleted_system_disappears_from_the_tree() {
    let app = TestApp::new();
    let f = fixture(&app).await;

    app.delete(&format!("/api/v1/sistemas/{}", f.compras), &app.admin())
        .await;

    let (_, tree) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", f.user), &app.reader())
        .await;
    let sistemas = tree["sistemas"].as_array().unwrap();
    assert_eq!(sistemas.len(), 1);
    assert_eq!(sistemas[0]["id"], f.ventas.as_str());
}

#[tokio::test]
async fn self_scope_reads_only_its_own_tree() {
    let app = TestApp::new();
    let f = fixture(&app).await;
    let other = app.create_user("otro@x.com").await;
    let own = app.token(&f.user, Scope::SelfOnly);

    let (status, _) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", f.user), &own)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", other), &own)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/permisos-usuarios", &own).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/v1/usuarios/{}", f.user), &own)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn creator_is_recorded_when_the_caller_is_a_user() {
    let app = TestApp::new();
    let f = fixture(&app).await;
    let as_user = app.token(&f.user, Scope::Admin);

    let (status, body) = app
        .post(
            "/api/v1/roles",
            &as_user,
            json!({ "nombre": "Auditor", "nivel_jerarquia": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, role) = app
        .get(&format!("/api/v1/roles/{}", body["id"].as_str().unwrap()), &app.reader())
        .await;
    assert_eq!(role["created_by"], f.user.as_str());

    // service tokens record nothing
    let (_, admin_role) = app
        .get(&format!("/api/v1/roles/{}", f.admin_role), &app.reader())
        .await;
    assert!(admin_role.get("created_by").is_none());
}
