mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn create_then_read_back_without_password() {
    let app = TestApp::new();
    let id = app.create_user("ana@x.com").await;

    let (status, body) = app.get(&format!("/api/v1/usuarios/{}", id), &app.reader()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["correo"], "ana@x.com");
    assert_eq!(body["activo"], false);
    assert!(body.get("clave").is_none());
}

#[tokio::test]
async fn list_returns_datatable_shape_with_status_totals() {
    let app = TestApp::new();
    let first = app.create_user("a@x.com").await;
    app.create_user("b@x.com").await;
    app.create_user("c@x.com").await;

    let (status, _) = app
        .put(
            &format!("/api/v1/usuarios/{}/activo", first),
            &app.admin(),
            json!({ "activo": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get("/api/v1/usuarios?draw=7&limit=2&offset=0", &app.reader())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draw"], 7);
    assert_eq!(body["recordsTotal"], 3);
    assert_eq!(body["recordsFiltered"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["totalActivos"], 1);
    assert_eq!(body["totalInactivos"], 2);

    let (_, body) = app
        .get("/api/v1/usuarios?activo=true", &app.reader())
        .await;
    assert_eq!(body["recordsFiltered"], 1);
    assert_eq!(body["data"][0]["id"], first.as_str());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_until_the_holder_is_deleted() {
    let app = TestApp::new();
    let id = app.create_user("dup@x.com").await;

    let body = json!({
        "nombre": "Otra",
        "apellido": "Persona",
        "departamento": "TI",
        "correo": "dup@x.com",
        "clave": "secreto1",
    });
    let (status, err) = app.post("/api/v1/usuarios", &app.admin(), body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "CONFLICT");

    let (status, res) = app.delete(&format!("/api/v1/usuarios/{}", id), &app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["success"], true);

    let (status, _) = app.post("/api/v1/usuarios", &app.admin(), body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/v1/usuarios",
            &app.admin(),
            json!({
                "nombre": "Ana",
                "apellido": "Pérez",
                "departamento": "Ventas",
                "correo": "not-an-email",
                "clave": "secreto1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"].get("correo").is_some());

    let (status, body) = app
        .post("/api/v1/usuarios", &app.admin(), json!({ "nombre": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"].get("apellido").is_some());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/v1/usuarios", &app.admin(), json!(["not", "an", "object"]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
}

#[tokio::test]
async fn bad_identifiers_are_400_and_unknown_ones_404() {
    let app = TestApp::new();

    // "not-a-number" encoded
    let (status, body) = app.get("/api/v1/usuarios/bm90LWEtbnVtYmVy", &app.reader()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // "999" encoded
    let (status, _) = app.get("/api/v1/usuarios/OTk5", &app.reader()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_reports_whether_anything_changed() {
    let app = TestApp::new();
    let id = app.create_user("p@x.com").await;
    let uri = format!("/api/v1/usuarios/{}", id);

    let (status, body) = app
        .patch(&uri, &app.admin(), json!({ "nombre": "Ana", "apellido": "" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (_, body) = app
        .patch(&uri, &app.admin(), json!({ "departamento": "Compras" }))
        .await;
    assert_eq!(body["success"], true);

    let (_, user) = app.get(&uri, &app.reader()).await;
    assert_eq!(user["departamento"], "Compras");
    assert_eq!(user["apellido"], "Pérez");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = TestApp::new();
    let id = app.create_user("gone@x.com").await;
    let uri = format!("/api/v1/usuarios/{}", id);

    let (_, first) = app.delete(&uri, &app.admin()).await;
    let (_, second) = app.delete(&uri, &app.admin()).await;
    assert_eq!(first["success"], true);
    assert_eq!(second["success"], false);

    let (status, _) = app.get(&uri, &app.reader()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_scope_cannot_write() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/v1/usuarios",
            &app.reader(),
            json!({
                "nombre": "Ana",
                "apellido": "Pérez",
                "departamento": "Ventas",
                "correo": "r@x.com",
                "clave": "secreto1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn inactive_users_cannot_obtain_a_token() {
    let app = TestApp::new();
    app.create_user("nueva@x.com").await;

    let (status, body) = app.login("nueva@x.com", "secreto1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_rejected_alike() {
    let app = TestApp::new();
    let id = app.create_user("ana@x.com").await;
    app.put(
        &format!("/api/v1/usuarios/{}/activo", id),
        &app.admin(),
        json!({ "activo": true }),
    )
    .await;

    let (status, wrong) = app.login("ana@x.com", "otra-clave").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = app.login("nadie@x.com", "secreto1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["message"], unknown["message"]);
}

#[tokio::test]
async fn issued_token_reads_only_its_own_tree() {
    let app = TestApp::new();
    let id = app.create_user("ana@x.com").await;
    let other = app.create_user("otro@x.com").await;
    app.put(
        &format!("/api/v1/usuarios/{}/activo", id),
        &app.admin(),
        json!({ "activo": true }),
    )
    .await;

    // legacy field names are accepted too
    let (status, body) = app
        .send(
            axum::http::Method::POST,
            "/api/v1/auth/token",
            None,
            Some(json!({ "username": "ANA@x.com", "password": "secreto1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, tree) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["id"], id.as_str());

    let (status, _) = app
        .get(&format!("/api/v1/usuarios/{}/permisos", other), &token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/usuarios", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_flag_lists_users_without_the_table_wrapper() {
    let app = TestApp::new();
    app.create_user("a@x.com").await;
    app.create_user("b@x.com").await;

    let (status, body) = app
        .get("/api/v1/usuarios?all=true&activo=true", &app.reader())
        .await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().expect("bare array");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("clave").is_none()));
    assert!(body.get("totalActivos").is_none());
}
