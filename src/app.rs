use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{JwtKeys, PasswordHasher};
use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::Services;
use crate::store::RbacStore;

/// Shared state handed to every handler and to the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub store: Arc<dyn RbacStore>,
    pub jwt: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RbacStore>,
        hasher: Arc<dyn PasswordHasher>,
        jwt: JwtKeys,
        config: AppConfig,
    ) -> Self {
        let services = Services::new(store.clone(), hasher, &config);
        Self {
            services,
            store,
            jwt,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/health", get(public::health))
        // API; everything but token issuance requires a bearer token
        .nest("/api/v1", api_routes(state.clone()));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(system_routes())
        .merge(role_routes())
        .merge(permission_routes())
        .route("/permisos-usuarios", get(protected::trees::all))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
        // Added after the auth layer so it stays public
        .route("/auth/token", post(public::token))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/usuarios", get(users::collection_get).post(users::collection_post))
        .route(
            "/usuarios/:id",
            get(users::record_get)
                .patch(users::record_patch)
                .delete(users::record_delete),
        )
        .route("/usuarios/:id/activo", put(users::record_set_active))
        .route(
            "/usuarios/:id/asignaciones",
            get(users::assignments_get).post(users::assignments_post),
        )
        .route(
            "/usuarios/:id/asignaciones/:sistema_id/:rol_id",
            delete(users::assignments_delete),
        )
        .route("/usuarios/:id/roles", get(users::roles_get))
        .route("/usuarios/:id/permisos", get(protected::trees::one))
}

fn system_routes() -> Router<AppState> {
    use protected::systems;

    Router::new()
        .route(
            "/sistemas",
            get(systems::collection_get).post(systems::collection_post),
        )
        .route(
            "/sistemas/:id",
            get(systems::record_get)
                .patch(systems::record_patch)
                .delete(systems::record_delete),
        )
}

fn role_routes() -> Router<AppState> {
    use protected::roles;

    Router::new()
        .route("/roles", get(roles::collection_get).post(roles::collection_post))
        .route(
            "/roles/:id",
            get(roles::record_get)
                .patch(roles::record_patch)
                .delete(roles::record_delete),
        )
        .route(
            "/roles/:id/permisos",
            get(roles::permissions_get).post(roles::permissions_post),
        )
        .route(
            "/roles/:id/permisos/:permiso_id",
            delete(roles::permissions_delete),
        )
}

fn permission_routes() -> Router<AppState> {
    use protected::permissions;

    Router::new()
        .route(
            "/permisos",
            get(permissions::collection_get).post(permissions::collection_post),
        )
        .route(
            "/permisos/:id",
            get(permissions::record_get)
                .patch(permissions::record_patch)
                .delete(permissions::record_delete),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];

    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any)
}
