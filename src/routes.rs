// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, tenancy::tenant_guard},
};

/// Monta o router completo da API.
pub fn build_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_my_tenants),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Tudo que precisa de empresa: tenant_guard roda depois do auth_guard
    // (a última camada adicionada é a primeira a executar)
    let tenant_routes = Router::new()
        .route(
            "/employees",
            post(handlers::employees::create_employee).get(handlers::employees::list_employees),
        )
        .route("/employees/{employee_id}/biometrics", post(handlers::employees::enroll_biometric))
        .route("/employees/{employee_id}/records", get(handlers::employees::list_employee_records))
        .route(
            "/items",
            post(handlers::items::create_item).get(handlers::items::list_items),
        )
        .route(
            "/terms",
            post(handlers::terms::create_term_template).get(handlers::terms::list_term_templates),
        )
        .route("/terms/sign", post(handlers::terms::sign_term))
        .route("/terms/signatures/{signature_id}/pdf", get(handlers::documents::signed_term_pdf))
        .route("/verify/badge", post(handlers::verification::verify_badge))
        .route("/verify/biometric", post(handlers::verification::verify_biometric))
        .route("/flows/records", post(handlers::flows::persist_record))
        .route("/flows/run", post(handlers::flows::run_flow))
        .route("/notifications", post(handlers::notifications::notify))
        .route("/notifications/vencimentos/scan", post(handlers::notifications::scan_vencimentos))
        .route("/qr/{kind}/{id}", get(handlers::documents::qr_code_png))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api", tenant_routes)
        .with_state(app_state)
}
