// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam, health, questions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exam, questions, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (services and config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected identity route
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(auth_layer.clone()),
        );

    let user_routes = Router::new()
        .route("/exams", get(exam::list_available))
        .route("/exam/start/{exam_config_id}", post(exam::start))
        .route("/exam/session/{session_id}", get(exam::get_session))
        .route("/exam/question/{session_id}/{index}", get(exam::get_question))
        .route("/exam/answer/{session_id}", post(exam::submit_answer))
        .route("/exam/submit/{session_id}", post(exam::submit))
        .route("/results/{session_id}", get(exam::get_result))
        .route("/results/{session_id}/detailed", get(exam::get_detailed_result))
        .route("/history", get(exam::history))
        .route(
            "/questions",
            get(questions::list_visible).post(questions::create),
        )
        .route("/questions/{id}", delete(questions::delete))
        .route("/questions/{id}/share", post(questions::share))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/questions/{id}", delete(admin::delete_question))
        .route("/upload/csv", post(admin::upload_csv))
        .route("/upload/csv/preview", post(admin::preview_csv))
        .route("/upload/pdf", post(admin::upload_pdf))
        .route("/exams", get(admin::list_exams).post(admin::create_exam))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .route("/api/", get(health::root))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", user_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
