use super::{handlers, state::AppState, uploads::UPLOADS_ROUTE};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.uploads.max_body_bytes;

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/generate",
            post(handlers::generate_handler).layer(DefaultBodyLimit::max(body_limit)),
        );

    // Hosted images only exist for by-reference encoding.
    if let Some(dir) = &app_state.upload_dir {
        router = router.nest_service(UPLOADS_ROUTE, ServeDir::new(dir));
    }

    router
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
