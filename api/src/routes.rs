use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Schedule management endpoints
        .route("/schedule", post(handlers::schedules::create_schedule))
        .route("/schedule", get(handlers::schedules::list_schedules))
        .route(
            "/schedule",
            delete(handlers::schedules::delete_all_schedules),
        )
        .route(
            "/schedule/:scheduler_key",
            delete(handlers::schedules::delete_schedule),
        )
        // Ad-hoc email endpoint
        .route("/email/send", post(handlers::emails::send_email))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
