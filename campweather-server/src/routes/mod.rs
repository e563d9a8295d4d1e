use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub mod auth;
pub mod campsites;
pub mod favourites;
pub mod test_cleanup;
pub mod weather;

/// The full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/campsites", campsites::router())
        .nest("/favourites", favourites::router())
        .nest("/weather", weather::router());

    // Only attach the /test routes when explicitly enabled.
    if state.config.server.allow_test_cleanup {
        app = app.nest("/test", test_cleanup::router());
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
