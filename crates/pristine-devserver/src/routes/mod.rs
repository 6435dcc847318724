//! HTTP routes.

pub mod files;

use axum::{http::Method, Router};
use files::FileRoot;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Every path falls through to the file handler.
pub fn router(root: Arc<FileRoot>) -> Router {
    Router::new()
        .fallback(files::serve)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(root)
}
