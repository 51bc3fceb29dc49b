pub mod render;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::services::notifier::Mailer;
use crate::services::submission_store::SheetBackend;
pub use routes::{AppState, SESSION_COOKIE};

/// 构建路由
pub fn router<B, M>(state: Arc<AppState<B, M>>) -> Router
where
    B: SheetBackend + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/",
            get(routes::show_form::<B, M>).post(routes::submit_form::<B, M>),
        )
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
