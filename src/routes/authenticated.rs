use crate::{AppState, handlers, storage::MAX_REQUEST_BYTES};
use axum::{Router, extract::DefaultBodyLimit, routing::post};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer. For this application that is the submission pipeline.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. This guarantees that
/// all handlers receive a validated `AuthUser` struct containing the user's
/// ID and role, which is used to record article ownership.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/articles/submit
        // Multipart submission: title + description + image. The upload
        // policy (extension allow-list, 5 MiB cap) is enforced in the
        // handler; the article is created in 'pending' state.
        .route("/api/articles/submit", post(handlers::submit_article))
        // The default axum body limit (2 MB) is below the 5 MiB upload
        // policy. Raise it so oversized images reach the validator and get a
        // policy 413 instead of being cut off mid-stream.
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}
