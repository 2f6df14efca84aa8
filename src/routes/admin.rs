use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role:
/// the moderation queue and the review decision endpoint.
///
/// Access Control:
/// This entire router is wrapped in the authentication middleware layer in
/// `create_router`; the `role = 'admin'` permission is then explicitly
/// checked inside each handler before any repository call. This two-step
/// arrangement keeps authentication and authorization separately testable.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/articles/pending
        // The moderation queue: every article awaiting review.
        .route("/api/articles/pending", get(handlers::get_pending_articles))
        // POST /api/articles/review/{article_id}
        // Applies an 'approved' or 'rejected' decision to a pending article.
        // Decided articles cannot be re-reviewed.
        .route(
            "/api/articles/review/{article_id}",
            post(handlers::review_article),
        )
        // GET /api/articles/rejected
        // Rejected submissions, visible to moderators only.
        .route(
            "/api/articles/rejected",
            get(handlers::get_rejected_articles),
        )
}
