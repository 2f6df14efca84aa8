use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in). These routes handle the identity gateway
/// (register/login/logout) and read-only access to published content.
///
/// Security Mandate:
/// All article retrieval handlers in this module must enforce
/// `status = 'approved'` at the Repository level. This prevents anonymous
/// viewing of articles pending review or rejected by an admin.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /api/users/register
        // Creates a new account. The password is hashed before persistence;
        // duplicate username/email is rejected by the database constraints.
        .route("/api/users/register", post(handlers::register_user))
        // POST /api/users/login
        // Verifies credentials and issues a 1-hour session token plus a
        // role-dependent redirect hint.
        .route("/api/users/login", post(handlers::login_user))
        // POST /api/users/logout
        // Stateless acknowledgment; self-contained tokens expire on their own.
        .route("/api/users/logout", post(handlers::logout_user))
        // GET /api/articles/approved
        // The published feed. Approved articles only, absolute image URLs.
        .route("/api/articles/approved", get(handlers::get_approved_articles))
        // GET /api/articles/slug/{slug}
        // Single-article lookup. Requires `status = 'approved'` in the query
        // before data release.
        .route("/api/articles/slug/{slug}", get(handlers::get_article_by_slug))
}
