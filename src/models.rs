use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the canonical identity record stored in the `users` table.
/// Internal use only: the password hash never leaves the server, so this
/// struct is not part of any response schema (see `UserIdentity`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    // The user's primary login identifier. Unique.
    pub username: String,
    pub phone: String,
    // Unique, enforced by the database.
    pub email: String,
    // Argon2id digest. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    // The RBAC field: 'admin' or 'user'.
    pub role: String,
}

/// ArticleStatus
///
/// The article lifecycle states. Transitions are one-way:
/// `pending -> approved` or `pending -> rejected`, enforced at the
/// repository layer (the review UPDATE is guarded by `status = 'pending'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ArticleStatus {
    Pending,
    Approved,
    Rejected,
}

impl ArticleStatus {
    /// The lowercase form stored in the `articles.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Approved => "approved",
            ArticleStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ArticleStatus::Pending),
            "approved" => Some(ArticleStatus::Approved),
            "rejected" => Some(ArticleStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article
///
/// Represents an article record from the `articles` table. This is the primary
/// data structure for the moderation lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    // FK to users.id (Owner). Set at creation, never mutated.
    pub user_id: Uuid,
    pub title: String,
    // Derived from the title at submission time; not globally unique.
    pub slug: String,
    pub description: String,
    // Relative storage reference (e.g. "uploads/1736951581234-....png").
    // Rewritten to an absolute URL in responses.
    pub image_url: String,
    // 'pending' | 'approved' | 'rejected'. See ArticleStatus.
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Shapes a row for the wire: the stored image reference becomes an
    /// absolute URL under `base_url`, and the creation timestamp is exposed
    /// as a calendar date.
    pub fn into_response(self, base_url: &str) -> ArticleResponse {
        let image_url = format!("{}/{}", base_url.trim_end_matches('/'), self.image_url);
        ArticleResponse {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            image_url,
            status: self.status,
            date_uploaded: self.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

// --- Internal Insert Payloads ---

/// NewUser
///
/// Repository insert payload for registration. Carries the already-hashed
/// password; plaintext never reaches the repository layer.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// NewArticle
///
/// Repository insert payload for submission. The status is not a field here:
/// every new article starts as 'pending' by construction.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image_url: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /api/users/register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    /// Defaults to "user" when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /api/users/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// ReviewRequest
///
/// Input payload for the admin review endpoint. The status is accepted as a
/// raw string so anything outside {approved, rejected} can be rejected with a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReviewRequest {
    pub status: String,
}

// --- Response Schemas (Output) ---

/// UserIdentity
///
/// Output schema for registration: the created identity, without the
/// password hash and without a session token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserIdentity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// LoginResponse
///
/// Output schema for a successful login: the signed session token plus a
/// role-dependent redirect hint for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    // Serialized as "redirectTo" for frontend compatibility.
    #[serde(rename = "redirectTo")]
    pub redirect_to: String,
}

/// ArticleResponse
///
/// Wire representation of an article: absolute image URL and the upload date
/// formatted as YYYY-MM-DD. Built via `Article::into_response`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image_url: String,
    pub status: String,
    pub date_uploaded: String,
}

/// MessageResponse
///
/// Plain acknowledgment body used by submit, review, and logout.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Slug Derivation ---

/// slugify
///
/// Derives a URL-safe lookup key from an article title: ASCII alphanumerics
/// are lowercased, every other run of characters collapses to a single '-',
/// and leading/trailing separators are trimmed.
/// "Hello World!" becomes "hello-world".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}
