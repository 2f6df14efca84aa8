use crate::models::{Article, ArticleStatus, NewArticle, NewUser, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the
/// core of the Repository Abstraction pattern, allowing the handlers to
/// interact with the data layer without knowing the specific implementation
/// (Postgres, Mock, etc.).
///
/// Every method returns `Result<_, sqlx::Error>`: datastore failures
/// propagate to the caller (where they map onto the error taxonomy) instead
/// of being swallowed here. No operation retries internally.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's async task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Insert fails with a unique violation when username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    // --- Articles ---
    // Every insert starts the lifecycle at 'pending'.
    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error>;
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error>;
    // State-filtered listing, newest first.
    async fn get_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, sqlx::Error>;
    // Applies a review transition. Guarded by `status = 'pending'`: returns
    // None when the article does not exist OR has already been decided; the
    // caller distinguishes the two with `get_article`.
    async fn set_article_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<Option<Article>, sqlx::Error>;
    // Public slug lookup. Approved articles only; on slug collision the most
    // recently created one wins.
    async fn get_approved_by_slug(&self, slug: &str) -> Result<Option<Article>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database through an injected connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, phone, email, password_hash, role";
const ARTICLE_COLUMNS: &str = "id, user_id, title, slug, description, image_url, status, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Inserts a new user row. Uniqueness of username/email is enforced by
    /// the database constraints; a violation surfaces as a database error
    /// the caller maps to a conflict.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, username, phone, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.phone)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
    }

    /// get_user
    ///
    /// Retrieves a user by id. Used by the local development auth bypass.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// get_user_by_username
    ///
    /// Login lookup. Returns the full row including the password hash for
    /// in-process verification.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_article
    ///
    /// Inserts a new article. All new articles enter the lifecycle as
    /// 'pending', requiring administrative review before public visibility.
    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error> {
        let query = format!(
            "INSERT INTO articles (id, user_id, title, slug, description, image_url, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW()) RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(Uuid::new_v4())
            .bind(article.user_id)
            .bind(&article.title)
            .bind(&article.slug)
            .bind(&article.description)
            .bind(&article.image_url)
            .fetch_one(&self.pool)
            .await
    }

    /// get_article
    ///
    /// Retrieval by id with no visibility filter. Used after a failed review
    /// update to tell "absent" apart from "already decided".
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// get_articles_by_status
    ///
    /// Lists all articles in one lifecycle state, newest first. The status
    /// filter is applied here, in the query, so no caller can accidentally
    /// widen a public view.
    async fn get_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE status = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
    }

    /// set_article_status
    ///
    /// Applies a review decision. The `status = 'pending'` guard makes the
    /// transition one-way at the datastore level: a second review of the same
    /// article affects zero rows no matter how requests interleave.
    async fn set_article_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<Option<Article>, sqlx::Error> {
        let query = format!(
            "UPDATE articles SET status = $1 WHERE id = $2 AND status = 'pending' \
             RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// get_approved_by_slug
    ///
    /// Public detail lookup. Only approved articles are visible through this
    /// path; under slug collision the newest approved article is returned.
    async fn get_approved_by_slug(&self, slug: &str) -> Result<Option<Article>, sqlx::Error> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE slug = $1 AND status = 'approved' \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }
}
