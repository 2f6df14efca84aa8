use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    models::{
        Article, ArticleResponse, ArticleStatus, LoginRequest, LoginResponse, MessageResponse,
        NewArticle, NewUser, RegisterRequest, ReviewRequest, UserIdentity, slugify,
    },
    storage::{storage_name, validate_upload},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Role string granted to registrations that do not ask for one.
const DEFAULT_ROLE: &str = "user";

fn shape_articles(articles: Vec<Article>, base_url: &str) -> Vec<ArticleResponse> {
    articles
        .into_iter()
        .map(|article| article.into_response(base_url))
        .collect()
}

// --- User Handlers ---

/// register_user
///
/// [Public Route] Creates a new user account. The password is hashed with
/// Argon2id before it reaches the repository; a duplicate username or email
/// surfaces as a 409 from the database's uniqueness constraints.
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserIdentity),
        (status = 400, description = "Missing required field"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserIdentity>), ApiError> {
    if payload.username.trim().is_empty()
        || payload.phone.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::Validation("all fields are required".to_string()));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let role = payload
        .role
        .filter(|role| !role.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            phone: payload.phone,
            email: payload.email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login_user
///
/// [Public Route] Authenticates a user and issues a session token.
///
/// *Distinction*: an unknown username is a 404 and a wrong password a 400,
/// matching the API contract rather than collapsing both into one response.
/// The redirect hint depends on the role so the frontend can route admins
/// to their dashboard.
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing payload fields or wrong password"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    if !auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials(
            "invalid credentials".to_string(),
        ));
    }

    let token = auth::issue_token(user.id, &user.role, &state.config.jwt_secret)?;

    let redirect_to = if user.role == "admin" {
        "/dashboard-admin".to_string()
    } else {
        "/".to_string()
    };

    Ok(Json(LoginResponse { token, redirect_to }))
}

/// logout_user
///
/// [Public Route] Stateless acknowledgment. Session tokens are
/// self-contained and carry their own expiry, so there is nothing
/// server-side to invalidate; the client simply discards its copy.
#[utoipa::path(
    post,
    path = "/api/users/logout",
    responses((status = 200, description = "Acknowledged", body = MessageResponse))
)]
pub async fn logout_user() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}

// --- Article Handlers ---

/// submit_article
///
/// [Authenticated Route] Accepts a multipart submission (title, description,
/// image), validates the upload policy, persists the image, and creates the
/// article in `pending` state owned by the requesting principal.
///
/// *Atomicity*: the upload-then-insert sequence is not transactional. If the
/// insert fails after the file was written, the stored file is removed before
/// the error is reported, so no orphaned upload is left behind.
#[utoipa::path(
    post,
    path = "/api/articles/submit",
    responses(
        (status = 201, description = "Article submitted", body = MessageResponse),
        (status = 400, description = "Missing title, description, or image"),
        (status = 401, description = "Missing or invalid token"),
        (status = 413, description = "Image over 5 MiB"),
        (status = 415, description = "Disallowed image extension")
    )
)]
pub async fn submit_article(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read title: {e}")))?;
            }
            "description" => {
                description = field.text().await.map_err(|e| {
                    ApiError::Validation(format!("failed to read description: {e}"))
                })?;
            }
            "image" => {
                let filename = field.file_name().map(String::from).unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read image: {e}")))?;
                image = Some((filename, data));
            }
            // Unknown fields are ignored, matching lenient form handling.
            _ => {}
        }
    }

    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(ApiError::Validation(
            "title and description are required".to_string(),
        ));
    }
    let (filename, data) = image.ok_or_else(|| {
        ApiError::Validation("image file is required".to_string())
    })?;

    // Upload policy: extension allow-list, then the 5 MiB cap.
    let extension = validate_upload(&filename, data.len())?;
    let stored_name = storage_name(&extension);

    let image_url = state
        .storage
        .store(&stored_name, &data)
        .await
        .map_err(|e| {
            tracing::error!("upload storage failed: {e}");
            ApiError::Internal("failed to persist upload".to_string())
        })?;

    let slug = slugify(&title);

    match state
        .repo
        .create_article(NewArticle {
            user_id,
            title,
            slug,
            description,
            image_url: image_url.clone(),
        })
        .await
    {
        Ok(article) => {
            tracing::info!(article_id = %article.id, owner = %user_id, "article submitted");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse::new("Article submitted successfully")),
            ))
        }
        Err(e) => {
            // Compensating cleanup: drop the just-written file so the failed
            // insert does not leave an orphaned upload on disk.
            if let Err(cleanup) = state.storage.remove(&image_url).await {
                tracing::error!("orphaned upload cleanup failed: {cleanup}");
            }
            Err(e.into())
        }
    }
}

/// get_pending_articles
///
/// [Admin Route] The moderation queue: all articles still in `pending`.
///
/// *Authorization*: explicitly checks that the `role` resolved by `AuthUser`
/// is "admin".
#[utoipa::path(
    get,
    path = "/api/articles/pending",
    responses(
        (status = 200, description = "Pending articles", body = [ArticleResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_pending_articles(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Authorization("access denied".to_string()));
    }
    let articles = state
        .repo
        .get_articles_by_status(ArticleStatus::Pending)
        .await?;
    Ok(Json(shape_articles(articles, &state.config.base_url)))
}

/// review_article
///
/// [Admin Route] Applies a review decision to a pending article.
///
/// *State machine*: only `pending -> approved` and `pending -> rejected` are
/// legal. The repository update is guarded by the current status, so an
/// already-decided article yields 409 and an unknown id 404; the silent
/// success of an unguarded update is treated as a bug, not a feature.
#[utoipa::path(
    post,
    path = "/api/articles/review/{article_id}",
    params(("article_id" = Uuid, Path, description = "Article ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision applied", body = MessageResponse),
        (status = 400, description = "Status not 'approved' or 'rejected'"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Unknown article"),
        (status = 409, description = "Article already decided")
    )
)]
pub async fn review_article(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Authorization("access denied".to_string()));
    }

    let decision = match ArticleStatus::parse(&payload.status) {
        Some(status @ (ArticleStatus::Approved | ArticleStatus::Rejected)) => status,
        _ => return Err(ApiError::Validation("invalid status".to_string())),
    };

    match state.repo.set_article_status(article_id, decision).await? {
        Some(article) => {
            tracing::info!(article_id = %article.id, status = %decision, "article reviewed");
            Ok(Json(MessageResponse::new(format!(
                "Article has been {decision} successfully"
            ))))
        }
        // Zero rows touched: either the article does not exist or it has
        // already left `pending`. Look it up to report which.
        None => match state.repo.get_article(article_id).await? {
            Some(_) => Err(ApiError::Conflict(
                "article has already been reviewed".to_string(),
            )),
            None => Err(ApiError::NotFound("article not found".to_string())),
        },
    }
}

/// get_approved_articles
///
/// [Public Route] The published feed: approved articles only, image
/// references rewritten to absolute URLs, upload dates as YYYY-MM-DD.
/// The status filter lives in the repository query, so this path can never
/// leak pending or rejected submissions.
#[utoipa::path(
    get,
    path = "/api/articles/approved",
    responses((status = 200, description = "Approved articles", body = [ArticleResponse]))
)]
pub async fn get_approved_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    let articles = state
        .repo
        .get_articles_by_status(ArticleStatus::Approved)
        .await?;
    Ok(Json(shape_articles(articles, &state.config.base_url)))
}

/// get_rejected_articles
///
/// [Admin Route] Rejected submissions. Gated like the pending queue:
/// rejection outcomes are moderation data, not public content.
#[utoipa::path(
    get,
    path = "/api/articles/rejected",
    responses(
        (status = 200, description = "Rejected articles", body = [ArticleResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_rejected_articles(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    if role != "admin" {
        return Err(ApiError::Authorization("access denied".to_string()));
    }
    let articles = state
        .repo
        .get_articles_by_status(ArticleStatus::Rejected)
        .await?;
    Ok(Json(shape_articles(articles, &state.config.base_url)))
}

/// get_article_by_slug
///
/// [Public Route] Single-article lookup by slug. Only approved articles are
/// reachable; a pending or rejected article with the same slug is a 404 to
/// the public. On slug collision the newest approved article wins.
#[utoipa::path(
    get,
    path = "/api/articles/slug/{slug}",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Found", body = ArticleResponse),
        (status = 404, description = "No approved article with that slug")
    )
)]
pub async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ApiError> {
    match state.repo.get_approved_by_slug(&slug).await? {
        Some(article) => Ok(Json(article.into_response(&state.config.base_url))),
        None => Err(ApiError::NotFound("article not found".to_string())),
    }
}
