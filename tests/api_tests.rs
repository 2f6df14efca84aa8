use article_portal::{
    AppState,
    config::AppConfig,
    create_router,
    models::{Article, ArticleStatus, NewArticle, NewUser, User},
    repository::Repository,
    storage::MockStorageService,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Mock Repository (end-to-end, no live Postgres required) ---

#[derive(Default)]
struct MockRepo {
    user_to_return: Option<User>,
    articles_to_return: Vec<Article>,
    review_result: Option<Article>,
    fail_article_insert: bool,
    created_articles: Mutex<Vec<NewArticle>>,
}

#[async_trait]
impl Repository for MockRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        Ok(User {
            id: Uuid::new_v4(),
            username: user.username,
            phone: user.phone,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        })
    }

    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user_to_return.clone())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .user_to_return
            .clone()
            .filter(|user| user.username == username))
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article, sqlx::Error> {
        if self.fail_article_insert {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.created_articles.lock().unwrap().push(article.clone());
        Ok(Article {
            id: Uuid::new_v4(),
            user_id: article.user_id,
            title: article.title,
            slug: article.slug,
            description: article.description,
            image_url: article.image_url,
            status: "pending".to_string(),
            created_at: Utc::now(),
        })
    }

    async fn get_article(&self, _id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        Ok(None)
    }

    async fn get_articles_by_status(
        &self,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, sqlx::Error> {
        Ok(self
            .articles_to_return
            .iter()
            .filter(|article| article.status == status.as_str())
            .cloned()
            .collect())
    }

    async fn set_article_status(
        &self,
        _id: Uuid,
        _status: ArticleStatus,
    ) -> Result<Option<Article>, sqlx::Error> {
        Ok(self.review_result.clone())
    }

    async fn get_approved_by_slug(&self, slug: &str) -> Result<Option<Article>, sqlx::Error> {
        Ok(self
            .articles_to_return
            .iter()
            .find(|article| article.slug == slug && article.status == "approved")
            .cloned())
    }
}

// --- Test Harness ---

struct TestApp {
    address: String,
    repo: Arc<MockRepo>,
    storage: Arc<MockStorageService>,
}

async fn spawn_app(repo: MockRepo, storage: MockStorageService) -> TestApp {
    let repo = Arc::new(repo);
    let storage = Arc::new(storage);

    let state = AppState {
        repo: repo.clone(),
        storage: storage.clone(),
        // Defaults: Env::Local, so the x-user-id bypass is available to tests
        // that do not exercise the full token flow.
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        storage,
    }
}

fn seeded_user(role: &str, password: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        phone: "555-0100".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: article_portal::auth::hash_password(password).unwrap(),
        role: role.to_string(),
    }
}

fn approved_article(slug: &str) -> Article {
    Article {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        title: "Hello World!".to_string(),
        slug: slug.to_string(),
        description: "A greeting".to_string(),
        image_url: "uploads/img.png".to_string(),
        status: "approved".to_string(),
        created_at: Utc::now(),
    }
}

fn image_form(title: &str, filename: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("description", "A greeting".to_string())
        .part(
            "image",
            reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
        )
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_register_creates_user() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/users/register", app.address))
        .json(&serde_json::json!({
            "username": "alice", "phone": "555-0100",
            "email": "alice@example.com", "password": "hunter2!"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn test_register_rejects_missing_field() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/users/register", app.address))
        .json(&serde_json::json!({
            "username": "alice", "phone": "", "email": "alice@example.com",
            "password": "hunter2!"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_logout_acknowledges() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/users/logout", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_login_then_submit_with_bearer_token() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    // 1. Login with the seeded credentials.
    let response = client
        .post(format!("{}/api/users/login", app.address))
        .json(&serde_json::json!({ "username": "alice", "password": "hunter2!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().expect("token in body").to_string();
    assert_eq!(body["redirectTo"], "/");

    // 2. Submit an article with the issued token.
    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .header("authorization", format!("Bearer {token}"))
        .multipart(image_form("Hello World!", "pic.png", vec![0u8; 128]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // 3. The created article is pending, owned by the principal, with the
    // derived slug and the stored image reference.
    let created = app.repo.created_articles.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].user_id, user_id);
    assert_eq!(created[0].slug, "hello-world");
    assert!(created[0].image_url.starts_with("uploads/"));
    assert_eq!(app.storage.stored.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_requires_auth() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .multipart(image_form("Hello World!", "pic.png", vec![0u8; 128]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_submit_rejects_gif_and_creates_nothing() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .header("x-user-id", user_id.to_string())
        .multipart(image_form("Hello World!", "anim.gif", vec![0u8; 128]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 415);
    assert!(app.repo.created_articles.lock().unwrap().is_empty());
    assert!(app.storage.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_rejects_oversized_image() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    // 6 MB: over the 5 MiB policy, under the transport ceiling.
    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .header("x-user-id", user_id.to_string())
        .multipart(image_form("Hello World!", "big.png", vec![0u8; 6 * 1024 * 1024]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
    assert!(app.repo.created_articles.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_rejects_missing_title() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("description", "A greeting".to_string())
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![0u8; 128]).file_name("pic.png".to_string()),
        );

    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .header("x-user-id", user_id.to_string())
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_submit_cleans_up_upload_when_insert_fails() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            fail_article_insert: true,
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/articles/submit", app.address))
        .header("x-user-id", user_id.to_string())
        .multipart(image_form("Hello World!", "pic.png", vec![0u8; 128]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    // The stored file was removed again: no orphaned upload.
    let stored = app.storage.stored.lock().unwrap();
    let removed = app.storage.removed.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(removed.len(), 1);
    assert!(removed[0].ends_with(stored[0].as_str()));
}

#[tokio::test]
async fn test_pending_queue_requires_admin() {
    let user = seeded_user("user", "hunter2!");
    let user_id = user.id;
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(user),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/articles/pending", app.address))
        .header("x-user-id", user_id.to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_admin_reviews_pending_article() {
    let admin = seeded_user("admin", "hunter2!");
    let admin_id = admin.id;
    let mut decided = approved_article("hello-world");
    decided.status = "rejected".to_string();
    let app = spawn_app(
        MockRepo {
            user_to_return: Some(admin),
            review_result: Some(decided),
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "{}/api/articles/review/{}",
            app.address,
            Uuid::new_v4()
        ))
        .header("x-user-id", admin_id.to_string())
        .json(&serde_json::json!({ "status": "rejected" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_approved_feed_is_public_and_filtered() {
    let mut pending = approved_article("draft");
    pending.status = "pending".to_string();
    let app = spawn_app(
        MockRepo {
            articles_to_return: vec![approved_article("hello-world"), pending],
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    // No credentials at all.
    let response = client
        .get(format!("{}/api/articles/approved", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["slug"], "hello-world");
    // Absolute URL rewrite happened.
    assert!(
        list[0]["image_url"]
            .as_str()
            .unwrap()
            .starts_with("http://")
    );
}

#[tokio::test]
async fn test_rejected_feed_requires_admin() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/articles/rejected", app.address))
        .send()
        .await
        .unwrap();

    // Unauthenticated: rejected submissions are moderation data.
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_slug_lookup_not_found() {
    let app = spawn_app(MockRepo::default(), MockStorageService::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/articles/slug/hello-world", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn test_slug_lookup_returns_approved_article() {
    let app = spawn_app(
        MockRepo {
            articles_to_return: vec![approved_article("hello-world")],
            ..MockRepo::default()
        },
        MockStorageService::new(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/articles/slug/hello-world", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["slug"], "hello-world");
    assert_eq!(body["title"], "Hello World!");
}
