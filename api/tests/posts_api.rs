use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use posts_api::{
    AppState,
    db::{MemoryPostStore, PostPage, PostQuery, PostStore, StoreError},
    models::Post,
    storage::{MemoryStorage, ObjectStorage, StorageError, UploadObject},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "posts-api-test-boundary";
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

struct ImageFile<'a> {
    field: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    data: &'a [u8],
}

const PNG: ImageFile<'static> = ImageFile {
    field: "image",
    file_name: "photo.png",
    content_type: "image/png",
    data: b"\x89PNG\r\n\x1a\nfake",
};

fn multipart_body(fields: &[(&str, &str)], files: &[ImageFile<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn create_request(fields: &[(&str, &str)], files: &[ImageFile<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/posts")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, files)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn test_app() -> (Router, MemoryPostStore, MemoryStorage) {
    let store = MemoryPostStore::new();
    let storage = MemoryStorage::default();
    let state = AppState::new(store.clone(), storage.clone());
    (posts_api::app(state, MAX_UPLOAD_BYTES), store, storage)
}

/// Insert a post whose `createdAt` lies `age_minutes` in the past.
async fn seed(store: &MemoryPostStore, title: &str, desc: &str, tag: &str, age_minutes: i64) -> Post {
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    let post = Post {
        created_at,
        updated_at: created_at,
        ..Post::new(
            title.into(),
            desc.into(),
            tag.into(),
            format!("http://localhost:9000/posts/1-{title}.png"),
        )
    };
    store.insert(post).await.unwrap()
}

fn titles(body: &Value) -> Vec<String> {
    body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap().to_owned())
        .collect()
}

struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn put(&self, object: UploadObject) -> Result<String, StorageError> {
        Err(StorageError::Upload {
            key: object.key,
            message: "connection refused".into(),
        })
    }
}

struct FailingStore;

#[async_trait]
impl PostStore for FailingStore {
    async fn insert(&self, _post: Post) -> Result<Post, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn list(&self, _query: &PostQuery) -> Result<PostPage, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Post>, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn create_post_returns_created_row() {
    let (app, store, storage) = test_app();

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[PNG],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["desc"], "World");
    assert_eq!(body["tag"], "misc");
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());

    let image_url = body["imageURL"].as_str().unwrap();
    let last_segment = image_url.rsplit('/').next().unwrap();
    let (timestamp, file_name) = last_segment.split_once('-').unwrap();
    assert!(!timestamp.is_empty() && timestamp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(file_name, "photo.png");

    assert_eq!(store.len(), 1);
    assert_eq!(storage.len(), 1);
    let object = storage.get(last_segment).unwrap();
    assert_eq!(object.content_type, "image/png");
    assert_eq!(object.field_name, "image");
    assert_eq!(&object.body[..], PNG.data);
}

#[tokio::test]
async fn created_post_is_listed_and_fetchable() {
    let (app, _store, _storage) = test_app();

    let response = app
        .clone()
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[PNG],
        ))
        .await
        .unwrap();
    let created = json(response).await;

    let response = app.clone().oneshot(get("/posts")).await.unwrap();
    let body = json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["rows"][0], created);

    let uri = format!("/posts/{}", created["id"].as_str().unwrap());
    let response = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, created);
}

#[tokio::test]
async fn create_without_image_is_rejected_before_upload() {
    let (app, store, storage) = test_app();

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["message"].is_string());
    assert!(store.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn create_with_missing_field_uploads_nothing() {
    let (app, store, storage) = test_app();

    let response = app
        .oneshot(create_request(&[("desc", "World"), ("tag", "misc")], &[PNG]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn create_rejects_unexpected_and_duplicate_files() {
    let (app, _store, storage) = test_app();
    let fields = [("title", "Hello"), ("desc", "World"), ("tag", "misc")];

    let avatar = ImageFile {
        field: "avatar",
        ..PNG
    };
    let response = app
        .clone()
        .oneshot(create_request(&fields, &[avatar]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let second = ImageFile {
        file_name: "other.png",
        ..PNG
    };
    let response = app
        .oneshot(create_request(&fields, &[PNG, second]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(storage.is_empty());
}

#[tokio::test]
async fn create_rejects_file_name_without_base_name() {
    let (app, store, storage) = test_app();
    let directory = ImageFile {
        file_name: "dir/",
        ..PNG
    };

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[directory],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["message"].is_string());
    assert!(store.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn create_requires_multipart_body() {
    let (app, _store, _storage) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/posts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Hello","desc":"World","tag":"misc"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, _store, storage) = test_app();
    let data = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let big = ImageFile {
        data: &data,
        ..PNG
    };

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[big],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn upload_failure_is_server_error_and_skips_insert() {
    let store = MemoryPostStore::new();
    let app = posts_api::app(AppState::new(store.clone(), FailingStorage), MAX_UPLOAD_BYTES);

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[PNG],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["message"], "Server Error");
    assert!(store.is_empty());
}

#[tokio::test]
async fn insert_failure_is_server_error_and_leaves_upload() {
    let storage = MemoryStorage::default();
    let app = posts_api::app(AppState::new(FailingStore, storage.clone()), MAX_UPLOAD_BYTES);

    let response = app
        .oneshot(create_request(
            &[("title", "Hello"), ("desc", "World"), ("tag", "misc")],
            &[PNG],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["message"], "Server Error");
    assert_eq!(storage.len(), 1);
    assert!(storage.keys()[0].ends_with("-photo.png"));
}

// ============================================================================
// LIST
// ============================================================================

#[tokio::test]
async fn empty_store_lists_nothing() {
    let (app, _store, _storage) = test_app();

    let response = app.oneshot(get("/posts?page=1&limit=10")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, serde_json::json!({ "count": 0, "rows": [] }));
}

#[tokio::test]
async fn empty_filters_return_every_post_newest_first() {
    let (app, store, _storage) = test_app();
    for i in 0..4 {
        seed(&store, &format!("post {i}"), "body", "misc", i).await;
    }

    let response = app.oneshot(get("/posts?keyword=&tag=")).await.unwrap();

    let body = json(response).await;
    assert_eq!(body["count"], 4);
    assert_eq!(titles(&body), vec!["post 0", "post 1", "post 2", "post 3"]);
}

#[tokio::test]
async fn second_page_holds_rows_six_to_ten() {
    let (app, store, _storage) = test_app();
    for i in 0..12 {
        seed(&store, &format!("post {i:02}"), "body", "misc", i).await;
    }

    let response = app
        .clone()
        .oneshot(get("/posts?limit=100"))
        .await
        .unwrap();
    let everything = titles(&json(response).await);

    let response = app.oneshot(get("/posts?page=2&limit=5")).await.unwrap();
    let body = json(response).await;

    assert_eq!(body["count"], 12);
    assert_eq!(titles(&body), everything[5..10].to_vec());
}

#[tokio::test]
async fn page_past_the_end_is_empty_but_counted() {
    let (app, store, _storage) = test_app();
    for i in 0..3 {
        seed(&store, &format!("post {i}"), "body", "misc", i).await;
    }

    let response = app.oneshot(get("/posts?page=4&limit=5")).await.unwrap();
    let body = json(response).await;

    assert_eq!(body["count"], 3);
    assert!(body["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn tag_filter_includes_and_excludes() {
    let (app, store, _storage) = test_app();
    seed(&store, "Headline", "today", "news", 0).await;

    for (uri, expected) in [
        ("/posts?tag=sports", 0),
        ("/posts?tag=news", 1),
        ("/posts?tag=NEWS", 1),
        ("/posts?tag=", 1),
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        let body = json(response).await;
        assert_eq!(body["count"], expected, "{uri}");
    }
}

#[tokio::test]
async fn keyword_matches_title_or_description() {
    let (app, store, _storage) = test_app();
    seed(&store, "Rust 2024", "edition notes", "tech", 2).await;
    seed(&store, "Garden", "fighting rust on tools", "home", 1).await;
    seed(&store, "Pasta", "dinner", "food", 0).await;

    let response = app.oneshot(get("/posts?keyword=RUST")).await.unwrap();
    let body = json(response).await;

    assert_eq!(body["count"], 2);
    assert_eq!(titles(&body), vec!["Garden", "Rust 2024"]);
}

#[tokio::test]
async fn keyword_wildcards_match_literally() {
    let (app, store, _storage) = test_app();
    seed(&store, "50% off", "sale", "shop", 1).await;
    seed(&store, "Full price", "no sale", "shop", 0).await;

    let response = app.oneshot(get("/posts?keyword=%25")).await.unwrap();
    let body = json(response).await;

    assert_eq!(titles(&body), vec!["50% off"]);
}

#[tokio::test]
async fn sort_by_title_ascending() {
    let (app, store, _storage) = test_app();
    for (i, title) in ["pear", "apple", "fig", "banana"].iter().enumerate() {
        seed(&store, title, "fruit", "food", i as i64).await;
    }

    let response = app
        .oneshot(get("/posts?sortBy=title&sortOrder=ASC"))
        .await
        .unwrap();
    let titles = titles(&json(response).await);

    assert!(titles.windows(2).all(|pair| pair[0] <= pair[1]), "{titles:?}");
    assert_eq!(titles.len(), 4);
}

#[tokio::test]
async fn invalid_listing_parameters_are_client_errors() {
    let (app, _store, _storage) = test_app();

    for uri in [
        "/posts?sortBy=password",
        "/posts?sortOrder=sideways",
        "/posts?page=0",
        "/posts?limit=abc",
        "/posts?limit=-1",
        "/posts?page=1&page=2",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(json(response).await["message"].is_string());
    }
}

#[tokio::test]
async fn large_limit_is_honoured() {
    let (app, store, _storage) = test_app();
    for i in 0..3 {
        seed(&store, &format!("post {i}"), "body", "misc", i).await;
    }

    let response = app.oneshot(get("/posts?limit=1000")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["rows"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn list_failure_is_opaque_server_error() {
    let app = posts_api::app(
        AppState::new(FailingStore, MemoryStorage::default()),
        MAX_UPLOAD_BYTES,
    );

    let response = app.oneshot(get("/posts")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await, serde_json::json!({ "message": "Server Error" }));
}

// ============================================================================
// GET ONE / HEALTH
// ============================================================================

#[tokio::test]
async fn unknown_post_is_not_found() {
    let (app, _store, _storage) = test_app();

    let response = app
        .clone()
        .oneshot(get(&format!("/posts/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/posts/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert!(json(response).await["message"].is_string());
}

#[tokio::test]
async fn health_reflects_database() {
    let (app, _store, _storage) = test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["status"], "healthy");

    let app = posts_api::app(
        AppState::new(FailingStore, MemoryStorage::default()),
        MAX_UPLOAD_BYTES,
    );
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
