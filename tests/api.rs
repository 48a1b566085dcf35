use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use shelf_app::Application;
use shelf_authz::TokenService;
use shelf_db::{Database, Store};
use shelf_kernel::Settings;

struct Harness {
    server: TestServer,
    tokens: TokenService,
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.bcrypt_cost = 4;
    settings.auth.jwt_secret = "integration-test-secret".into();
    settings
}

async fn harness() -> Harness {
    let settings = test_settings();
    let tokens = TokenService::from_settings(&settings.auth);
    let app = Application::with_store(settings, Store::Memory(Database::in_memory("api-test")))
        .await
        .unwrap();
    let server = TestServer::new(app.router()).unwrap();

    Harness { server, tokens }
}

/// Application built from configuration against a SQLite file.
async fn sqlite_harness(path: &std::path::Path) -> (Harness, Application) {
    let mut settings = test_settings();
    settings.database.endpoint = format!("sqlite://{}", path.display());

    let tokens = TokenService::from_settings(&settings.auth);
    let app = Application::build(settings).await.unwrap();
    let server = TestServer::new(app.router()).unwrap();

    (Harness { server, tokens }, app)
}

impl Harness {
    async fn login(&self, email: &str) -> String {
        self.server
            .post("/signup")
            .json(&json!({"name": "Reader", "email": email, "password": "pw"}))
            .await
            .assert_status(StatusCode::CREATED);

        let body: Value = self
            .server
            .post("/login")
            .json(&json!({"email": email, "password": "pw"}))
            .await
            .json();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_book(&self, token: &str, title: &str, author: &str, genre: &str) -> String {
        let response = self
            .server
            .post("/books")
            .authorization_bearer(token)
            .json(&json!({"title": title, "author": author, "genre": genre}))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn welcome_and_health() {
    let h = harness().await;

    h.server.get("/").await.assert_json(&json!({
        "status": "OK",
        "message": "Welcome to the Book Review API"
    }));
    h.server.get("/healthz").await.assert_text("ok");
}

#[tokio::test]
async fn signup_login_review_lifecycle() {
    let h = harness().await;

    let signup = h
        .server
        .post("/signup")
        .json(&json!({"name": "Ada", "email": "ada@example.com", "password": "pw"}))
        .await;
    signup.assert_status(StatusCode::CREATED);
    signup.assert_json(&json!({"message": "User created", "user": "ada@example.com"}));

    let login = h
        .server
        .post("/login")
        .json(&json!({"email": "ada@example.com", "password": "pw"}))
        .await;
    login.assert_status_ok();
    let login: Value = login.json();
    assert_eq!(login["message"], "Login Successful");
    let token = login["token"].as_str().unwrap().to_string();

    let book_id = h.create_book(&token, "Dune", "Frank Herbert", "sf").await;

    let created = h
        .server
        .post(&format!("/books/{book_id}/reviews"))
        .authorization_bearer(&token)
        .json(&json!({"rating": 4, "comment": "great"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    created.assert_json(&json!({
        "message": "Review created",
        "review": {"comment": "great", "rating": 4, "bookId": book_id}
    }));

    let detail: Value = h.server.get(&format!("/books/{book_id}")).await.json();
    assert_eq!(detail["book"]["title"], "Dune");
    assert_eq!(detail["averageRating"], 4.0);
    assert_eq!(detail["metaReviews"]["totalReviews"], 1);
    assert_eq!(
        detail["metaReviews"]["reviews"],
        json!([{"comment": "great", "rating": 4}])
    );

    h.server
        .post(&format!("/books/{book_id}/reviews"))
        .authorization_bearer(&token)
        .json(&json!({"rating": 2, "comment": "again"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let updated = h
        .server
        .put(&format!("/reviews/{book_id}"))
        .authorization_bearer(&token)
        .json(&json!({"rating": 5}))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["review"]["rating"], 5);

    h.server
        .delete(&format!("/reviews/{book_id}"))
        .authorization_bearer(&token)
        .await
        .assert_json(&json!({"message": "Review deleted"}));

    h.server
        .delete(&format!("/reviews/{book_id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_not_found();

    let detail: Value = h.server.get(&format!("/books/{book_id}")).await.json();
    assert_eq!(detail["averageRating"], 0.0);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let h = harness().await;

    let missing = h
        .server
        .post("/books")
        .json(&json!({"title": "t", "author": "a", "genre": "g"}))
        .await;
    missing.assert_status_unauthorized();
    assert_eq!(missing.json::<Value>()["message"], "Unauthorized Request");

    let garbage = h
        .server
        .post("/books")
        .authorization_bearer("not-a-token")
        .json(&json!({"title": "t", "author": "a", "genre": "g"}))
        .await;
    garbage.assert_status_unauthorized();
    assert_eq!(garbage.json::<Value>()["message"], "Invalid token");

    let stale = h
        .tokens
        .issue_at("u-1", Utc::now() - Duration::hours(25))
        .unwrap();
    let expired = h
        .server
        .put("/reviews/some-book")
        .authorization_bearer(&stale)
        .json(&json!({"rating": 3}))
        .await;
    expired.assert_status_unauthorized();
    assert_eq!(expired.json::<Value>()["message"], "Token expired");

    let early = h
        .tokens
        .issue_at("u-1", Utc::now() + Duration::hours(1))
        .unwrap();
    h.server
        .delete("/reviews/some-book")
        .authorization_bearer(&early)
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn public_routes_need_no_token() {
    let h = harness().await;
    h.server.get("/books").await.assert_status_ok();
    h.server
        .get("/books/missing")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let h = harness().await;
    let token = h.login("lister@example.com").await;
    h.create_book(&token, "Dune", "A", "sf").await;
    h.create_book(&token, "Earthsea", "B", "fantasy").await;
    h.create_book(&token, "Dracula", "C", "horror").await;

    let body: Value = h
        .server
        .get("/books")
        .add_query_param("author", "A, B")
        .await
        .json();
    assert_eq!(body["totalBooks"], 2);
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Dune", "Earthsea"]);

    let body: Value = h
        .server
        .get("/books")
        .add_query_param("limit", "2")
        .add_query_param("page", "2")
        .await
        .json();
    assert_eq!(body["books"].as_array().unwrap().len(), 1);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["nextPageAvailable"], false);
    assert_eq!(body["previousPageAvailable"], true);

    h.server
        .get("/books")
        .add_query_param("page", "0")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn search_is_case_insensitive_and_404s_when_empty() {
    let h = harness().await;
    let token = h.login("searcher@example.com").await;
    h.create_book(&token, "Dune", "Frank Herbert", "sf").await;

    let body: Value = h
        .server
        .get("/search")
        .add_query_param("query", "herbert")
        .await
        .json();
    assert_eq!(body["books"][0]["title"], "Dune");

    let none = h
        .server
        .get("/search")
        .add_query_param("query", "tolkien")
        .await;
    none.assert_status_not_found();
    assert_eq!(
        none.json::<Value>()["message"],
        "No books found matching your search criteria"
    );

    h.server.get("/search").await.assert_status_bad_request();
}

#[tokio::test]
async fn book_update_validates_fields() {
    let h = harness().await;
    let token = h.login("editor@example.com").await;
    let book_id = h.create_book(&token, "Dune", "Frank Herbert", "sf").await;

    let invalid = h
        .server
        .put(&format!("/books/{book_id}"))
        .authorization_bearer(&token)
        .json(&json!({"foo": "bar"}))
        .await;
    invalid.assert_status_bad_request();
    assert_eq!(invalid.json::<Value>()["message"], "Invalid fields: foo");

    let empty = h
        .server
        .put(&format!("/books/{book_id}"))
        .authorization_bearer(&token)
        .json(&json!({}))
        .await;
    empty.assert_status_bad_request();
    assert_eq!(empty.json::<Value>()["message"], "No update data provided");

    h.server
        .put(&format!("/books/{book_id}"))
        .authorization_bearer(&token)
        .json(&json!({"title": "Dune Messiah"}))
        .await
        .assert_json(&json!({
            "message": "Book updated successfully",
            "book": {"id": book_id, "title": "Dune Messiah"}
        }));
}

#[tokio::test]
async fn errors_use_the_shared_envelope() {
    let h = harness().await;

    let response = h
        .server
        .post("/login")
        .json(&json!({"email": "nobody@example.com", "password": "pw"}))
        .await;
    response.assert_status_unauthorized();

    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid credentials");
    assert_eq!(body["code"], "unauthorized");
    assert!(body["traceId"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn openapi_document_lists_every_route() {
    let h = harness().await;
    let doc: Value = h.server.get("/docs/openapi.json").await.json();

    for path in ["/books", "/books/{id}", "/search", "/books/{id}/reviews", "/reviews/{id}", "/signup", "/login"] {
        assert!(doc["paths"][path].is_object(), "missing {path}");
    }
    assert!(doc["paths"]["/books/{id}"]["get"].is_object());
    assert!(doc["paths"]["/books/{id}"]["put"].is_object());
}

#[tokio::test]
async fn malformed_query_string_is_a_json_bad_request() {
    let h = harness().await;

    let response = h.server.get("/books?author=A&author=B").await;
    response.assert_status_bad_request();

    let body: Value = response.json();
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn sqlite_store_keeps_data_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelf.db");

    let (h, app) = sqlite_harness(&path).await;
    let token = h.login("ada@example.com").await;
    let book_id = h.create_book(&token, "Dune", "Frank Herbert", "sf").await;
    h.server
        .post(&format!("/books/{book_id}/reviews"))
        .authorization_bearer(&token)
        .json(&json!({"rating": 4, "comment": "great"}))
        .await
        .assert_status(StatusCode::CREATED);
    drop(h);
    app.shutdown().await.unwrap();

    let (h, _app) = sqlite_harness(&path).await;
    let listing: Value = h.server.get("/books").await.json();
    assert_eq!(listing["totalBooks"], 1);
    assert_eq!(listing["books"][0]["id"], book_id.as_str());

    let detail: Value = h.server.get(&format!("/books/{book_id}")).await.json();
    assert_eq!(detail["averageRating"], 4.0);

    // The account survived, and so does its unique email.
    h.server
        .post("/signup")
        .json(&json!({"name": "Ada", "email": "ada@example.com", "password": "pw"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    let login: Value = h
        .server
        .post("/login")
        .json(&json!({"email": "ada@example.com", "password": "pw"}))
        .await
        .json();
    let token = login["token"].as_str().unwrap().to_string();

    h.server
        .post(&format!("/books/{book_id}/reviews"))
        .authorization_bearer(&token)
        .json(&json!({"rating": 2, "comment": "again"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
