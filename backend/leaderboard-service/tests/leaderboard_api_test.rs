use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use leaderboard_service::error::messages;
use leaderboard_service::handlers::{self, LeaderboardHandlerState, StaticAssets, MAX_BODY_BYTES};
use leaderboard_service::services::store::FileStore;
use leaderboard_service::services::validation::PLACEHOLDER_NAME;
use leaderboard_service::services::LeaderboardService;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let public = dir.path().join("public");
        std::fs::create_dir_all(public.join("js")).unwrap();
        std::fs::write(public.join("index.html"), "<h1>Dust Time</h1>").unwrap();
        std::fs::write(public.join("js").join("game.js"), "console.log('dust');").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "do not serve").unwrap();
        Self { dir }
    }

    fn data_file(&self) -> std::path::PathBuf {
        self.dir.path().join("data").join("leaderboard.json")
    }

    async fn app(
        &self,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
        let store = Arc::new(FileStore::new(self.data_file()));
        let service = Arc::new(LeaderboardService::new(store));

        test::init_service(
            App::new()
                .app_data(web::Data::new(LeaderboardHandlerState { service }))
                .app_data(web::Data::new(StaticAssets::new(self.dir.path().join("public"))))
                .configure(handlers::configure_routes),
        )
        .await
    }
}

async fn post_score<S>(app: &S, body: Value) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/leaderboard")
            .set_json(&body)
            .to_request(),
    )
    .await;
    let status = resp.status();
    (status, test::read_body_json(resp).await)
}

async fn get_board<S>(app: &S) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, test::TestRequest::get().uri("/api/leaderboard").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn fresh_leaderboard_returns_empty_entries() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    assert_eq!(get_board(&app).await, json!({ "entries": [] }));
    assert!(fixture.data_file().exists());
}

#[actix_web::test]
async fn submit_returns_201_with_entries() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let (status, body) = post_score(&app, json!({ "name": "  Ada ", "score": 120.9 })).await;

    assert_eq!(status, StatusCode::CREATED);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Ada");
    assert_eq!(entries[0]["score"], 120);
    assert!(entries[0]["submittedAt"].as_str().unwrap().ends_with('Z'));
}

#[actix_web::test]
async fn same_name_overwrites_with_most_recent_score() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    post_score(&app, json!({ "name": "Ada", "score": 120 })).await;
    post_score(&app, json!({ "name": "ada", "score": 80 })).await;

    let board = get_board(&app).await;
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "ada");
    assert_eq!(entries[0]["score"], 80);
}

#[actix_web::test]
async fn only_top_five_are_kept() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    for (name, score) in [("a", 10), ("b", 9), ("c", 8), ("d", 7), ("e", 6), ("f", 5)] {
        let (status, _) = post_score(&app, json!({ "name": name, "score": score })).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let board = get_board(&app).await;
    let scores: Vec<u64> = board["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["score"].as_u64().unwrap())
        .collect();
    assert_eq!(scores, vec![10, 9, 8, 7, 6]);
}

#[actix_web::test]
async fn invalid_scores_return_400_and_leave_board_unchanged() {
    let fixture = Fixture::new();
    let app = fixture.app().await;
    post_score(&app, json!({ "name": "Ada", "score": 1 })).await;
    let before = get_board(&app).await;

    for body in [
        json!({ "name": "Bob", "score": "abc" }),
        json!({ "name": "Bob", "score": -1 }),
        json!({ "name": "Bob", "score": null }),
        json!({ "name": "Bob", "score": 1e20 }),
        json!({ "name": "Bob", "score": "9007199254740992" }),
        json!({ "name": "Bob" }),
    ] {
        let (status, error) = post_score(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, json!({ "error": messages::INVALID_SCORE }));
    }

    assert_eq!(get_board(&app).await, before);
}

#[actix_web::test]
async fn blank_name_uses_placeholder() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let (_, body) = post_score(&app, json!({ "name": "   ", "score": 0 })).await;
    assert_eq!(body["entries"][0]["name"], PLACEHOLDER_NAME);
}

#[actix_web::test]
async fn malformed_body_returns_400() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/leaderboard")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("{ score: ")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": messages::UNPROCESSABLE_REQUEST }));
}

#[actix_web::test]
async fn body_without_json_content_type_is_accepted() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/leaderboard")
            .insert_header((header::CONTENT_TYPE, "text/plain;charset=UTF-8"))
            .set_payload(r#"{"name":"Cy","score":"15"}"#)
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn oversized_body_returns_400() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let padding = "x".repeat(MAX_BODY_BYTES);
    let (status, body) = post_score(&app, json!({ "name": padding, "score": 1 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": messages::UNPROCESSABLE_REQUEST }));
    assert_eq!(get_board(&app).await, json!({ "entries": [] }));
}

#[actix_web::test]
async fn unsupported_method_returns_405() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(
        &app,
        test::TestRequest::delete().uri("/api/leaderboard").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": messages::METHOD_NOT_ALLOWED }));
}

#[actix_web::test]
async fn corrupt_store_recovers_as_empty() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.data_file().parent().unwrap()).unwrap();
    std::fs::write(fixture.data_file(), "not json at all").unwrap();
    let app = fixture.app().await;

    assert_eq!(get_board(&app).await, json!({ "entries": [] }));

    let (status, body) = post_score(&app, json!({ "name": "Ada", "score": 5 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn legacy_rows_are_served_ranked_and_unique() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.data_file().parent().unwrap()).unwrap();
    let legacy = [
        ("Ada", 1),
        ("Bob", 9),
        ("Cy", 3),
        ("ada", 7),
        ("Dee", 2),
        ("Eve", 8),
        ("Fay", 4),
    ];
    let rows: Vec<Value> = legacy
        .iter()
        .map(|(name, score)| {
            json!({ "name": name, "score": score, "submittedAt": "2024-01-01T00:00:00.000Z" })
        })
        .collect();
    std::fs::write(fixture.data_file(), serde_json::to_vec(&rows).unwrap()).unwrap();
    let app = fixture.app().await;

    let board = get_board(&app).await;
    let names: Vec<&str> = board["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob", "Eve", "ada", "Fay", "Cy"]);
}

#[actix_web::test]
async fn unwritable_store_returns_generic_500() {
    let fixture = Fixture::new();
    // A file where the data directory should be
    std::fs::write(fixture.dir.path().join("data"), "blocker").unwrap();
    let app = fixture.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/leaderboard").to_request()).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": messages::INTERNAL }));
}

#[actix_web::test]
async fn root_serves_index_document() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(test::read_body(resp).await, "<h1>Dust Time</h1>");
}

#[actix_web::test]
async fn nested_asset_served_with_content_type() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/js/game.js").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/javascript; charset=utf-8"
    );
}

#[actix_web::test]
async fn missing_asset_and_directory_return_404() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    for uri in ["/missing.png", "/js"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_web::test]
async fn traversal_outside_root_returns_400() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/%2e%2e/secret.txt").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::read_body(resp).await, messages::INVALID_PATH.as_bytes());
}

#[actix_web::test]
async fn health_check() {
    let fixture = Fixture::new();
    let app = fixture.app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
