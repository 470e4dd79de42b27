mod common;

use common::TestServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn send_json(
    server: &TestServer,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = server.http.request(method, server.url(path));
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.expect("request");
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get(server: &TestServer, path: &str) -> (StatusCode, Value) {
    send_json(server, reqwest::Method::GET, path, None).await
}

async fn post(server: &TestServer, path: &str, body: Value) -> (StatusCode, Value) {
    send_json(server, reqwest::Method::POST, path, Some(body)).await
}

async fn put(server: &TestServer, path: &str, body: Value) -> (StatusCode, Value) {
    send_json(server, reqwest::Method::PUT, path, Some(body)).await
}

async fn delete(server: &TestServer, path: &str) -> (StatusCode, Value) {
    send_json(server, reqwest::Method::DELETE, path, None).await
}

async fn create_post(server: &TestServer, body: Value) -> Value {
    let (status, post) = post(server, "/posts", body).await;
    assert_eq!(status, StatusCode::CREATED, "{post}");
    post
}

#[tokio::test]
async fn health_check() {
    let server = TestServer::start().await;
    let response = server
        .http
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn unknown_route_returns_error_body() {
    let server = TestServer::start().await;
    let (status, body) = get(&server, "/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/api/nothing-here"));
}

#[tokio::test]
async fn create_post_estimates_reading_time_and_stores_tags() {
    let server = TestServer::start().await;
    let post = create_post(
        &server,
        json!({ "title": "Hello", "tags": ["x", "y"], "content": "字".repeat(250) }),
    )
    .await;

    assert_eq!(post["slug"], "hello");
    assert_eq!(post["readingTime"], 2);
    assert_eq!(post["tags"], json!(["x", "y"]));
    assert_eq!(post["views"], 0);
    assert_eq!(post["published"], false);

    let (status, fetched) = get(&server, &format!("/posts/{}", post["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["tags"], json!(["x", "y"]));
}

#[tokio::test]
async fn duplicate_tags_are_dropped_on_create() {
    let server = TestServer::start().await;
    let post = create_post(
        &server,
        json!({ "title": "Tags", "tags": ["rust", " rust ", "", "web"] }),
    )
    .await;
    assert_eq!(post["tags"], json!(["rust", "web"]));
    assert_eq!(post["readingTime"], 1);
}

#[tokio::test]
async fn post_validation_and_conflicts() {
    let server = TestServer::start().await;

    let (status, body) = post(&server, "/posts", json!({ "title": "  " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Title is required");

    let (status, body) = get(&server, "/posts/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    create_post(&server, json!({ "title": "Same" })).await;
    let (status, _) = post(&server, "/posts", json!({ "title": "Same" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_recomputes_reading_time() {
    let server = TestServer::start().await;
    let post = create_post(&server, json!({ "title": "Short", "content": "hi" })).await;
    assert_eq!(post["readingTime"], 1);

    let long = vec!["word"; 450].join(" ");
    let (status, updated) = put(
        &server,
        &format!("/posts/{}", post["id"]),
        json!({ "content": format!("<p>{long}</p>"), "tags": ["a"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["readingTime"], 3);
    assert_eq!(updated["tags"], json!(["a"]));
    assert_eq!(updated["title"], "Short");

    let (status, _) = put(&server, "/posts/999", json!({ "title": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_view_counts_each_load() {
    let server = TestServer::start().await;
    create_post(&server, json!({ "title": "Public", "published": true })).await;
    create_post(&server, json!({ "title": "Draft" })).await;

    let (status, first) = get(&server, "/public/posts/public").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["views"], 1);
    let (_, second) = get(&server, "/public/posts/public").await;
    assert_eq!(second["views"], 2);

    let (status, _) = get(&server, "/public/posts/draft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_posts_paginates_and_filters() {
    let server = TestServer::start().await;
    create_post(&server, json!({ "title": "Rust one", "tags": ["rust"], "published": true })).await;
    create_post(&server, json!({ "title": "Rust two", "tags": ["rust", "web"] })).await;
    create_post(&server, json!({ "title": "Cooking", "tags": ["food"], "published": true })).await;

    let (status, page) = get(&server, "/posts?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "totalPages": 2 })
    );

    let (_, page_two) = get(&server, "/posts?limit=2&page=2").await;
    assert_eq!(page_two["items"].as_array().unwrap().len(), 1);

    let (_, tagged) = get(&server, "/posts?tag=rust").await;
    assert_eq!(tagged["pagination"]["total"], 2);

    let (_, published) = get(&server, "/posts?published=true&tag=rust").await;
    assert_eq!(published["pagination"]["total"], 1);
    assert_eq!(published["items"][0]["title"], "Rust one");

    let (_, searched) = get(&server, "/posts?search=cook").await;
    assert_eq!(searched["pagination"]["total"], 1);
}

#[tokio::test]
async fn delete_post_removes_it() {
    let server = TestServer::start().await;
    let post = create_post(&server, json!({ "title": "Gone" })).await;
    let path = format!("/posts/{}", post["id"]);

    let (status, body) = delete(&server, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "id": post["id"] }));

    let (status, _) = delete(&server, &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn related_posts_are_ranked() {
    let server = TestServer::start().await;
    let current = create_post(
        &server,
        json!({ "title": "Current", "tags": ["rust", "web"], "published": true }),
    )
    .await;
    create_post(&server, json!({ "title": "Learning Rust", "published": true })).await;
    create_post(&server, json!({ "title": "Beta", "tags": ["rust"], "published": true })).await;
    create_post(
        &server,
        json!({ "title": "Alpha", "tags": ["web", "rust"], "published": true }),
    )
    .await;
    create_post(&server, json!({ "title": "Hidden", "tags": ["rust", "web"] })).await;
    create_post(&server, json!({ "title": "Other", "published": true })).await;

    let (status, related) = get(&server, &format!("/posts/{}/related", current["id"])).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = related["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Alpha", "Beta", "Learning Rust"]);

    let (_, limited) = get(&server, &format!("/posts/{}/related?limit=1", current["id"])).await;
    assert_eq!(limited["items"].as_array().unwrap().len(), 1);

    let (status, _) = get(&server, "/posts/999/related").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tags_are_counted_over_published_posts() {
    let server = TestServer::start().await;
    create_post(&server, json!({ "title": "One", "tags": ["rust", "web"], "published": true })).await;
    create_post(&server, json!({ "title": "Two", "tags": ["rust"], "published": true })).await;
    create_post(&server, json!({ "title": "Three", "tags": ["draft"] })).await;

    let (status, body) = get(&server, "/tags").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["tags"],
        json!([{ "tag": "rust", "count": 2 }, { "tag": "web", "count": 1 }])
    );
}

#[tokio::test]
async fn pages_crud() {
    let server = TestServer::start().await;
    let (status, page) = post(
        &server,
        "/pages",
        json!({ "title": "About us", "content": "<p>hi</p>", "template": "landing" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(page["slug"], "about-us");
    assert_eq!(page["template"], "landing");

    let path = format!("/pages/{}", page["id"]);
    let (status, updated) = put(&server, &path, json!({ "published": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["published"], true);
    assert_eq!(updated["template"], "landing");

    let (_, list) = get(&server, "/pages").await;
    assert_eq!(list["pagination"]["total"], 1);

    let (status, _) = post(&server, "/pages", json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = delete(&server, &path).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&server, &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_wait_for_moderation() {
    let server = TestServer::start().await;
    let commented = create_post(&server, json!({ "title": "Commented", "published": true })).await;
    let post_id = commented["id"].as_i64().unwrap();

    let (status, comment) = post(
        &server,
        "/comments",
        json!({ "postId": post_id, "content": "Nice", "author": "Sam", "email": "sam@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["published"], false);

    let (_, visible) = get(&server, &format!("/comments?postId={post_id}&published=true")).await;
    assert_eq!(visible["pagination"]["total"], 0);

    let (status, approved) = put(
        &server,
        &format!("/comments/{}", comment["id"]),
        json!({ "published": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["published"], true);

    let (_, visible) = get(&server, &format!("/comments?postId={post_id}&published=true")).await;
    assert_eq!(visible["pagination"]["total"], 1);

    let (status, _) = post(
        &server,
        "/comments",
        json!({ "postId": post_id, "content": "Nice", "author": "Sam", "email": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &server,
        "/comments",
        json!({ "postId": 999, "content": "Nice", "author": "Sam", "email": "sam@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting the post takes its comments with it
    delete(&server, &format!("/posts/{post_id}")).await;
    let (_, all) = get(&server, "/comments").await;
    assert_eq!(all["pagination"]["total"], 0);
}

#[tokio::test]
async fn users_have_unique_emails() {
    let server = TestServer::start().await;
    let (status, user) = post(
        &server,
        "/users",
        json!({ "name": "Ada", "email": "Ada@Example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["accountsCount"], 0);
    assert_eq!(user["sessionsCount"], 0);
    assert_eq!(user["emailVerified"], Value::Null);

    let (status, body) = post(&server, "/users", json!({ "email": "ada@example.com" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    let (status, _) = post(&server, "/users", json!({ "email": "nope" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let path = format!("/users/{}", user["id"]);
    assert_eq!(delete(&server, &path).await.0, StatusCode::OK);
    assert_eq!(delete(&server, &path).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_upload_and_delete() {
    let server = TestServer::start().await;
    let part = reqwest::multipart::Part::bytes(b"hello world".to_vec()).file_name("notes.txt");
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("alt", "Some notes");
    let response = server
        .http
        .post(server.url("/media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let item: Value = response.json().await.unwrap();

    assert_eq!(item["originalName"], "notes.txt");
    assert_eq!(item["mimetype"], "text/plain");
    assert_eq!(item["size"], 11);
    assert_eq!(item["alt"], "Some notes");
    let filename = item["filename"].as_str().unwrap();
    assert!(filename.ends_with(".txt"));
    assert_eq!(item["url"], format!("/uploads/{filename}"));
    let stored = server.upload_dir().join(filename);
    assert_eq!(std::fs::read(&stored).unwrap(), b"hello world");

    let (_, list) = get(&server, "/media").await;
    assert_eq!(list["pagination"]["total"], 1);

    let (status, _) = delete(&server, &format!("/media/{}", item["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!stored.exists());
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let server = TestServer::start().await;
    let form = reqwest::multipart::Form::new().text("alt", "nothing");
    let response = server
        .http
        .post(server.url("/media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analytics_events_feed_stats() {
    let server = TestServer::start().await;
    for (session, path) in [("s1", "/"), ("s1", "/about"), ("s2", "/")] {
        let (status, event) = post(
            &server,
            "/analytics/events",
            json!({ "sessionId": session, "type": "page_view", "path": path }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(event["timestamp"].as_i64().unwrap() > 0);
    }
    post(
        &server,
        "/analytics/events",
        json!({ "sessionId": "s2", "type": "search", "query": "rust", "results": 3 }),
    )
    .await;

    let (status, stats) = get(&server, "/analytics/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalViews"], 3);
    assert_eq!(stats["uniqueSessions"], 2);
    assert_eq!(stats["topPages"][0], json!({ "name": "/", "count": 2 }));
    assert_eq!(stats["topSearches"], json!([{ "name": "rust", "count": 1 }]));

    let daily = stats["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 30);
    assert_eq!(daily[29]["views"], 3);
    assert_eq!(daily[29]["uniqueSessions"], 2);

    let (status, _) = post(
        &server,
        "/analytics/events",
        json!({ "sessionId": "", "type": "page_view", "path": "/" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn escaped_markup_does_not_hide_text_from_reading_time() {
    let server = TestServer::start().await;
    let content = format!("<p>if a &lt; b then</p><p>{}</p>", "word ".repeat(300));
    let post = create_post(&server, json!({ "title": "Comparisons", "content": content })).await;
    assert_eq!(post["readingTime"], 2);

    let (_, updated) = put(
        &server,
        &format!("/posts/{}", post["id"]),
        json!({ "content": format!("<pre>x &lt; 1</pre>{}", "word ".repeat(450)) }),
    )
    .await;
    assert_eq!(updated["readingTime"], 3);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let server = TestServer::start().await;

    let response = server
        .http
        .post(server.url("/posts"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let (status, body) = get(&server, "/posts/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = get(&server, "/posts?limit=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = post(&server, "/comments", json!({ "content": "no post id" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let response = server
        .http
        .post(server.url("/media"))
        .body("plain")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
