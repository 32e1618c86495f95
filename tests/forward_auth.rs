//! Forward auth middleware against a mocked auth upstream.

use axum::{http::HeaderMap, routing::get, Router};
use servekit::http::ForwardAuth;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

mod common;

use common::client;

/// Echo the `Remote-User` header seen by the application.
async fn whoami(headers: HeaderMap) -> String {
    headers
        .get("remote-user")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<none>")
        .to_string()
}

fn app() -> Router {
    Router::new().route("/", get(whoami)).route("/{*rest}", get(whoami))
}

fn auth_for(url: &str) -> ForwardAuth {
    ForwardAuth::new(url, "app.example.com")
        .unwrap()
        .with_http_client(client())
}

async fn serve(auth: ForwardAuth) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = auth.wrap(app());
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{addr}")
}

#[tokio::test]
async fn allowed_request_reaches_handler_with_remote_user() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).insert_header("Remote-User", "alice"))
        .expect(1)
        .mount(&upstream)
        .await;

    let auth = auth_for(&format!("{}/auth", upstream.uri()));
    let base = serve(auth).await;

    let response = client().get(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "alice");
}

#[tokio::test]
async fn forwarded_headers_describe_the_original_request() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-forwarded-method", "GET"))
        .and(header("x-forwarded-proto", "http"))
        .and(header("x-forwarded-host", "app.example.com"))
        .and(header("x-forwarded-uri", "/orders/7?expand=items"))
        .and(header("user-agent", "integration-test"))
        .and(header("cookie", "session=abc"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let auth = auth_for(&upstream.uri());
    let base = serve(auth).await;

    let response = client()
        .get(format!("{base}/orders/7?expand=items"))
        .header("x-forwarded-proto", "http")
        .header("user-agent", "integration-test")
        .header("cookie", "session=abc")
        .header("authorization", "Bearer token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn proto_defaults_to_https() {
    let upstream = MockServer::start().await;
    Mock::given(header("x-forwarded-proto", "https"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let auth = auth_for(&upstream.uri());
    let base = serve(auth).await;

    let response = client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn denial_is_relayed_verbatim() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_raw(r#"{"error":"login required"}"#, "application/json"),
        )
        .mount(&upstream)
        .await;

    let auth = auth_for(&upstream.uri());
    let base = serve(auth).await;

    let response = client().get(format!("{base}/private")).send().await.unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.text().await.unwrap(), r#"{"error":"login required"}"#);
}

#[tokio::test]
async fn forbidden_from_upstream_is_relayed() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&upstream)
        .await;

    let auth = auth_for(&upstream.uri());
    let base = serve(auth).await;

    let response = client().get(format!("{base}/admin")).send().await.unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await.unwrap(), "forbidden");
}

#[tokio::test]
async fn spoofed_remote_user_is_removed() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    let auth = auth_for(&upstream.uri());
    let base = serve(auth).await;

    let response = client()
        .get(format!("{base}/whoami"))
        .header("remote-user", "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "<none>");
}

#[tokio::test]
async fn unreachable_upstream_is_a_server_error() {
    // Bind then drop to get a port nothing listens on.
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let auth = auth_for(&format!("http://{addr}/auth"));
    let base = serve(auth).await;

    let response = client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn custom_client_is_used() {
    let upstream = MockServer::start().await;
    Mock::given(header_exists("x-custom"))
        .respond_with(|request: &Request| {
            let user = request
                .headers
                .get("x-custom")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ResponseTemplate::new(200).insert_header("Remote-User", user.as_str())
        })
        .mount(&upstream)
        .await;

    let mut defaults = reqwest::header::HeaderMap::new();
    defaults.insert("x-custom", "bob".parse().unwrap());
    let http_client = reqwest::Client::builder()
        .no_proxy()
        .default_headers(defaults)
        .build()
        .unwrap();

    let auth = ForwardAuth::new(&upstream.uri(), "app.example.com")
        .unwrap()
        .with_http_client(http_client);
    let base = serve(auth).await;

    let response = client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.text().await.unwrap(), "bob");
}
