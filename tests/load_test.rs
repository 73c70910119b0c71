//! End-to-end tests: the demo app behind `HttpServer`, over real sockets.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use lightway::app::build_router;
use lightway::client::{CallContext, ClientError, HttpClient};
use lightway::config::{AppConfig, ServerConfig};
use lightway::http::HttpServer;
use lightway::lifecycle::Shutdown;
use lightway::notifier::{Notifier, TelegramNotifier};
use lightway::observability::Logger;
use lightway::routing::Router;
use reqwest::Method;
use tokio::task::JoinHandle;

mod common;

async fn spawn_server(
    config: ServerConfig,
    app: axum::Router,
) -> (SocketAddr, Shutdown, JoinHandle<std::io::Result<()>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stopped = shutdown.signal();
    let server = HttpServer::new(config, app);
    let handle = tokio::spawn(async move { server.run(listener, stopped).await });
    (addr, shutdown, handle)
}

async fn spawn_demo() -> (SocketAddr, Shutdown, JoinHandle<std::io::Result<()>>) {
    let app = build_router(&AppConfig::default(), Logger::current())
        .unwrap()
        .into_axum();
    spawn_server(ServerConfig::default(), app).await
}

#[tokio::test]
async fn test_concurrent_requests() {
    let (addr, shutdown, server) = spawn_demo().await;

    let concurrency = 20;
    let requests_per_task = 25;
    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{addr}/health");
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() && res.headers().contains_key("x-request-id") {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        succeeded += task.await.unwrap();
    }
    let elapsed = start.elapsed();
    println!(
        "{} requests in {:?} ({:.0} req/s)",
        concurrency * requests_per_task,
        elapsed,
        (concurrency * requests_per_task) as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(succeeded, concurrency * requests_per_task);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_before_server_starts() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = Shutdown::new();
    let stopped = shutdown.signal();
    shutdown.trigger();

    let server = HttpServer::new(ServerConfig::default(), Router::new().into_axum());
    tokio::time::timeout(Duration::from_secs(5), server.run(listener, stopped))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_client_against_demo_server() {
    let (addr, shutdown, _server) = spawn_demo().await;
    let client = HttpClient::new();
    let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
    let no_headers: [(&str, &str); 0] = [];

    let body = client
        .request_bytes(
            &ctx,
            Method::POST,
            &format!("http://{addr}/api/v1/echo"),
            &serde_json::json!({"n": 1}),
            no_headers,
        )
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["data"], serde_json::json!({"n": 1}));

    let err = client
        .request_bytes(&ctx, Method::GET, &format!("http://{addr}/api/v1/users/99"), &(), no_headers)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    let value: serde_json::Value = serde_json::from_slice(err.body().unwrap()).unwrap();
    assert_eq!(value["error"], "user not found");

    shutdown.trigger();
}

#[tokio::test]
async fn test_cors_preflight_over_the_wire() {
    let (addr, shutdown, _server) = spawn_demo().await;
    let res = reqwest::Client::new()
        .request(Method::OPTIONS, format!("http://{addr}/api/v1/echo"))
        .header("Origin", "http://app.example")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-origin"], "http://app.example");
    assert_eq!(res.headers()["vary"], "Origin");
    shutdown.trigger();
}

#[tokio::test]
async fn test_request_timeout() {
    let router = Router::new();
    router.get("/slow", |c| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            c.write("late");
            Ok(())
        })
    });
    let config = ServerConfig {
        request_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let (addr, shutdown, _server) = spawn_server(config, router.into_axum()).await;

    let res = reqwest::get(format!("http://{addr}/slow")).await.unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    shutdown.trigger();
}

#[tokio::test]
async fn test_telegram_notifier_posts_message() {
    let backend = common::start_programmable_backend(|_| (200, r#"{"ok":true}"#.to_string())).await;
    let notifier = TelegramNotifier::new(HttpClient::new(), "fake-token", "12345")
        .with_base_url(backend.url(""));

    notifier.send("hello world").await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/botfake-token/sendMessage");
    let payload: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(payload, serde_json::json!({"chat_id": "12345", "text": "hello world"}));
}

#[tokio::test]
async fn test_telegram_api_error() {
    let backend = common::start_programmable_backend(|_| {
        (400, r#"{"ok":false,"description":"Bad Request"}"#.to_string())
    })
    .await;
    let notifier = TelegramNotifier::new(HttpClient::new(), "fake-token", "12345")
        .with_base_url(backend.url(""));

    let err = notifier.send("test").await.unwrap_err();
    assert!(err.to_string().contains("failed to send telegram request"));
}
