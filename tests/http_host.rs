//! The axum host driving intercepted applications end to end.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use tokio::sync::oneshot;
use tower::ServiceExt;

use ddmiddleware::app::{self, AppBody, AppError};
use ddmiddleware::{HttpServer, Interceptor, MiddlewareConfig};

mod common;
use common::{plain_text, RecordingSink, Script, ScriptedApp};

fn server_for(script: Script, sink: Arc<RecordingSink>) -> HttpServer {
    let interceptor = Interceptor::with_sink(ScriptedApp::new(script), sink).with_host("test-host");
    HttpServer::new(interceptor, MiddlewareConfig::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_successful_response_streams_through() {
    let sink = RecordingSink::new();
    let server = server_for(Script::ok(vec!["hello ", "world"]), sink.clone());

    let response = server.router().oneshot(get("/greeting")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(body_text(response.into_body()).await, "hello world");
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_failure_before_output_renders_500() {
    let sink = RecordingSink::new();
    let mut script = Script::failing_after(Vec::new(), "ValueError", "boom");
    script.status = None;
    let server = server_for(script, sink.clone());

    let response = server.router().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(body_text(response.into_body()).await, "Internal Server Error");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Internal Server Error (ValueError: boom)");
    assert_eq!(events[0].host, "test-host");
}

#[tokio::test]
async fn test_failure_after_start_but_before_output_renders_500() {
    let sink = RecordingSink::new();
    let server = server_for(Script::failing_after(Vec::new(), "ValueError", "boom"), sink.clone());

    let response = server.router().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_failure_mid_stream_aborts_body() {
    let sink = RecordingSink::new();
    let server = server_for(Script::failing_after(vec!["partial"], "ValueError", "boom"), sink.clone());

    let response = server.router().oneshot(get("/")).await.unwrap();

    // The head went out with the first chunk; the failure can only cut the body.
    assert_eq!(response.status(), StatusCode::OK);
    let result = axum::body::to_bytes(response.into_body(), usize::MAX).await;
    assert!(result.is_err());
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_panic_before_output_renders_500() {
    let sink = RecordingSink::new();
    let mut script = Script::panicking_after(Vec::new(), "handler crashed");
    script.fail_on_call = true;
    let server = server_for(script, sink.clone());

    let response = server.router().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response.into_body()).await, "Internal Server Error");
    assert_eq!(
        sink.events()[0].title,
        "Internal Server Error (Panic: handler crashed)"
    );
}

#[tokio::test]
async fn test_request_environment_reaches_application() {
    let app = app::from_fn(|ctx, start| async move {
        start.start("200 OK", &[plain_text()])?;
        let line = format!(
            "{} {}?{} {}",
            ctx.get("REQUEST_METHOD").unwrap_or_default(),
            ctx.get("PATH_INFO").unwrap_or_default(),
            ctx.get("QUERY_STRING").unwrap_or_default(),
            String::from_utf8_lossy(ctx.input()),
        );
        Ok::<_, AppError>(AppBody::from_chunks([line]))
    });
    let server = HttpServer::new(
        Interceptor::with_sink(app, RecordingSink::new()),
        MiddlewareConfig::default(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/echo?x=1")
        .body(Body::from("payload"))
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response.into_body()).await, "POST /echo?x=1 payload");
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_the_application() {
    let sink = RecordingSink::new();
    let app = ScriptedApp::new(Script::ok(vec!["never"]));
    let calls = app.calls.clone();

    let mut config = MiddlewareConfig::default();
    config.listener.max_body_bytes = 4;
    let server = HttpServer::new(Interceptor::with_sink(app, sink.clone()), config);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(Bytes::from_static(b"0123456789")))
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_served_over_tcp() {
    let sink = RecordingSink::new();
    let app = app::from_fn(|ctx, start| async move {
        if ctx.get("PATH_INFO") == Some("/fail") {
            return Err(AppError::new("RuntimeError", "requested failure"));
        }
        start.start("200 OK", &[plain_text()])?;
        Ok::<_, AppError>(AppBody::from_chunks(["ok"]))
    });
    let server = HttpServer::new(Interceptor::with_sink(app, sink.clone()), MiddlewareConfig::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run(listener, async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client.get(format!("http://{addr}/fail")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(sink.events().len(), 1);
    assert_eq!(
        sink.events()[0].title,
        "Internal Server Error (RuntimeError: requested failure)"
    );

    let _ = stop_tx.send(());
    handle.await.unwrap().unwrap();
}
