//! Built-in tools dispatched through the server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use stepmcp_core::{
    Content, CreateMessageRequest, CreateMessageResult, ErrorKind, LogLevel, McpResult,
    RequestContext, Role, SAMPLING_NOT_SUPPORTED, Sampler, ServerNotification,
};
use stepmcp_server::tools::{SPACES_ANSWER, TABS_ANSWER};
use stepmcp_server::{Server, ServerConfig, ToolArguments, UNSUPPORTED_PROGRESS_RESPONSE, UnsupportedProgress};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn server() -> Server {
    Server::builder().build().unwrap()
}

fn drain(rx: &mut mpsc::Receiver<ServerNotification>) -> Vec<ServerNotification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

#[tokio::test]
async fn the_answer_defaults_to_java() {
    let server = server();
    let (ctx, mut rx) = server.request_context("answer-1");

    let result = server
        .call_tool("theAnswer", ToolArguments::new(), ctx)
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some(SPACES_ANSWER));

    let logged = drain(&mut rx);
    assert_eq!(logged.len(), 1);
    match &logged[0] {
        ServerNotification::Message(entry) => {
            assert_eq!(entry.level, LogLevel::Info);
            assert_eq!(entry.logger.as_deref(), Some("theAnswer"));
            assert_eq!(
                entry.data,
                json!("Let's try to answer the question for lang: Java")
            );
        }
        other => panic!("unexpected notification {:?}", other),
    }
}

#[tokio::test]
async fn the_answer_prefers_tabs_for_python() {
    let server = server();
    for lang in ["python", "Python", "PYTHON"] {
        let result = server
            .call_tool_json("theAnswer", json!({ "lang": lang }), RequestContext::new())
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some(TABS_ANSWER));
    }

    let result = server
        .call_tool_json("theAnswer", json!({ "lang": "Rust" }), RequestContext::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some(SPACES_ANSWER));
}

#[tokio::test]
async fn the_answer_rejects_non_string_lang() {
    let err = server()
        .call_tool_json("theAnswer", json!({ "lang": 42 }), RequestContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParams);
}

#[derive(Default)]
struct RecordingSampler {
    seen: Mutex<Vec<CreateMessageRequest>>,
}

#[async_trait]
impl Sampler for RecordingSampler {
    async fn create_message(&self, request: CreateMessageRequest) -> McpResult<CreateMessageResult> {
        let topic = request.messages[0].content.as_text().unwrap_or_default().to_string();
        self.seen.lock().push(request);
        Ok(CreateMessageResult {
            role: Role::Assistant,
            content: Content::text(format!("Here is more: {}", topic)),
            model: "test-model".to_string(),
            stop_reason: None,
        })
    }
}

#[tokio::test]
async fn sampling_sends_topic_prompt() {
    let sampler = Arc::new(RecordingSampler::default());
    let ctx = RequestContext::new().with_sampler(sampler.clone());

    let result = server()
        .call_tool_json("justTestSampling", json!({ "topic": "Rust" }), ctx)
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Here is more: Tell me more about Rust"));

    let seen = sampler.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].max_tokens, Some(100));
    assert_eq!(seen[0].messages.len(), 1);
    assert_eq!(seen[0].messages[0].role, Role::User);
}

#[tokio::test]
async fn sampling_without_support_fails() {
    let err = server()
        .call_tool_json("justTestSampling", json!({ "topic": "Rust" }), RequestContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CapabilityNotSupported);
    assert_eq!(err.message, SAMPLING_NOT_SUPPORTED);
}

#[tokio::test(start_paused = true)]
async fn long_running_reports_ten_steps() {
    let server = server();
    let (ctx, mut rx) = server.request_context("long-1");
    let ctx = ctx.with_progress_token("long-1");

    let result = server
        .call_tool("longRunning", ToolArguments::new(), ctx)
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("ok"));

    let messages: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            ServerNotification::Progress(p) => p.message,
            ServerNotification::Message(_) => None,
        })
        .collect();
    let expected: Vec<String> = (1..=10)
        .map(|i| format!("Long running progress: {}", i))
        .collect();
    assert_eq!(messages, expected);
}

#[tokio::test(start_paused = true)]
async fn long_running_without_token_skips_work() {
    let server = server();
    let (ctx, mut rx) = server.request_context("long-2");
    let started = tokio::time::Instant::now();

    let result = server
        .call_tool("longRunning", ToolArguments::new(), ctx)
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some(UNSUPPORTED_PROGRESS_RESPONSE));
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn long_running_can_run_silently() {
    let config = ServerConfig::builder()
        .long_running(3, Duration::from_millis(100))
        .unsupported_progress(UnsupportedProgress::RunSilently)
        .build();
    let server = Server::builder().config(config).build().unwrap();
    let (ctx, mut rx) = server.request_context("long-3");

    let result = server
        .call_tool("longRunning", ToolArguments::new(), ctx)
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("ok"));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn request_cancellation_stops_long_running() {
    let server = server();
    let token = CancellationToken::new();
    let (ctx, _rx) = server.request_context("long-4");
    let ctx = ctx
        .with_progress_token("long-4")
        .with_cancellation_token(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        token.cancel();
    });

    let err = server
        .call_tool("longRunning", ToolArguments::new(), ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    canceller.await.unwrap();
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let err = server()
        .call_tool("nope", ToolArguments::new(), RequestContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ToolNotFound);
}
