mod support;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use imagi::{
    Grader,
    payload::{IdField, PayloadSchema},
    prompt::PromptTemplate,
    server::router,
};
use serde_json::{Value, json};
use support::{MockUpstream, Reply};
use tower::ServiceExt;

fn app(upstream: Arc<MockUpstream>, schema: PayloadSchema, trim: bool) -> Router {
    let grader = Grader::new(
        upstream,
        Arc::new(PromptTemplate::new(support::TEMPLATE).expect("template")),
        schema,
        trim,
        Duration::from_millis(200),
    );
    router(grader, "/imagi_gpt", "imagi_gpt")
}

fn user_schema() -> PayloadSchema {
    PayloadSchema {
        id_field:     IdField::UserId,
        require_task: true,
    }
}

fn body() -> Value {
    json!({
        "user_id": "alice",
        "task": "task-5",
        "read_me": "Implement a stack.",
        "source_files": [
            { "filename": "Stack.java", "content": "class Stack {}" },
            { "filename": "Main.java", "content": "class Main {}" }
        ],
        "test_results": "3 passed"
    })
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/imagi_gpt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn pass_reply_becomes_verdict() {
    let upstream = MockUpstream::new(Reply::Text("Pass: Great job"));
    let (status, json) = post(app(upstream.clone(), user_schema(), true), body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "student_id": "alice",
            "task": "task-5",
            "status": "Pass",
            "feedback": "Great job"
        })
    );
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn untrimmed_feedback_keeps_leading_space() {
    let upstream = MockUpstream::new(Reply::Text("Pass: Great job"));
    let (status, json) = post(app(upstream, user_schema(), false), body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["feedback"], " Great job");
}

#[tokio::test]
async fn prompt_carries_joined_fields_in_order() {
    let upstream = MockUpstream::new(Reply::Text("Fail AI Feedback: What does pop return?"));
    let (status, json) = post(app(upstream.clone(), user_schema(), true), body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Fail");

    let prompt = upstream.last_prompt().expect("prompt sent");
    assert_eq!(
        prompt,
        "README:Implement a stack.\nFILES:Stack.java, Main.java\nCODE:class Stack {}\n\nclass \
         Main {}\nTESTS:3 passed"
    );
}

#[tokio::test]
async fn reply_without_colon_is_malformed() {
    let upstream = MockUpstream::new(Reply::Text("Pass, nice work"));
    let (status, json) = post(app(upstream, user_schema(), true), body()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "detail": "Malformed upstream response." }));
}

#[tokio::test]
async fn empty_reply_is_malformed() {
    for reply in [Reply::Nothing, Reply::Text("")] {
        let upstream = MockUpstream::new(reply);
        let (status, json) = post(app(upstream, user_schema(), true), body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "Malformed upstream response.");
        assert!(json.get("status").is_none());
    }
}

#[tokio::test]
async fn unknown_status_is_malformed() {
    let upstream = MockUpstream::new(Reply::Text("Maybe: hard to say"));
    let (status, _) = post(app(upstream, user_schema(), true), body()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway_without_detail_leak() {
    let upstream = MockUpstream::new(Reply::Fail);
    let (status, json) = post(app(upstream.clone(), user_schema(), true), body()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json, json!({ "detail": "Upstream model request failed." }));
    assert!(!json.to_string().contains("secret"));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let upstream = MockUpstream::new(Reply::Hang);
    let (status, json) = post(app(upstream, user_schema(), true), body()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["detail"], "Upstream model request timed out.");
}

#[tokio::test]
async fn missing_source_files_never_reaches_upstream() {
    let upstream = MockUpstream::new(Reply::Text("Pass: ok"));
    let mut payload = body();
    payload.as_object_mut().unwrap().remove("source_files");

    let (status, json) = post(app(upstream.clone(), user_schema(), true), payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("source_files"));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn mistyped_field_is_rejected() {
    let upstream = MockUpstream::new(Reply::Text("Pass: ok"));
    let mut payload = body();
    payload["source_files"] = json!("Stack.java");

    let (status, _) = post(app(upstream.clone(), user_schema(), true), payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn configured_identity_key_is_required() {
    let schema = PayloadSchema {
        id_field:     IdField::StudentId,
        require_task: false,
    };

    let upstream = MockUpstream::new(Reply::Text("Pass: ok"));
    let (status, json) = post(app(upstream.clone(), schema, true), body()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"], "missing field `student_id`");
    assert_eq!(upstream.calls(), 0);

    let mut payload = body();
    let object = payload.as_object_mut().unwrap();
    object.remove("user_id");
    object.remove("task");
    object.insert("student_id".into(), json!("bob"));

    let (status, json) = post(app(upstream.clone(), schema, true), payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["student_id"], "bob");
    assert!(json.get("task").is_none());
}

#[tokio::test]
async fn missing_task_is_rejected_when_required() {
    let upstream = MockUpstream::new(Reply::Text("Pass: ok"));
    let mut payload = body();
    payload.as_object_mut().unwrap().remove("task");

    let (status, json) = post(app(upstream.clone(), user_schema(), true), payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"], "missing field `task`");
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn empty_source_files_are_allowed() {
    let upstream = MockUpstream::new(Reply::Text("Fail: Nothing was submitted."));
    let mut payload = body();
    payload["source_files"] = json!([]);

    let (status, json) = post(app(upstream, user_schema(), true), payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Fail");
}

#[tokio::test]
async fn health_reports_upstream() {
    let upstream = MockUpstream::new(Reply::Text("Pass: ok"));
    let response = app(upstream, user_schema(), true)
        .oneshot(
            Request::builder()
                .uri("/health")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["provider"], "mock");
    assert_eq!(json["model"], "mock-model");
}
