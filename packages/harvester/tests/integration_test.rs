//! End-to-end tests for the fetch pipeline against a mock listing API.

use std::sync::Arc;
use std::time::Duration;

use comment_harvester::reference::FixedOwnerResolver;
use comment_harvester::sink::{artifact_kind, load_comments};
use comment_harvester::{
    ArtifactKind, Credentials, Fetcher, HarvesterConfig, HarvesterError, NoProgress,
    PipelineKind, PipelineState, Position, Termination, WeiboClient,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/ajax/statuses/buildComments";

fn credentials() -> Credentials {
    Credentials::new("Mozilla/5.0 test", "SUB=abc", "https://weibo.com/")
}

fn comment_json(id: u64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "text_raw": text,
        "created_at": "Sat Oct 18 08:00:00 +0800 2025",
        "user": { "id": 42, "screen_name": "评论者" },
        "like_counts": 1
    })
}

fn fetcher(server: &MockServer, dir: &TempDir) -> Fetcher<WeiboClient> {
    let config = HarvesterConfig::builder()
        .api_base_url(server.uri())
        .output_dir(dir.path())
        .page_delay(Duration::ZERO)
        .build();
    let client = WeiboClient::new(&config).unwrap();
    Fetcher::new(client, &config).with_resolver(Arc::new(FixedOwnerResolver("456".into())))
}

#[tokio::test]
async fn test_two_page_thread_with_resolved_owner() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("id", "123"))
        .and(query_param("uid", "456"))
        .and(query_param("max_id", "0"))
        .and(header("cookie", "SUB=abc"))
        .and(header("user-agent", "Mozilla/5.0 test"))
        .and(header("referer", "https://weibo.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": 1,
            "data": [comment_json(1, "第一条"), comment_json(2, "second")],
            "max_id": 789
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("max_id", "789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": 1,
            "data": [],
            "max_id": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, &dir);
    let outcome = fetcher
        .fetch(
            "https://x.example/123?type=comment",
            &credentials(),
            &PipelineState::running(),
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.records, 2);

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact_kind(&artifact), Some(ArtifactKind::Full));
    let records = load_comments(&artifact).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].content, "第一条");
    assert_eq!(records[0].user_name, "评论者");
    assert_eq!(records[1].comment_id, "2");
}

#[tokio::test]
async fn test_server_error_is_fail_fast_and_checkpointed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("max_id", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [comment_json(1, "a"), comment_json(2, "b")],
            "max_id": "555"
        })))
        .mount(&server)
        .await;

    // Exactly one attempt: the fetch loop does not retry
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("max_id", "555"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, &dir);
    let outcome = fetcher
        .fetch(
            "https://weibo.com/detail?id=123&uid=456",
            &credentials(),
            &PipelineState::running(),
            &NoProgress,
        )
        .await
        .unwrap();

    assert!(matches!(outcome.termination, Termination::Failed(ref m) if m.contains("503")));
    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact_kind(&artifact), Some(ArtifactKind::Partial));
    assert_eq!(load_comments(&artifact).unwrap().len(), 2);

    let checkpoint = fetcher
        .checkpoints()
        .load(PipelineKind::Fetch)
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.source, "https://weibo.com/detail?id=123&uid=456");
    match checkpoint.position {
        Position::Cursor { thread, cursor } => {
            assert_eq!(thread.thread_id, "123");
            assert_eq!(cursor.request_token(), "555");
        }
        other => panic!("unexpected position {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credentials_makes_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, &dir);
    let err = fetcher
        .fetch(
            "https://weibo.com/detail?id=123&uid=456",
            &Credentials::new("ua", "", "r"),
            &PipelineState::running(),
            &NoProgress,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HarvesterError::MissingCredentials("cookie")));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
