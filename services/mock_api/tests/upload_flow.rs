//! End-to-end upload scenarios driven through the router, on tokio's
//! paused clock so the state sequence elapses instantly.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use bytes::Bytes;
use mock_api_lib::config::Config;
use mock_api_lib::web::{router, state::AppState};
use quiz_pipeline_core::SequenceKind;
use serde_json::{json, Value};

fn server_with(config: Config) -> TestServer {
    TestServer::new(router(Arc::new(AppState::in_memory(config)))).unwrap()
}

fn server() -> TestServer {
    server_with(Config::default())
}

async fn session(server: &TestServer, id: &str) -> Value {
    server
        .get("/rest/v1/resource_sessions")
        .add_query_param("id", format!("eq.{id}"))
        .await
        .json::<Value>()
}

async fn upload(server: &TestServer, path: &str) -> StatusCode {
    server
        .put(path)
        .content_type("application/pdf")
        .bytes(Bytes::from_static(b"%PDF-1.4 mock"))
        .await
        .status_code()
}

#[tokio::test(start_paused = true)]
async fn upload_walks_to_completed_with_generated_questions() {
    let server = server();

    assert_eq!(upload(&server, "/uploads/2024-01-01/job-123/doc.pdf").await, StatusCode::OK);

    let fresh = session(&server, "job-123").await;
    assert_eq!(fresh["status"], "processing");
    assert_eq!(fresh["file_path"], "uploads/2024-01-01/job-123/doc.pdf");
    assert_eq!(fresh["name"], "doc.pdf");
    assert_eq!(fresh["topic_page_range"]["topics"].as_array().unwrap().len(), 10);

    // Four 2s steps separate processing from completed.
    tokio::time::sleep(Duration::from_millis(7_900)).await;
    assert_eq!(session(&server, "job-123").await["status"], "ai_processing");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let done = session(&server, "job-123").await;
    assert_eq!(done["status"], "completed");
    let history: Vec<&str> = done["status_history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        history,
        ["processing", "decoding", "ocr_completed", "ai_processing", "completed"]
    );

    let questions = server
        .get("/rest/v1/resource_session_questions")
        .add_query_param("resource_session_id", "eq.job-123")
        .await
        .json::<Vec<Value>>();
    assert_eq!(questions.len(), 100);
    let not_sample = questions.iter().filter(|q| q["is_sample"] == false).count();
    assert_eq!(not_sample, 25);
    for question in &questions {
        let correct = question["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["is_correct"] == true)
            .count();
        assert_eq!(correct, 1);
    }

    let domains = server
        .get("/rest/v1/resource_session_domains")
        .add_query_param("resource_session_id", "eq.job-123")
        .await
        .json::<Vec<Value>>();
    assert_eq!(domains.len(), 10);
    assert_eq!(domains[0]["page_range_start"], 1);
}

#[tokio::test(start_paused = true)]
async fn file_path_lookup_matches_id_lookup() {
    let server = server();
    upload(&server, "/uploads/2024-01-01/job-7/notes.pdf").await;

    let by_path = server
        .get("/rest/v1/resource_sessions")
        .add_query_param("file_path", "eq.uploads/2024-01-01/job-7/notes.pdf")
        .await
        .json::<Value>();
    assert_eq!(by_path, session(&server, "job-7").await);
}

#[tokio::test(start_paused = true)]
async fn reupload_to_the_same_path_is_skipped() {
    let server = server();
    upload(&server, "/uploads/2024-01-01/job-123/doc.pdf").await;
    tokio::time::sleep(Duration::from_millis(2_100)).await;

    assert_eq!(upload(&server, "/uploads/2024-01-01/job-123/doc.pdf").await, StatusCode::OK);

    let current = session(&server, "job-123").await;
    assert_eq!(current["status"], "decoding");
    assert_eq!(current["status_history"].as_array().unwrap().len(), 2);

    let questions = server
        .get("/rest/v1/resource_session_questions")
        .add_query_param("resource_session_id", "eq.job-123")
        .await
        .json::<Vec<Value>>();
    assert_eq!(questions.len(), 100);
}

#[tokio::test(start_paused = true)]
async fn presigned_upload_carries_repository_and_content_type() {
    let server = server();
    let repository = server
        .post("/rest/v1/resource_repositories")
        .await
        .json::<Value>();
    let repository_id = repository["id"].as_str().unwrap().to_string();

    let presign = server
        .post("/presign")
        .json(&json!({
            "filename": "course/lecture.pdf",
            "contentType": "application/x-pdf",
            "resource_repository_id": repository_id,
        }))
        .await;
    assert_eq!(presign.status_code(), StatusCode::OK);
    let presign = presign.json::<Value>();
    let key = presign["key"].as_str().unwrap();
    let job_id = presign["jobId"].as_str().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with(&format!("/{job_id}/lecture.pdf")));
    assert_eq!(presign["uploadUrl"], format!("http://localhost:3001/{key}"));
    assert_eq!(presign["resource_repository_id"], repository_id.as_str());

    upload(&server, &format!("/{key}")).await;

    let created = session(&server, job_id).await;
    assert_eq!(created["mime_type"], "application/x-pdf");
    assert_eq!(created["name"], "lecture.pdf");
    assert_eq!(created["resource_repository_id"], repository_id.as_str());
    assert_eq!(created["url"], format!("http://localhost:3001/{key}"));

    let in_repository = server
        .get("/rest/v1/resource_sessions")
        .add_query_param("resource_repository_id", format!("eq.{repository_id}"))
        .await
        .json::<Vec<Value>>();
    assert_eq!(in_repository.len(), 1);

    let counted = server
        .get("/rest/v1/resource_session_questions")
        .add_query_param("resource_repository_id", format!("eq.{repository_id}"))
        .add_query_param("is_sample", "eq.false")
        .add_header(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("count=exact"),
        )
        .await;
    assert_eq!(counted.header("content-range").to_str().unwrap(), "0-24/25");
    assert!(counted.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn presign_without_a_body_uses_defaults() {
    let server = server();
    let presign = server.post("/presign").await.json::<Value>();
    assert!(presign["key"].as_str().unwrap().ends_with("/document.pdf"));
    assert_eq!(presign["resource_repository_id"], Value::Null);
}

#[tokio::test(start_paused = true)]
async fn detailed_sequence_reports_pages_and_batches() {
    let server = server_with(Config {
        state_sequence: SequenceKind::Detailed,
        ..Config::default()
    });
    upload(&server, "/uploads/2024-01-01/job-9/book.pdf").await;

    let fresh = session(&server, "job-9").await;
    let pages = fresh["topic_page_range"]["topics"]
        .as_array()
        .unwrap()
        .last()
        .unwrap()["end"]
        .as_u64()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(
        session(&server, "job-9").await["status"],
        format!("ocr_page_1_of_{pages}")
    );

    // Upper bound of the chain: 70 pages, 4 batches, 400ms a step.
    tokio::time::sleep(Duration::from_secs(40)).await;
    let done = session(&server, "job-9").await;
    assert_eq!(done["status"], "completed");

    let history = done["status_history"].as_array().unwrap();
    assert_eq!(history.len(), 1 + pages as usize + 3 + 4 + 1);
    assert!(history.iter().any(|e| e["status"] == "ai_topics_identified"));
    assert!(history.iter().any(|e| e["status"] == "ai_batch_4_of_4"));
}

#[tokio::test(start_paused = true)]
async fn failing_a_session_stops_its_sequence() {
    let server = server();
    upload(&server, "/uploads/2024-01-01/job-5/doc.pdf").await;

    let patched = server
        .patch("/rest/v1/resource_sessions")
        .add_query_param("id", "eq.job-5")
        .json(&json!({ "status": "failed", "unparsable": "boom" }))
        .await;
    assert_eq!(patched.status_code(), StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let current = session(&server, "job-5").await;
    assert_eq!(current["status"], "failed");
    assert_eq!(current["unparsable"], "boom");
    let history: Vec<&str> = current["status_history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["status"].as_str().unwrap())
        .collect();
    assert_eq!(history, ["processing", "failed"]);
}
