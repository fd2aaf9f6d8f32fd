//! End-to-end dispatcher tests against mock registry, execution-backend,
//! and storage servers.

use std::sync::Arc;

use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use sqlx::PgPool;

use assert_matches::assert_matches;
use conductor_core::error::CoreError;
use conductor_core::service::ServiceDescriptor;
use conductor_db::models::status::JobStatus;
use conductor_db::repositories::{CompletedJobRepo, JobRepo};
use conductor_dispatch::{CapabilityCache, CreateJobOutcome, Dispatcher, JobReply};

/// Capability tags used by the mock fleet.
const SYNC_TYPE: i32 = 104;
const ASYNC_TYPE: i32 = 102;
const UPLOAD_TYPE: i32 = 100;

// ---------------------------------------------------------------------------
// Mock servers
// ---------------------------------------------------------------------------

/// Serve a router on an ephemeral port; returns its versioned base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/1.0")
}

/// The execution backend's view of `POST /new-job`.
#[derive(Debug, Deserialize)]
struct NewJobWire {
    #[allow(dead_code)]
    application_id: i64,
    #[allow(dead_code)]
    application_instance_id: i64,
    job_id: i64,
    job_type: i32,
    #[allow(dead_code)]
    upload_identifier: String,
    payload: String,
}

/// Mock backend: async capabilities get 202 + a decoded reply, everything
/// else gets the "result" inline as a raw 200 body.
async fn mock_new_job(Json(request): Json<NewJobWire>) -> Response {
    if request.job_type == ASYNC_TYPE {
        (
            StatusCode::ACCEPTED,
            Json(JobReply {
                job_id: request.job_id,
                job_status: JobStatus::Running.code(),
                payload: String::new(),
            }),
        )
            .into_response()
    } else {
        (StatusCode::OK, format!("processed:{}", request.payload)).into_response()
    }
}

async fn mock_status(Json(body): Json<serde_json::Value>) -> Json<JobReply> {
    Json(JobReply {
        job_id: body["job_id"].as_i64().unwrap_or(-1),
        job_status: JobStatus::Running.code(),
        payload: "half way".to_string(),
    })
}

async fn mock_result() -> &'static str {
    "RAW RESULT BYTES"
}

async fn mock_new_upload_id() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "upload_id": "slot-1" }))
}

/// Storage admits uploads up to 1 MiB of JPEG, refuses everything else.
async fn mock_can_upload(Json(check): Json<serde_json::Value>) -> StatusCode {
    let size = check["data_size"].as_i64().unwrap_or(0);
    if size <= 1_048_576 && check["mime_type"] == "image/jpeg" {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

fn descriptor(kind: i32, requires_upload: bool, is_async: bool) -> ServiceDescriptor {
    ServiceDescriptor {
        service_type: kind,
        description: format!("mock service {kind}"),
        server: "10.0.0.1".to_string(),
        port: 9000,
        action_url: "http://10.0.0.1:9000/1.0/action".to_string(),
        heartbeat_url: "http://10.0.0.1:9000/1.0/heartbeat".to_string(),
        requires_upload,
        request_types: vec!["application/json".to_string()],
        returns_download: false,
        response_types: vec!["application/json".to_string()],
        about: String::new(),
        is_async,
    }
}

/// Build a dispatcher wired to mock collaborators advertising the three
/// capability classes.
async fn test_dispatcher(pool: PgPool) -> Dispatcher {
    let fleet = Arc::new(vec![
        descriptor(SYNC_TYPE, false, false),
        descriptor(ASYNC_TYPE, false, true),
        descriptor(UPLOAD_TYPE, true, false),
    ]);

    let registry_base = spawn(Router::new().route(
        "/1.0/available-services",
        get(move || {
            let fleet = Arc::clone(&fleet);
            async move { Json((*fleet).clone()) }
        }),
    ))
    .await;

    let backend_base = spawn(
        Router::new()
            .route("/1.0/new-job", post(mock_new_job))
            .route("/1.0/status", post(mock_status))
            .route("/1.0/result", post(mock_result)),
    )
    .await;

    let storage_base = spawn(
        Router::new()
            .route("/1.0/new-upload-id", post(mock_new_upload_id))
            .route("/1.0/can-upload-data", post(mock_can_upload)),
    )
    .await;

    let capabilities = Arc::new(CapabilityCache::new(&registry_base));
    capabilities.bootstrap().await.unwrap();

    Dispatcher::new(pool, capabilities, &backend_base, &storage_base)
}

async fn only_job_id(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT id FROM jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// create_job
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn sync_job_completes_and_bills(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;

    let payload = r#"{"service_type":104,"text":"hello"}"#;
    let outcome = dispatcher.create_job(1, 1, payload).await.unwrap();

    let CreateJobOutcome::Completed {
        backend_status,
        payload: result,
    } = outcome
    else {
        panic!("sync capability must complete inline");
    };
    assert_eq!(backend_status, 200);
    assert!(result.contains("hello"));

    let job_id = only_job_id(&pool).await;
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done.code());
    assert!(job.result_retrieved);
    assert!(job.request_ended_at.is_some());

    let billing = CompletedJobRepo::find_by_job_id(&pool, job_id).await.unwrap();
    assert!(billing.is_some(), "completed job must have a billing record");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_job_parks_with_a_one_hour_slot(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;

    let before = chrono::Utc::now();
    let outcome = dispatcher
        .create_job(1, 1, r#"{"service_type":100}"#)
        .await
        .unwrap();

    let CreateJobOutcome::AwaitingUpload { job, upload } = outcome else {
        panic!("upload capability must park the job");
    };
    assert_eq!(job.status, JobStatus::WaitingForUpload.code());
    assert_eq!(job.upload_id.as_deref(), Some("slot-1"));
    assert_eq!(upload.upload_id, "slot-1");

    let ttl = upload.upload_until - before;
    assert!(ttl > chrono::Duration::minutes(59) && ttl <= chrono::Duration::minutes(61));

    // No backend contact happened; the row is still parked.
    let persisted = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::WaitingForUpload.code());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn async_job_is_accepted_and_left_for_polling(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;

    let outcome = dispatcher
        .create_job(1, 1, r#"{"service_type":102,"audio":"..."}"#)
        .await
        .unwrap();

    let CreateJobOutcome::Accepted {
        backend_status,
        reply,
    } = outcome
    else {
        panic!("async capability must return the backend's immediate answer");
    };
    assert_eq!(backend_status, 202);
    let reply = reply.expect("202 must carry a decoded reply");
    assert_eq!(reply.job_status, JobStatus::Running.code());

    // The dispatcher records nothing beyond creation; progress comes from
    // polling.
    let job = JobRepo::find_by_id(&pool, reply.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Created.code());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unparseable_selector_is_bad_input(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;

    let err = dispatcher.create_job(1, 1, "definitely not json").await.unwrap_err();
    assert_matches!(err, CoreError::BadInput(_));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unserved_type_is_capability_unavailable(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;

    let err = dispatcher
        .create_job(1, 1, r#"{"service_type":999}"#)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::CapabilityUnavailable(999));
}

// ---------------------------------------------------------------------------
// Upload handshake
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_complete_stamps_the_storage_identifier(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;
    dispatcher.create_job(1, 1, r#"{"service_type":100}"#).await.unwrap();

    let job = dispatcher.on_upload_complete("slot-1", "blob-7").await.unwrap();
    assert_eq!(job.upload_identifier.as_deref(), Some("blob-7"));

    let persisted = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(persisted.upload_identifier.as_deref(), Some("blob-7"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_complete_on_an_unknown_slot_is_not_found(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;

    let err = dispatcher.on_upload_complete("no-such-slot", "blob-7").await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}

#[sqlx::test(migrations = "../db/migrations")]
async fn storage_admission_checks_size_and_media_type(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;
    dispatcher.create_job(1, 1, r#"{"service_type":100}"#).await.unwrap();

    let storage = dispatcher.storage();
    assert!(storage.can_upload("slot-1", 512 * 1024, "image/jpeg").await);
    assert!(!storage.can_upload("slot-1", 8 * 1_048_576, "image/jpeg").await);
    assert!(!storage.can_upload("slot-1", 512, "application/x-msdownload").await);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn only_the_slot_owner_may_upload(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;
    dispatcher.create_job(1, 1, r#"{"service_type":100}"#).await.unwrap();

    assert!(dispatcher.can_accept_upload(1, 1, "slot-1").await.unwrap());
    assert!(!dispatcher.can_accept_upload(2, 2, "slot-1").await.unwrap());
    assert!(!dispatcher.can_accept_upload(1, 2, "slot-1").await.unwrap());
    assert!(!dispatcher.can_accept_upload(1, 1, "other-slot").await.unwrap());
}

// ---------------------------------------------------------------------------
// Status / result
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn status_for_an_unknown_job_is_not_found(pool: PgPool) {
    let dispatcher = test_dispatcher(pool).await;

    let err = dispatcher.get_status(1, 1, 424242).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}

#[sqlx::test(migrations = "../db/migrations")]
async fn foreign_identity_is_unauthorized(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;
    dispatcher
        .create_job(1, 1, r#"{"service_type":102,"audio":"..."}"#)
        .await
        .unwrap();
    let job_id = only_job_id(&pool).await;

    let err = dispatcher.get_status(2, 2, job_id).await.unwrap_err();
    assert_matches!(err, CoreError::Unauthorized(_));

    let err = dispatcher.get_result(1, 2, job_id).await.unwrap_err();
    assert_matches!(err, CoreError::Unauthorized(_));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn status_poll_persists_the_backend_status(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;
    dispatcher
        .create_job(1, 1, r#"{"service_type":102,"audio":"..."}"#)
        .await
        .unwrap();
    let job_id = only_job_id(&pool).await;

    let (status, reply) = dispatcher.get_status(1, 1, job_id).await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(reply.job_status, JobStatus::Running.code());
    assert_eq!(reply.payload, "half way");

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running.code());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn result_closes_the_job_and_bills_exactly_once(pool: PgPool) {
    let dispatcher = test_dispatcher(pool.clone()).await;
    dispatcher
        .create_job(1, 1, r#"{"service_type":102,"audio":"..."}"#)
        .await
        .unwrap();
    let job_id = only_job_id(&pool).await;

    let (status, payload) = dispatcher.get_result(1, 1, job_id).await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(payload.as_deref(), Some("RAW RESULT BYTES"));

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done.code());
    assert!(job.result_retrieved);

    // A second retrieval relays the result again but must not bill again.
    dispatcher.get_result(1, 1, job_id).await.unwrap();
    let billed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM completed_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(billed, 1);
}
