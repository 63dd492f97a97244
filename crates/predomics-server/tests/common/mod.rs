//! Shared fixtures for the HTTP integration tests
//!
//! Each test gets a router over its own `#[sqlx::test]` database, a local
//! object store in a temp directory and a scripted engine that never spawns
//! a process.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use predomics_server::{
    api::create_router,
    config::{Config, EngineConfig},
    engine::{Engine, EngineError, EngineInvocation, ProgressUpdate, ResultBundle},
    features::{analysis::Orchestrator, FeatureState},
    storage::{LocalBackend, Storage},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedSender;
use tower::ServiceExt;
use uuid::Uuid;

pub const MATRIX_TSV: &str = "feature\ts1\ts2\ts3\ts4\n\
                              msp_0001\t0.12\t0\t0.3\t0.05\n\
                              msp_0002\t0\t0.2\t0\t0.11\n\
                              msp_0003\t1.5\t0.7\t0\t0\n";

pub const LABELS_TSV: &str = "sample\tclass\ns1\t0\ns2\t0\ns3\t1\ns4\t1\n";

const BOUNDARY: &str = "predomics-test-boundary";

/// Engine double: emits fixed progress then succeeds or fails
pub struct ScriptedEngine {
    pub generations: i32,
    pub outcome: Result<Value, String>,
}

impl ScriptedEngine {
    pub fn succeeding(bundle: Value) -> Self {
        Self {
            generations: 3,
            outcome: Ok(bundle),
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            generations: 1,
            outcome: Err(stderr.to_string()),
        }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn run(
        &self,
        invocation: &EngineInvocation,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<ResultBundle, EngineError> {
        invocation.write_parameter_file().await?;
        for generation in 1..=self.generations {
            let _ = progress.send(ProgressUpdate {
                generation,
                best_fit: Some(0.5 + f64::from(generation) / 100.0),
            });
        }
        match &self.outcome {
            Ok(bundle) => Ok(ResultBundle(bundle.clone())),
            Err(stderr) => Err(EngineError::Exited {
                code: Some(1),
                stderr_tail: stderr.clone(),
            }),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    _storage_dir: TempDir,
    _work_dir: TempDir,
}

impl TestApp {
    pub async fn new(pool: PgPool) -> Self {
        Self::with_engine(pool, ScriptedEngine::succeeding(json!({"best_model": {"auc": 0.91}}))).await
    }

    pub async fn with_engine(pool: PgPool, engine: impl Engine + 'static) -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(storage_dir.path()).await.unwrap();
        let storage = Storage::from_backend(Arc::new(backend));

        let engine_config = EngineConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let orchestrator = Orchestrator::new(pool.clone(), storage.clone(), Arc::new(engine), engine_config);

        let config = Config::default();
        let state = FeatureState {
            db: pool.clone(),
            storage,
            orchestrator,
            max_upload_bytes: 64 * 1024,
        };

        Self {
            router: create_router(state, &config),
            pool,
            _storage_dir: storage_dir,
            _work_dir: work_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("POST", uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("PUT", uri, body).await
    }

    async fn json_request(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Multipart upload with a `file` part plus optional text fields
    pub async fn upload(
        &self,
        uri: &str,
        filename: &str,
        content: &str,
        fields: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/tab-separated-values\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        ));

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
                .header("content-length", body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn create_project(&self, name: &str) -> Uuid {
        let (status, body) = self
            .post_json("/api/projects", json!({"name": name, "class_names": ["healthy", "sick"]}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Project with a dataset holding a training matrix and labels
    pub async fn project_with_training_data(&self, name: &str) -> (Uuid, Uuid) {
        let project = self.create_project(name).await;
        let uri = format!("/api/projects/{}/files", project);

        let (status, body) = self.upload(&uri, "X_train.tsv", MATRIX_TSV, &[("role", "xtrain")]).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let dataset = body["data"]["dataset_id"].as_str().unwrap().to_string();

        let (status, body) = self
            .upload(&uri, "y_train.tsv", LABELS_TSV, &[("role", "ytrain"), ("dataset_id", &dataset)])
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        (project, dataset.parse().unwrap())
    }

    /// Poll a job until it is completed or failed
    pub async fn wait_for_job(&self, project: Uuid, job: Uuid) -> Value {
        let uri = format!("/api/analysis/{}/jobs/{}", project, job);
        for _ in 0..200 {
            let (status, body) = self.get(&uri).await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            let state = body["data"]["status"].as_str().unwrap_or_default();
            if state == "completed" || state == "failed" {
                return body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} did not finish", job);
    }
}
