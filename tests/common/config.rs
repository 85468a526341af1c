//! Test configuration helpers for creating extractors and live API servers

use doc_extractor::{Config, DocumentExtractor, api};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Config with its scratch directory inside `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.scratch_dir = temp_dir.path().join("scratch");
    config.fetch.timeout = Duration::from_secs(10);
    config
}

/// Create an extractor using [`test_config`]
pub async fn create_test_extractor() -> (Arc<DocumentExtractor>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = DocumentExtractor::new(test_config(&temp_dir)).await.unwrap();
    (Arc::new(extractor), temp_dir)
}

/// A running API server on an OS-assigned local port
pub struct TestServer {
    /// The service behind the server
    pub extractor: Arc<DocumentExtractor>,
    /// Base URL, e.g. `http://127.0.0.1:54321`
    pub base_url: String,
    /// HTTP client for requests against the server
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl TestServer {
    /// Start a server with the default test config
    pub async fn start() -> Self {
        let (extractor, temp_dir) = create_test_extractor().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = api::create_router(extractor.clone(), extractor.config().clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            extractor,
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            handle,
            _temp_dir: temp_dir,
        }
    }

    /// Absolute URL for a path on this server
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /extract and return the response status and JSON body
    pub async fn create_task(
        &self,
        url: &str,
        mode: Option<&str>,
    ) -> (reqwest::StatusCode, serde_json::Value) {
        let mut body = serde_json::json!({ "url": url });
        if let Some(mode) = mode {
            body["mode"] = serde_json::Value::String(mode.to_string());
        }

        let response = self
            .client
            .post(self.url("/extract"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
