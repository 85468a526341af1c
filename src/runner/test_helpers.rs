//! Shared test helpers for creating DocumentExtractor instances in tests.

use crate::config::Config;
use crate::runner::DocumentExtractor;
use crate::types::{Task, TaskId};
use std::io::Write;
use std::time::Duration;
use tempfile::tempdir;

/// Helper to create a test DocumentExtractor with its scratch dir in a tempdir.
/// Returns the extractor and the tempdir (which must be kept alive).
pub(crate) async fn create_test_extractor() -> (DocumentExtractor, tempfile::TempDir) {
    create_test_extractor_with(|_| {}).await
}

/// Same as [`create_test_extractor`], letting the caller adjust the config first
pub(crate) async fn create_test_extractor_with(
    customize: impl FnOnce(&mut Config),
) -> (DocumentExtractor, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.storage.scratch_dir = temp_dir.path().join("scratch");
    config.fetch.timeout = Duration::from_secs(10);
    customize(&mut config);

    let extractor = DocumentExtractor::new(config).await.unwrap();
    (extractor, temp_dir)
}

/// Poll until the task is terminal, panicking after `timeout`
pub(crate) async fn wait_for_terminal(
    extractor: &DocumentExtractor,
    id: TaskId,
    timeout: Duration,
) -> Task {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = extractor.status(id).await.unwrap();
        if task.is_terminal() {
            return task;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("task {} still {} after {:?}", id, task.state, timeout);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Build an in-memory ZIP archive from (name, content) pairs
pub(crate) fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in files {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}
