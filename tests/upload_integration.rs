use async_trait::async_trait;
use gcs_upload::contract::{MockObjectSink, ObjectSink, SinkError};
use gcs_upload::target::{BuildContext, BuildEvent, TriggerContext};
use gcs_upload::upload::{run, UploadTask};
use gcs_upload::UploadError;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Records every call and optionally fails the n-th `put_object` (1-based).
#[derive(Default)]
struct RecordingSink {
    fail_put_on: Option<usize>,
    puts: Mutex<Vec<(PathBuf, String)>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn failing_on(n: usize) -> Self {
        Self {
            fail_put_on: Some(n),
            ..Default::default()
        }
    }

    fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn put_attempts(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectSink for RecordingSink {
    async fn put_object(&self, local_path: &Path, destination_key: &str) -> Result<(), SinkError> {
        let mut puts = self.puts.lock().unwrap();
        puts.push((local_path.to_path_buf(), destination_key.to_string()));
        if Some(puts.len()) == self.fail_put_on {
            return Err(format!("quota exceeded writing {destination_key}").into());
        }
        Ok(())
    }

    async fn set_content_type(&self, destination_key: &str, content_type: &str) -> Result<(), SinkError> {
        self.writes
            .lock()
            .unwrap()
            .push((destination_key.to_string(), content_type.to_string()));
        Ok(())
    }
}

fn source_tree(files: &[&str]) -> TempDir {
    let tmp = tempdir().unwrap();
    for file in files {
        let path = tmp.path().join(file);
        create_dir_all(path.parent().unwrap()).unwrap();
        write(&path, file.as_bytes()).unwrap();
    }
    tmp
}

fn task_for(root: &Path, target: &str) -> UploadTask {
    UploadTask {
        source: root.to_path_buf(),
        target: target.to_string(),
        strip_prefix: String::new(),
        trigger_folder: "pr".into(),
        tag_folder: "tags".into(),
        target_date_folder: false,
    }
}

fn master_push() -> BuildContext {
    BuildContext::new(TriggerContext::new(BuildEvent::Push, "master"))
}

#[tokio::test]
async fn uploads_each_file_once_in_order_with_content_types() {
    let tree = source_tree(&["a.txt", "sub/b.png", ".gitkeep"]);
    let sink = RecordingSink::default();

    run(&task_for(tree.path(), "out"), &master_push(), &sink)
        .await
        .expect("upload should succeed");

    assert_eq!(
        sink.writes(),
        vec![
            ("out/a.txt".to_string(), "text/plain".to_string()),
            ("out/sub/b.png".to_string(), "image/png".to_string()),
        ]
    );
    assert_eq!(sink.put_attempts(), 2);
}

#[tokio::test]
async fn stops_at_first_sink_failure() {
    let tree = source_tree(&["a.txt", "b.txt", "c.txt"]);
    let sink = RecordingSink::failing_on(2);

    let err = run(&task_for(tree.path(), "out"), &master_push(), &sink)
        .await
        .expect_err("second write should fail the run");

    match &err {
        UploadError::Sink { key, source } => {
            assert_eq!(key, "out/b.txt");
            assert!(source.to_string().contains("quota exceeded"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(sink.writes(), vec![("out/a.txt".to_string(), "text/plain".to_string())]);
    assert_eq!(sink.put_attempts(), 2, "third file must never be attempted");
}

#[tokio::test]
async fn missing_source_is_reported_before_any_write() {
    let tmp = tempdir().unwrap();
    let mut sink = MockObjectSink::new();
    sink.expect_put_object().never();
    sink.expect_set_content_type().never();

    let err = run(&task_for(&tmp.path().join("missing"), "out"), &master_push(), &sink)
        .await
        .expect_err("missing source must fail");

    assert!(err.is_source_unreadable(), "got {err:?}");
}

#[tokio::test]
async fn content_type_failure_is_surfaced() {
    let tree = source_tree(&["report.json", "z.txt"]);
    let mut sink = MockObjectSink::new();

    sink.expect_put_object()
        .times(1)
        .returning(|_, key| {
            assert_eq!(key, "out/report.json");
            Ok(())
        });
    sink.expect_set_content_type()
        .times(1)
        .returning(|key, content_type| {
            assert_eq!(key, "out/report.json");
            assert_eq!(content_type, "application/json");
            Err("permission denied".into())
        });

    let err = run(&task_for(tree.path(), "out"), &master_push(), &sink)
        .await
        .expect_err("attribute update failure must fail the run");

    assert!(err.is_sink());
    assert!(err.to_string().contains("out/report.json"));
}

#[tokio::test]
async fn trigger_build_uploads_into_trigger_folder_with_stripped_prefix() {
    let tree = source_tree(&["build/index.html", "build/nested/.gitkeep", "build/nested/data.bin"]);
    let root = tree.path();
    let mut task = task_for(root, "releases");
    task.strip_prefix = format!("{}/build/", root.display());

    let ctx = BuildContext::new(TriggerContext::new(BuildEvent::Push, "master"))
        .with_submodule(Some(TriggerContext::new(BuildEvent::PullRequest, "feature-x")));
    let sink = RecordingSink::default();

    run(&task, &ctx, &sink).await.expect("upload should succeed");

    assert_eq!(
        sink.writes(),
        vec![
            ("pr/index.html".to_string(), "text/html".to_string()),
            ("pr/nested/data.bin".to_string(), "application/octet-stream".to_string()),
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_artifact_is_uploaded_under_link_name() {
    let store = tempdir().unwrap();
    write(store.path().join("real.txt"), b"built elsewhere").unwrap();
    let tree = source_tree(&["a.txt"]);
    std::os::unix::fs::symlink(store.path().join("real.txt"), tree.path().join("linked.txt")).unwrap();
    let sink = RecordingSink::default();

    run(&task_for(tree.path(), "out"), &master_push(), &sink)
        .await
        .expect("upload should succeed");

    assert_eq!(
        sink.writes(),
        vec![
            ("out/a.txt".to_string(), "text/plain".to_string()),
            ("out/linked.txt".to_string(), "text/plain".to_string()),
        ]
    );
}
