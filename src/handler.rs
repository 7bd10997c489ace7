use serde_json::Value;
use tracing::{error, info, span, warn, Level};

use crate::{
    model::{
        error::StoreError,
        task::{ResponseEnvelope, Task, TaskEnvelope, TaskParams},
    },
    storage::Storage,
    util,
};

/// Task and parameters of `envelope`, with every field the task needs present.
fn validate(envelope: &TaskEnvelope) -> Result<(Task, &TaskParams), StoreError> {
    let task = envelope.operation()?;
    let params = envelope.params.as_ref().ok_or_else(|| {
        StoreError::invalid_input(format!("missing `{}` parameters", envelope.task))
    })?;

    match task {
        Task::DeleteObject | Task::ReadObject => {
            params.require_key()?;
        }
        Task::WriteObject | Task::AppendObject => {
            params.require_key()?;
            params.require_write_data()?;
        }
        Task::MakeBucket | Task::DeleteBucket | Task::GetObjects => {}
    }

    Ok((task, params))
}

/// Runs one task against `storage` and reports the outcome.
///
/// Envelope problems are logged here. Storage failures are logged by [`Storage`].
pub fn run_task(storage: &Storage, envelope: &TaskEnvelope) -> Result<String, StoreError> {
    let (task, params) = validate(envelope).map_err(|err| {
        error!(error_message=%err, error_group="validate_task", task=%envelope.task);
        err
    })?;
    let bucket = params.bucket_name.as_str();

    match task {
        Task::MakeBucket => storage.create_bucket(bucket).map(|_| String::new()),
        Task::DeleteBucket => storage.delete_bucket(bucket).map(|_| String::new()),
        Task::DeleteObject => storage
            .delete_object(bucket, params.require_key()?)
            .map(|_| String::new()),
        Task::GetObjects => storage
            .list_objects(bucket)
            .map(|keys| util::object::format_listing(bucket, &keys)),
        Task::ReadObject => storage.read_object(bucket, params.require_key()?),
        Task::WriteObject => storage
            .write_object(bucket, params.require_key()?, params.require_write_data()?)
            .map(|_| String::new()),
        Task::AppendObject => storage
            .append_object(bucket, params.require_key()?, params.require_write_data()?)
            .map(|_| String::new()),
    }
}

/// Remote side of the dispatch protocol.
///
/// Failures, unknown tasks included, are logged and answered with an empty
/// message. Callers see `{"message": ""}` in that case.
pub fn handle(storage: &Storage, envelope: &TaskEnvelope) -> ResponseEnvelope {
    let span = span!(Level::INFO, "handle", context = "handle");
    let _e = span.enter();
    info!(task = %envelope.task, aws_region = %envelope.aws_region, "called");

    match run_task(storage, envelope) {
        Err(err) => {
            warn!(error_kind=%err.kind(), task=%envelope.task, "answering with empty message");
            ResponseEnvelope::empty()
        }
        Ok(message) => ResponseEnvelope::new(message),
    }
}

/// JSON in, JSON out. Only an undecodable envelope is an error.
pub fn handle_value(storage: &Storage, event: Value) -> Result<Value, StoreError> {
    let envelope = TaskEnvelope::from_value(event).map_err(|err| {
        error!(error_message=%err, error_group="decode_envelope");
        err
    })?;

    Ok(serde_json::to_value(handle(storage, &envelope))?)
}

#[cfg(test)]
mod tests {
    use aws_smithy_runtime::test_util::capture_test_logs::capture_test_logs;
    use serde_json::json;

    use super::*;
    use crate::{adapters::memory::MemoryClient, model::task::TaskParams};

    fn envelope(task: Task, params: TaskParams) -> TaskEnvelope {
        TaskEnvelope::new(task.as_str(), "us-east-1", params)
    }

    #[test]
    fn test_handle_session() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let cases = vec![
            (envelope(Task::MakeBucket, TaskParams::bucket("b")), ""),
            (
                envelope(
                    Task::WriteObject,
                    TaskParams::object("b", "file1.txt").with_data("one"),
                ),
                "",
            ),
            (
                envelope(
                    Task::WriteObject,
                    TaskParams::object("b", "file2.txt").with_data("two"),
                ),
                "",
            ),
            (
                envelope(Task::GetObjects, TaskParams::bucket("b")),
                "s3://b/file1.txt\ns3://b/file2.txt\n",
            ),
            (
                envelope(Task::DeleteObject, TaskParams::object("b", "file1.txt")),
                "",
            ),
            (
                envelope(
                    Task::AppendObject,
                    TaskParams::object("b", "file2.txt").with_data("more"),
                ),
                "",
            ),
            (
                envelope(Task::ReadObject, TaskParams::object("b", "file2.txt")),
                "two\nmore",
            ),
            (
                envelope(Task::GetObjects, TaskParams::bucket("b")),
                "s3://b/file2.txt\n",
            ),
            (envelope(Task::DeleteBucket, TaskParams::bucket("b")), ""),
        ];

        for (input, expected) in cases {
            let result = handle(&storage, &input);
            assert_eq!(result.message, expected, "failed for case: {}", input.task);
        }

        assert!(storage.list_objects("b").is_err());
    }

    #[test]
    fn test_handle_unknown_task() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let input = TaskEnvelope::new("launch_rocket", "us-east-1", TaskParams::bucket("b"));
        assert_eq!(handle(&storage, &input), ResponseEnvelope::empty());
    }

    #[test]
    fn test_handle_errors_yield_empty_message() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let cases = vec![
            envelope(Task::ReadObject, TaskParams::object("missing", "k")),
            envelope(Task::ReadObject, TaskParams::bucket("missing")),
            envelope(Task::WriteObject, TaskParams::object("missing", "k")),
            envelope(Task::GetObjects, TaskParams::bucket("missing")),
            envelope(Task::DeleteBucket, TaskParams::bucket("missing")),
            TaskEnvelope {
                task: "read_object".to_string(),
                aws_region: "us-east-1".to_string(),
                params: None,
            },
        ];

        for input in cases {
            let result = handle(&storage, &input);
            assert_eq!(result.message, "", "failed for case: {:?}", input);
        }
    }

    #[test]
    fn test_handle_failure_logged_once() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let cases = vec![
            envelope(Task::DeleteBucket, TaskParams::bucket("missing")),
            envelope(Task::ReadObject, TaskParams::bucket("missing")),
            TaskEnvelope::new("launch_rocket", "us-east-1", TaskParams::bucket("b")),
        ];

        for input in cases {
            let (_guard, rx) = capture_test_logs();

            assert_eq!(handle(&storage, &input), ResponseEnvelope::empty());

            let logs = rx.contents();
            assert_eq!(
                logs.matches("error_message").count(),
                1,
                "failed for case: {}, logs: {}",
                input.task,
                logs
            );
        }
    }

    #[test]
    fn test_run_task_reports_kind() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let input = TaskEnvelope::new("launch_rocket", "us-east-1", TaskParams::bucket("b"));
        let err = run_task(&storage, &input).unwrap_err();
        assert_eq!(err.kind(), crate::model::error::ErrorKind::UnknownOperation);
    }

    #[test]
    fn test_handle_value() {
        let client = MemoryClient::new();
        let storage = Storage::new(&client);

        let result = handle_value(
            &storage,
            json!({
                "task": "make_bucket",
                "aws_region": "us-east-1",
                "make_bucket": {"bucket_name": "b"}
            }),
        )
        .unwrap();
        assert_eq!(result, json!({"message": ""}));

        let result = handle_value(
            &storage,
            json!({
                "task": "get_objects",
                "aws_region": "us-east-1",
                "get_objects": {"bucket_name": "b"}
            }),
        )
        .unwrap();
        assert_eq!(result, json!({"message": ""}));

        assert!(handle_value(&storage, json!("not an envelope")).is_err());
    }
}
