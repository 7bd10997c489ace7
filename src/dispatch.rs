use std::path::Path;

use aws_sdk_lambda::{primitives::Blob, types::InvocationType};
use tracing::{error, info, span, Level};

use crate::{
    adapters, handler,
    model::{
        error::{ErrorKind, StoreError},
        task::{ResponseEnvelope, Task, TaskEnvelope, TaskParams},
    },
    storage::Storage,
    util,
};

pub const DEFAULT_FUNCTION_NAME: &str = "lambda_crud";

/// Synchronous request/response call to a remote function.
pub trait Invoker {
    fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>, StoreError>;
}

impl Invoker for aws_sdk_lambda::Client {
    fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        let req = self
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload));

        let out = util::poll::block_on_result(req.send())?;

        let body = out
            .payload()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();

        if let Some(function_error) = out.function_error() {
            return Err(StoreError::new(
                ErrorKind::Invocation,
                format!(
                    "function {} failed: {}, {}",
                    function_name,
                    function_error,
                    String::from_utf8_lossy(&body)
                ),
            ));
        }

        Ok(body)
    }
}

/// Runs the task handler in process against a local store.
pub struct LocalInvoker<'a> {
    client: &'a dyn adapters::ObjectStore,
}

impl<'a> LocalInvoker<'a> {
    pub fn new(client: &'a dyn adapters::ObjectStore) -> Self {
        Self { client }
    }
}

impl Invoker for LocalInvoker<'_> {
    fn invoke(&self, _function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        let event = serde_json::from_slice(&payload)?;
        let response = handler::handle_value(&Storage::new(self.client), event)?;

        Ok(serde_json::to_vec(&response)?)
    }
}

/// Client side of the dispatch protocol.
pub struct Dispatcher<'a> {
    invoker: &'a dyn Invoker,
    function_name: String,
    aws_region: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(invoker: &'a dyn Invoker, function_name: &str, aws_region: &str) -> Self {
        Self {
            invoker,
            function_name: function_name.to_string(),
            aws_region: aws_region.to_string(),
        }
    }

    /// Sends `task` with `params` and waits for the function's answer.
    ///
    /// An unknown task name is not an error here: the function logs it and
    /// answers with an empty message.
    pub fn call(&self, task: &str, params: TaskParams) -> Result<ResponseEnvelope, StoreError> {
        let span = span!(Level::INFO, "call", context = "call");
        let _e = span.enter();
        info!(task = task, function_name = %self.function_name, "called");

        let envelope = TaskEnvelope::new(task, &self.aws_region, params);
        let payload = envelope.to_json()?;

        let body = self
            .invoker
            .invoke(&self.function_name, payload)
            .map_err(|err| {
                error!(error_message=%err, error_group="invoke", task=task);
                err
            })?;

        serde_json::from_slice(&body).map_err(|err| {
            let err = StoreError::new(
                ErrorKind::Invocation,
                format!("failed to decode response of {}: {}", self.function_name, err),
            );
            error!(error_message=%err, error_group="decode_response", task=task);
            err
        })
    }

    fn call_task(&self, task: Task, params: TaskParams) -> Result<String, StoreError> {
        self.call(task.as_str(), params).map(|resp| resp.message)
    }

    pub fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.call_task(Task::MakeBucket, TaskParams::bucket(bucket))
            .map(|_| ())
    }

    pub fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.call_task(Task::DeleteBucket, TaskParams::bucket(bucket))
            .map(|_| ())
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.call_task(Task::DeleteObject, TaskParams::object(bucket, key))
            .map(|_| ())
    }

    pub fn write_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        self.call_task(
            Task::WriteObject,
            TaskParams::object(bucket, key).with_data(data),
        )
        .map(|_| ())
    }

    /// Uploads a local text file. The key defaults to the file name.
    pub fn upload_file(
        &self,
        path: &Path,
        bucket: &str,
        object_name: Option<&str>,
    ) -> Result<String, StoreError> {
        let key = util::object::object_name_for(path, object_name)?;
        let data = std::fs::read_to_string(path)?;
        self.write_object(bucket, &key, &data)?;

        Ok(key)
    }

    /// Raw `get_objects` listing, one `s3://bucket/key` per line.
    pub fn list_bucket_contents(&self, bucket: &str) -> Result<String, StoreError> {
        self.call_task(Task::GetObjects, TaskParams::bucket(bucket))
    }

    pub fn append_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        self.call_task(
            Task::AppendObject,
            TaskParams::object(bucket, key).with_data(data),
        )
        .map(|_| ())
    }

    pub fn read_object(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        self.call_task(Task::ReadObject, TaskParams::object(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io::Write};

    use aws_sdk_lambda::operation::invoke::InvokeOutput;
    use aws_smithy_mocks_experimental::{mock, mock_client, RuleMode};
    use serde_json::{json, Value};

    use super::*;
    use crate::adapters::{memory::MemoryClient, ObjectStore};

    /// Captures payloads and answers with a canned body.
    struct CannedInvoker {
        response: Vec<u8>,
        requests: RefCell<Vec<(String, Value)>>,
    }

    impl CannedInvoker {
        fn new(response: &str) -> Self {
            Self {
                response: response.as_bytes().to_vec(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Invoker for CannedInvoker {
        fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>, StoreError> {
            let value = serde_json::from_slice(&payload)?;
            self.requests
                .borrow_mut()
                .push((function_name.to_string(), value));
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_call_builds_envelope() {
        let invoker = CannedInvoker::new(r#"{"message": "contents"}"#);
        let dispatcher = Dispatcher::new(&invoker, DEFAULT_FUNCTION_NAME, "eu-west-1");

        let message = dispatcher.read_object("b", "k").unwrap();

        assert_eq!(message, "contents");
        let requests = invoker.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "lambda_crud");
        assert_eq!(
            requests[0].1,
            json!({
                "task": "read_object",
                "aws_region": "eu-west-1",
                "read_object": {"bucket_name": "b", "key": "k"}
            })
        );
    }

    #[test]
    fn test_call_undecodable_response() {
        let cases = vec!["", "not json", r#"{"msg": "x"}"#];

        for body in cases {
            let invoker = CannedInvoker::new(body);
            let dispatcher = Dispatcher::new(&invoker, DEFAULT_FUNCTION_NAME, "us-east-1");

            let err = dispatcher.create_bucket("b").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invocation, "failed for case: {}", body);
        }
    }

    #[test]
    fn test_call_unknown_task_returns_empty_message() {
        let client = MemoryClient::new();
        let invoker = LocalInvoker::new(&client);
        let dispatcher = Dispatcher::new(&invoker, DEFAULT_FUNCTION_NAME, "us-east-1");

        let cases = vec!["launch_rocket", "task", "aws_region", ""];

        for name in cases {
            let result = dispatcher.call(name, TaskParams::bucket("b"));
            assert_eq!(
                result.unwrap(),
                ResponseEnvelope::empty(),
                "failed for case: {}",
                name
            );
        }
    }

    #[test]
    fn test_local_session() {
        let client = MemoryClient::new();
        let invoker = LocalInvoker::new(&client);
        let dispatcher = Dispatcher::new(&invoker, DEFAULT_FUNCTION_NAME, "us-east-1");

        dispatcher.create_bucket("b").unwrap();
        assert_eq!(dispatcher.list_bucket_contents("b").unwrap(), "");

        dispatcher.write_object("b", "file2.txt", "hello").unwrap();
        assert_eq!(dispatcher.read_object("b", "file2.txt").unwrap(), "hello");

        dispatcher.append_object("b", "file2.txt", "d1").unwrap();
        dispatcher.append_object("b", "file2.txt", "d2").unwrap();
        assert_eq!(
            dispatcher.read_object("b", "file2.txt").unwrap(),
            "hello\nd1\nd2"
        );

        dispatcher.delete_object("b", "file2.txt").unwrap();
        assert_eq!(dispatcher.list_bucket_contents("b").unwrap(), "");

        dispatcher.delete_bucket("b").unwrap();
        assert!(client.store_list_objects("b").is_err());
    }

    #[test]
    fn test_upload_file() {
        let client = MemoryClient::new();
        let invoker = LocalInvoker::new(&client);
        let dispatcher = Dispatcher::new(&invoker, DEFAULT_FUNCTION_NAME, "us-east-1");
        dispatcher.create_bucket("b").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file1.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"uploaded").unwrap();

        let key = dispatcher.upload_file(&path, "b", None).unwrap();
        assert_eq!(key, "file1.txt");

        let key = dispatcher.upload_file(&path, "b", Some("renamed.txt")).unwrap();
        assert_eq!(key, "renamed.txt");

        assert_eq!(
            dispatcher.list_bucket_contents("b").unwrap(),
            "s3://b/file1.txt\ns3://b/renamed.txt\n"
        );
        assert_eq!(dispatcher.read_object("b", "renamed.txt").unwrap(), "uploaded");

        let err = dispatcher
            .upload_file(&dir.path().join("missing.txt"), "b", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    fn is_get_objects_request(payload: Option<&Blob>) -> bool {
        payload
            .and_then(|blob| serde_json::from_slice::<Value>(blob.as_ref()).ok())
            .is_some_and(|value| value["task"] == "get_objects")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lambda_invoke_request_response() {
        let invoke = mock!(aws_sdk_lambda::Client::invoke)
            .match_requests(|r| {
                r.function_name() == Some(DEFAULT_FUNCTION_NAME)
                    && r.invocation_type() == Some(&InvocationType::RequestResponse)
                    && is_get_objects_request(r.payload())
            })
            .then_output(|| {
                InvokeOutput::builder()
                    .status_code(200)
                    .payload(Blob::new(r#"{"message": "s3://b/file2.txt\n"}"#))
                    .build()
            });
        let client = mock_client!(aws_sdk_lambda, RuleMode::MatchAny, &[&invoke]);

        let message = tokio::task::spawn_blocking(move || {
            Dispatcher::new(&client, DEFAULT_FUNCTION_NAME, "us-east-1").list_bucket_contents("b")
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(message, "s3://b/file2.txt\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lambda_function_error() {
        let cases = vec![
            ("Unhandled", r#"{"errorMessage": "boom"}"#),
            ("Handled", ""),
        ];

        for (function_error, body) in cases {
            let invoke = mock!(aws_sdk_lambda::Client::invoke).then_output(move || {
                InvokeOutput::builder()
                    .status_code(200)
                    .function_error(function_error)
                    .payload(Blob::new(body))
                    .build()
            });
            let client = mock_client!(aws_sdk_lambda, RuleMode::MatchAny, &[&invoke]);

            let err = tokio::task::spawn_blocking(move || {
                Dispatcher::new(&client, DEFAULT_FUNCTION_NAME, "us-east-1").create_bucket("b")
            })
            .await
            .unwrap()
            .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Invocation, "failed for case: {}", function_error);
            assert!(
                err.message.contains(function_error),
                "failed for case: {}",
                function_error
            );
        }
    }
}
