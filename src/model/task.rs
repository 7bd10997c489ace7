use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::error::StoreError;

/// Operations understood by the remote task handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Task {
    MakeBucket,
    DeleteBucket,
    DeleteObject,
    GetObjects,
    ReadObject,
    WriteObject,
    AppendObject,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::MakeBucket,
        Task::DeleteBucket,
        Task::DeleteObject,
        Task::GetObjects,
        Task::ReadObject,
        Task::WriteObject,
        Task::AppendObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::MakeBucket => "make_bucket",
            Task::DeleteBucket => "delete_bucket",
            Task::DeleteObject => "delete_object",
            Task::GetObjects => "get_objects",
            Task::ReadObject => "read_object",
            Task::WriteObject => "write_object",
            Task::AppendObject => "append_object",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|task| task.as_str() == s)
            .ok_or_else(|| {
                StoreError::new(
                    crate::model::error::ErrorKind::UnknownOperation,
                    format!("{} is an invalid task", s),
                )
            })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskParams {
    pub bucket_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_data: Option<String>,
}

impl TaskParams {
    pub fn bucket(bucket_name: &str) -> Self {
        Self {
            bucket_name: bucket_name.to_string(),
            ..Default::default()
        }
    }

    pub fn object(bucket_name: &str, key: &str) -> Self {
        Self {
            bucket_name: bucket_name.to_string(),
            key: Some(key.to_string()),
            write_data: None,
        }
    }

    pub fn with_data(mut self, data: &str) -> Self {
        self.write_data = Some(data.to_string());
        self
    }

    pub fn require_key(&self) -> Result<&str, StoreError> {
        self.key
            .as_deref()
            .ok_or_else(|| StoreError::invalid_input("missing `key` parameter"))
    }

    pub fn require_write_data(&self) -> Result<&str, StoreError> {
        self.write_data
            .as_deref()
            .ok_or_else(|| StoreError::invalid_input("missing `write_data` parameter"))
    }
}

/// Envelope fields a task name must not shadow with its parameter record.
const RESERVED_FIELDS: [&str; 2] = ["task", "aws_region"];

/// Request body sent to the remote function.
///
/// On the wire the parameters are nested under a field named after the task:
///
/// ```json
/// {"task": "read_object", "aws_region": "us-east-1",
///  "read_object": {"bucket_name": "b", "key": "k"}}
/// ```
///
/// The task name is kept as text so that an unknown name still decodes and can
/// be rejected by the handler. A task named `task` or `aws_region` carries no
/// parameter record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskEnvelope {
    pub task: String,
    pub aws_region: String,
    pub params: Option<TaskParams>,
}

impl TaskEnvelope {
    pub fn new(task: &str, aws_region: &str, params: TaskParams) -> Self {
        Self {
            task: task.to_string(),
            aws_region: aws_region.to_string(),
            params: Some(params),
        }
    }

    pub fn operation(&self) -> Result<Task, StoreError> {
        self.task.parse()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("task".to_string(), Value::String(self.task.clone()));
        map.insert(
            "aws_region".to_string(),
            Value::String(self.aws_region.clone()),
        );
        let nested_params = match &self.params {
            Some(params) if !RESERVED_FIELDS.contains(&self.task.as_str()) => Some(params),
            _ => None,
        };
        if let Some(params) = nested_params {
            let mut nested = Map::new();
            nested.insert(
                "bucket_name".to_string(),
                Value::String(params.bucket_name.clone()),
            );
            if let Some(key) = &params.key {
                nested.insert("key".to_string(), Value::String(key.clone()));
            }
            if let Some(data) = &params.write_data {
                nested.insert("write_data".to_string(), Value::String(data.clone()));
            }
            map.insert(self.task.clone(), Value::Object(nested));
        }

        Value::Object(map)
    }

    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::invalid_input(format!(
                    "task envelope must be an object, got: {}",
                    other
                )))
            }
        };

        let task = match map.remove("task") {
            Some(Value::String(task)) => task,
            _ => return Err(StoreError::invalid_input("missing `task` field")),
        };
        let aws_region = match map.remove("aws_region") {
            Some(Value::String(region)) => region,
            None | Some(Value::Null) => String::new(),
            Some(other) => {
                return Err(StoreError::invalid_input(format!(
                    "`aws_region` must be a string, got: {}",
                    other
                )))
            }
        };
        let params = if RESERVED_FIELDS.contains(&task.as_str()) {
            None
        } else {
            match map.remove(&task) {
                Some(nested) => Some(serde_json::from_value(nested)?),
                None => None,
            }
        };

        Ok(Self {
            task,
            aws_region,
            params,
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec_pretty(&self.to_value())?)
    }

    pub fn from_json(payload: &[u8]) -> Result<Self, StoreError> {
        Self::from_value(serde_json::from_slice(payload)?)
    }
}

/// Response body returned by the remote function.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub message: String,
}

impl ResponseEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
