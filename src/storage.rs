use tracing::{error, info, span, Level};

use crate::{adapters, model::error::StoreError};

/// Named bucket and object operations on top of an [`adapters::ObjectStore`].
pub struct Storage<'a> {
    client: &'a dyn adapters::ObjectStore,
}

impl<'a> Storage<'a> {
    pub fn new(client: &'a dyn adapters::ObjectStore) -> Self {
        Self { client }
    }

    pub fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "create_bucket", context = "create_bucket");
        let _e = span.enter();
        info!(bucket = bucket, "called");

        self.client.store_create_bucket(bucket).map_err(|err| {
            error!(error_message=%err, error_group="create_bucket", bucket=bucket);
            err
        })
    }

    pub fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let span = span!(Level::INFO, "list_objects", context = "list_objects");
        let _e = span.enter();
        info!(bucket = bucket, "called");

        self.client.store_list_objects(bucket).map_err(|err| {
            error!(error_message=%err, error_group="list_objects", bucket=bucket);
            err
        })
    }

    pub fn read_object(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        let span = span!(Level::INFO, "read_object", context = "read_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, "called");

        let body = match self.client.store_get_object(bucket, key) {
            Err(err) => {
                error!(error_message=%err, error_group="get_object", bucket=bucket, key=key);
                return Err(err);
            }
            Ok(body) => body,
        };

        String::from_utf8(body).map_err(|err| {
            let err = StoreError::invalid_input(format!("object is not utf-8: {}, {}", key, err));
            error!(error_message=%err, error_group="decode_object", bucket=bucket, key=key);
            err
        })
    }

    pub fn write_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "write_object", context = "write_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, size = data.len(), "called");

        self.client
            .store_put_object(bucket, key, data.as_bytes().to_vec())
            .map_err(|err| {
                error!(error_message=%err, error_group="put_object", bucket=bucket, key=key);
                err
            })
    }

    /// Appends a newline and `data` to the object.
    ///
    /// This is a read followed by a write with no conditional check in between.
    /// Callers must be the only writer of `key` while it runs.
    pub fn append_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "append_object", context = "append_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, size = data.len(), "called");

        let old_data = self.read_object(bucket, key)?;
        let new_data = format!("{}\n{}", old_data, data);
        self.write_object(bucket, key, &new_data)
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "delete_object", context = "delete_object");
        let _e = span.enter();
        info!(bucket = bucket, key = key, "called");

        self.client.store_delete_object(bucket, key).map_err(|err| {
            error!(error_message=%err, error_group="delete_object", bucket=bucket, key=key);
            err
        })
    }

    pub fn empty_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "empty_bucket", context = "empty_bucket");
        let _e = span.enter();
        info!(bucket = bucket, "called");

        let keys = self.client.store_list_objects(bucket).map_err(|err| {
            error!(error_message=%err, error_group="list_objects", bucket=bucket);
            err
        })?;
        if keys.is_empty() {
            return Ok(());
        }

        self.client.store_delete_objects(bucket, &keys).map_err(|err| {
            error!(error_message=%err, error_group="delete_objects", bucket=bucket, count=keys.len());
            err
        })
    }

    /// Empties the bucket, then deletes it. A failure while emptying aborts
    /// before the bucket delete is sent and is logged only by `empty_bucket`.
    pub fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let span = span!(Level::INFO, "delete_bucket", context = "delete_bucket");
        let _e = span.enter();
        info!(bucket = bucket, "called");

        self.empty_bucket(bucket).map_err(|err| {
            StoreError::new(
                err.kind(),
                format!("could not delete bucket: {}, {}", bucket, err.message),
            )
        })?;

        self.client.store_delete_bucket(bucket).map_err(|err| {
            error!(error_message=%err, error_group="delete_bucket", bucket=bucket);
            err
        })
    }
}
