use crate::model;

pub mod memory;
pub mod s3;

/// Blocking view of an S3-compatible object store.
pub trait ObjectStore: Send + Sync {
    fn store_create_bucket(&self, bucket: &str) -> Result<(), model::error::StoreError>;

    fn store_delete_bucket(&self, bucket: &str) -> Result<(), model::error::StoreError>;

    /// Keys in the bucket, in the order the store lists them.
    fn store_list_objects(&self, bucket: &str) -> Result<Vec<String>, model::error::StoreError>;

    fn store_get_object(&self, bucket: &str, key: &str)
        -> Result<Vec<u8>, model::error::StoreError>;

    fn store_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StoreError>;

    fn store_delete_object(&self, bucket: &str, key: &str) -> Result<(), model::error::StoreError>;

    fn store_delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), model::error::StoreError> {
        for key in keys {
            self.store_delete_object(bucket, key)?;
        }

        Ok(())
    }
}
