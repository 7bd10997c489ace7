use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use crate::{
    adapters,
    model::error::{ErrorKind, StoreError},
};

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// Process-local object store with S3 semantics for the operations we use.
#[derive(Default)]
pub struct MemoryClient {
    buckets: Mutex<Buckets>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>, StoreError> {
        self.buckets.lock().map_err(|err| {
            StoreError::new(
                ErrorKind::Service,
                format!("failed to acquire `buckets` guard: {}", err),
            )
        })
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::not_found(format!("NoSuchBucket: {}", bucket))
}

impl adapters::ObjectStore for MemoryClient {
    fn store_create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.lock()?;

        if buckets.contains_key(bucket) {
            return Err(StoreError::new(
                ErrorKind::Conflict,
                format!("BucketAlreadyOwnedByYou: {}", bucket),
            ));
        }

        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    fn store_delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.lock()?;

        match buckets.get(bucket) {
            None => Err(no_such_bucket(bucket)),
            Some(objects) if !objects.is_empty() => Err(StoreError::new(
                ErrorKind::Conflict,
                format!("BucketNotEmpty: {}", bucket),
            )),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    fn store_list_objects(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let buckets = self.lock()?;

        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .ok_or_else(|| no_such_bucket(bucket))
    }

    fn store_get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let buckets = self.lock()?;

        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("NoSuchKey: {}", key)))
    }

    fn store_put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let mut buckets = self.lock()?;

        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(key.to_string(), body);
        Ok(())
    }

    fn store_delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self.lock()?;

        // Deleting an absent key succeeds, as it does against S3.
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        objects.remove(key);
        Ok(())
    }
}
