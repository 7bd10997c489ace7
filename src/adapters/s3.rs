use aws_sdk_s3::{
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier},
};

use crate::{adapters, model, util};

// DeleteObjects accepts at most this many keys per request.
const DELETE_BATCH_SIZE: usize = 1000;

impl adapters::ObjectStore for aws_sdk_s3::Client {
    fn store_create_bucket(&self, bucket: &str) -> Result<(), model::error::StoreError> {
        let mut req = self.create_bucket().bucket(bucket);

        if let Some(region) = self.config().region() {
            if region.as_ref() != "us-east-1" {
                let constraint = BucketLocationConstraint::from(region.as_ref());
                req = req.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(constraint)
                        .build(),
                );
            }
        }

        util::poll::block_on_result(req.send())?;

        Ok(())
    }

    fn store_delete_bucket(&self, bucket: &str) -> Result<(), model::error::StoreError> {
        let req = self.delete_bucket().bucket(bucket);

        util::poll::block_on_result(req.send())?;

        Ok(())
    }

    fn store_list_objects(&self, bucket: &str) -> Result<Vec<String>, model::error::StoreError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.list_objects_v2().bucket(bucket);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = util::poll::block_on_result(req.send())?;

            for o in lo.contents() {
                if let Some(key) = o.key() {
                    keys.push(key.to_string());
                }
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(keys)
    }

    fn store_get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, model::error::StoreError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = util::poll::block_on_result(req.send())?;

        let bytes = util::poll::block_on(o.body.collect()).map_err(|err| {
            model::error::StoreError::new(
                model::error::ErrorKind::Transient,
                format!("failed to collect body: {}, {}", key, err),
            )
        })?;

        Ok(bytes.into_bytes().to_vec())
    }

    fn store_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StoreError> {
        let req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));

        util::poll::block_on_result(req.send())?;

        Ok(())
    }

    fn store_delete_object(&self, bucket: &str, key: &str) -> Result<(), model::error::StoreError> {
        let req = self.delete_object().bucket(bucket).key(key);

        util::poll::block_on_result(req.send())?;

        Ok(())
    }

    fn store_delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), model::error::StoreError> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let mut objects = Vec::with_capacity(batch.len());
            for key in batch {
                objects.push(ObjectIdentifier::builder().key(key).build()?);
            }

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()?;

            let req = self.delete_objects().bucket(bucket).delete(delete);
            let out = util::poll::block_on_result(req.send())?;

            if let Some(failed) = out.errors().first() {
                return Err(model::error::StoreError::new(
                    model::error::ErrorKind::Service,
                    format!(
                        "failed to delete {} of {} objects, first: {}, {}",
                        out.errors().len(),
                        batch.len(),
                        failed.key().unwrap_or(""),
                        failed.message().unwrap_or("")
                    ),
                ));
            }
        }

        Ok(())
    }
}
