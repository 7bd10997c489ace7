use std::path::Path;

use crate::model::error::StoreError;

const S3_SCHEME: &str = "s3://";

pub fn format_object_uri(bucket: &str, key: &str) -> String {
    format!("{}{}/{}", S3_SCHEME, bucket, key)
}

/// Renders keys the way `get_objects` reports them: one URI per line.
pub fn format_listing(bucket: &str, keys: &[String]) -> String {
    let mut listing = String::new();
    for key in keys {
        listing.push_str(&format_object_uri(bucket, key));
        listing.push('\n');
    }

    listing
}

/// Key for an uploaded file: `object_name` if given, else the file name.
pub fn object_name_for(path: &Path, object_name: Option<&str>) -> Result<String, StoreError> {
    if let Some(name) = object_name {
        return Ok(name.to_string());
    }

    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            StoreError::invalid_input(format!(
                "failed to derive object name from: {}",
                path.display()
            ))
        })
}
