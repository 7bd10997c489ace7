//! Bucket and object CRUD against S3, run either directly or through a remote
//! function that receives JSON task envelopes.

pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod model;
pub mod storage;
pub mod util;
