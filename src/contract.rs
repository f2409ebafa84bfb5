#![allow(unused)]

//! # contract: the object-sink capability
//!
//! The upload loop never talks to a storage service directly. It writes through an
//! [`ObjectSink`], which stores the bytes of one local file under a destination key
//! and then records the content type on that object.
//!
//! ## Two-step writes
//! - [`ObjectSink::put_object`] streams the bytes and durably creates/overwrites the object.
//! - [`ObjectSink::set_content_type`] updates the object's metadata afterwards.
//!
//! An implementor must report a failed metadata update as an error. The object may
//! already exist at that point; no rollback is attempted by the caller.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests get a `MockObjectSink` without a real bucket.
//! - The mock is exported behind the `test-export-mocks` feature (on by default) for integration tests.

use async_trait::async_trait;
use std::path::Path;

use mockall::{automock, predicate::*};

/// Error type returned by sink implementations (simple boxed error, like the HTTP layer produces).
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Capability for writing objects into a bucket.
///
/// Implemented by the GCS client and by test mocks/recorders.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectSink: Send + Sync {
    /// Upload the bytes of `local_path` to `destination_key`, creating or overwriting the object.
    async fn put_object(&self, local_path: &Path, destination_key: &str)
        -> Result<(), SinkError>;

    /// Set the content-type attribute on an already written object.
    async fn set_content_type(
        &self,
        destination_key: &str,
        content_type: &str,
    ) -> Result<(), SinkError>;
}
