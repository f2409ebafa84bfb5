//! gcs-upload: build-pipeline step that publishes a directory of artifacts to a
//! Google Cloud Storage bucket.
//!
//! The destination folder depends on what triggered the build (see [`target`]); the
//! upload loop itself lives in [`upload`] and writes through the [`contract::ObjectSink`]
//! capability, implemented for GCS in [`gcs`].

pub mod cli;
pub mod content_type;
pub mod contract;
pub mod credentials;
pub mod error;
pub mod gcs;
pub mod load_config;
pub mod path_utils;
pub mod target;
pub mod upload;

pub use contract::{ObjectSink, SinkError};
pub use error::UploadError;
pub use target::{BuildContext, BuildEvent, TriggerContext};
pub use upload::{run, UploadTask};
