//! # S3 directory upload
//! Upload every regular file under a local directory to a bucket in an S3-compatible object
//! store, using the path relative to the directory as the object key.
//!
//! - Make sure the bucket exists with `Uploader::provision_bucket`.
//! - Upload a directory tree with `Uploader::upload_dir`, or the two steps at once with
//!   `Uploader::run`.
//!
//! Uploads are sequential and fail fast: the first error aborts the run, and the
//! [`Aborted`](err::Aborted) error still reports how many files and bytes made it before that.

use std::{fmt, path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;

pub mod cli;
mod config;
pub mod err;
mod store;
mod upload;

pub use config::*;
pub use err::{Aborted, Error};
pub use store::*;
pub use upload::*;

#[cfg(test)]
mod mock;

/// Content type given to every uploaded object.
pub const CONTENT_TYPE: &str = "application/octet-stream";
/// Files whose name ends with this suffix are never uploaded (macOS Finder metadata).
pub const IGNORED_SUFFIX: &str = ".DS_Store";

/// Uploads directory trees to one bucket of an [`ObjectStore`].
#[derive(Clone)]
pub struct Uploader<S> {
    s3: S,
    bucket: String,
    region: String,
}
impl<S> Uploader<S> {
    pub fn new(s3: S, bucket: String) -> Self {
        Self {
            s3,
            bucket,
            region: DEFAULT_REGION.to_owned(),
        }
    }
    pub fn with_config(s3: S, config: &Config) -> Self {
        Self {
            s3,
            bucket: config.bucket_name.clone(),
            region: config.region.clone(),
        }
    }
}

/// Running totals of a directory upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// Number of files uploaded
    pub files: u64,
    /// Sum of the bytes accepted by the store
    pub bytes: u64,
}
impl Totals {
    fn record(&mut self, report: &RequestReport) {
        self.files += 1;
        self.bytes += report.size;
    }
}

/// Result of a single successful file upload.
#[derive(Debug, Clone)]
pub struct RequestReport {
    /// The number of this file in the upload, starting at 0
    pub seq: usize,
    /// Object key the file was stored under
    pub key: String,
    /// Bytes accepted by the store
    pub size: u64,
    /// Time spent on the request, including opening the file
    pub total_time: Duration,
}

/// Event passed to the progress closure of [`Uploader::upload_dir`], once per file.
#[derive(Debug, Clone)]
pub enum Progress {
    Uploaded(RequestReport),
    Failed { key: String },
}

/// The line printed for each file.
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Uploaded(report) => write!(
                f,
                " - successfully uploaded '{}' ({} bytes in {:.2?})",
                report.key, report.size, report.total_time
            ),
            Progress::Failed { key } => write!(f, " - error while uploading '{}'", key),
        }
    }
}

impl<S: ObjectStore> Uploader<S> {
    /// Provision the bucket, then upload all files under `root`.
    ///
    /// A provisioning failure aborts the run before any file is visited.
    pub async fn run<P>(
        &self,
        root: PathBuf,
        progress: P,
        cancel: &CancellationToken,
    ) -> Result<Totals, Aborted>
    where
        P: FnMut(Progress),
    {
        if let Err(error) = self.provision_bucket().await {
            return Err(Aborted {
                totals: Totals::default(),
                error,
            });
        }
        self.upload_dir(root, progress, cancel).await
    }

    /// Create the bucket unless it already exists.
    pub async fn provision_bucket(&self) -> Result<BucketStatus, Error> {
        let status = self.s3.create_bucket(&self.bucket, &self.region).await?;
        match status {
            BucketStatus::Created => {
                tracing::info!(bucket = %self.bucket, region = %self.region, "created bucket")
            }
            BucketStatus::AlreadyExists => {
                tracing::info!(bucket = %self.bucket, "bucket already exists")
            }
        }
        Ok(status)
    }
}
