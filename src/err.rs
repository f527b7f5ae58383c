use crate::Totals;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStreamError;
use snafu::{Backtrace, Snafu};
use std::{fmt, io, path::PathBuf};

#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum Error {
    #[snafu(display("Io error: {}: {}", description, source))]
    Io {
        source: io::Error,
        description: String,
        backtrace: Backtrace,
    },
    /// Error from the directory traversal itself (unreadable directory, failed stat, ...)
    #[snafu(display("Error walking directory: {}", source))]
    Walk { source: walkdir::Error },
    #[snafu(display("Reading '{}' into request body: {}", path.display(), source))]
    ReadBody {
        path: PathBuf,
        source: ByteStreamError,
    },

    // AWS SDK Errors
    #[snafu(display("S3 'put object' error on key '{}': {}", key, source))]
    PutObject {
        source: SdkError<PutObjectError>,
        key: String,
        backtrace: Backtrace,
    },
    #[snafu(display("S3 'create bucket' error on bucket '{}': {}", bucket, source))]
    CreateBucket {
        source: SdkError<CreateBucketError>,
        bucket: String,
    },

    #[snafu(display("Upload was cancelled"))]
    Cancelled,

    // Configuration errors
    #[snafu(display("Reading config file '{}': {}", path.display(), source))]
    ReadConfig { path: PathBuf, source: io::Error },
    #[snafu(display("Parsing config file '{}': {}", path.display(), source))]
    ParseConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[snafu(display("Resolving the current directory: {}", source))]
    CurrentDir { source: io::Error },
    #[snafu(display("Missing required setting '{}'", name))]
    MissingSetting { name: String },
    #[snafu(display("Invalid setting '{}': {}", name, reason))]
    InvalidSetting { name: String, reason: String },

    /// Failure reported by a non-AWS object store implementation
    #[snafu(display("Object store error: {}", source))]
    AnyError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A run that stopped before the walk was exhausted.
///
/// `totals` counts only the files that were uploaded strictly before `error` occurred.
#[derive(Debug)]
pub struct Aborted {
    pub totals: Totals,
    pub error: Error,
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error uploading {} files and {} bytes: {}",
            self.totals.files, self.totals.bytes, self.error
        )
    }
}

impl std::error::Error for Aborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
