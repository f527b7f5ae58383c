//! The `ObjectStore` trait is the only part of S3 the upload algorithm talks to.
//! `AwsStore` implements it on top of `aws_sdk_s3::Client`.
use crate::{err, Config, Error};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use snafu::futures::TryFutureExt as _;
use std::future::Future;

/// Region used when none is configured. S3 refuses a location constraint for this region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Outcome of a successful `create_bucket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

/// A single put-object request. `body` must yield exactly `content_length` bytes.
#[derive(Debug)]
pub struct PutRequest {
    pub bucket: String,
    pub key: String,
    pub body: ByteStream,
    pub content_length: u64,
    pub content_type: String,
}

pub trait ObjectStore {
    /// Create `bucket` in `region`. "Already exists" is reported as `BucketStatus::AlreadyExists`,
    /// not as an error.
    fn create_bucket(
        &self,
        bucket: &str,
        region: &str,
    ) -> impl Future<Output = Result<BucketStatus, Error>> + Send;
    /// Store the object, returning the number of bytes written.
    fn put_object(&self, request: PutRequest) -> impl Future<Output = Result<u64, Error>> + Send;
}

/// `ObjectStore` backed by the AWS SDK. Works against any S3-compatible endpoint.
#[derive(Clone, Debug)]
pub struct AwsStore {
    client: aws_sdk_s3::Client,
}

impl AwsStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client with static credentials and path-style addressing, which is what
    /// self-hosted S3 implementations such as MinIO expect.
    pub async fn from_config(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "s3-dir-upload",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        Self::new(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

impl ObjectStore for AwsStore {
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<BucketStatus, Error> {
        let request = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(bucket_configuration(region));
        match request.send().await {
            Ok(_) => Ok(BucketStatus::Created),
            Err(e) if e.as_service_error().map_or(false, bucket_exists) => {
                Ok(BucketStatus::AlreadyExists)
            }
            Err(e) => Err(Error::CreateBucket {
                source: e,
                bucket: bucket.to_owned(),
            }),
        }
    }

    async fn put_object(&self, request: PutRequest) -> Result<u64, Error> {
        let PutRequest {
            bucket,
            key,
            body,
            content_length,
            content_type,
        } = request;
        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(body)
            .content_length(content_length as i64)
            .content_type(content_type)
            .send()
            .context(err::PutObject { key })
            .await?;
        Ok(content_length)
    }
}

/// The location constraint to send with `CreateBucket`; none for [`DEFAULT_REGION`].
pub fn bucket_configuration(region: &str) -> Option<CreateBucketConfiguration> {
    if region == DEFAULT_REGION {
        None
    } else {
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        )
    }
}

/// Whether a `CreateBucket` failure only means that the bucket is already there.
pub fn bucket_exists(err: &CreateBucketError) -> bool {
    err.is_bucket_already_owned_by_you() || err.is_bucket_already_exists()
}
