use crate::*;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use snafu::ResultExt;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::{Arc, Mutex},
};

/// A stored object: its content and content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store. Clones share the same state.
///
/// `put_object` fails on the call with index `fail_put_at` (counting from 0), and
/// `create_bucket` fails with an access error if `fail_create_bucket` is set.
/// `remove_on_put` deletes a local file or directory during the put with the given index, so the
/// walk that is still in progress runs into it.
#[derive(Clone, Debug, Default)]
pub struct S3Mock {
    buckets: Arc<Mutex<BTreeSet<String>>>,
    objects: Arc<Mutex<BTreeMap<(String, String), MockObject>>>,
    /// Keys in the order `put_object` was called, including the failed call
    puts: Arc<Mutex<Vec<String>>>,
    fail_put_at: Option<usize>,
    fail_create_bucket: bool,
    remove_on_put: Option<(usize, PathBuf)>,
}
impl S3Mock {
    pub fn new() -> S3Mock {
        S3Mock::default()
    }
    pub fn with_bucket(self, bucket: &str) -> S3Mock {
        self.buckets.lock().unwrap().insert(bucket.to_owned());
        self
    }
    pub fn failing_put_at(mut self, index: usize) -> S3Mock {
        self.fail_put_at = Some(index);
        self
    }
    pub fn failing_create_bucket(mut self) -> S3Mock {
        self.fail_create_bucket = true;
        self
    }
    pub fn removing_on_put(mut self, index: usize, path: PathBuf) -> S3Mock {
        self.remove_on_put = Some((index, path));
        self
    }
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains(bucket)
    }
    /// All objects in `bucket`, by key
    pub fn objects(&self, bucket: &str) -> BTreeMap<String, MockObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .map(|((_, key), object)| (key.clone(), object.clone()))
            .collect()
    }
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

impl ObjectStore for S3Mock {
    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<BucketStatus, Error> {
        if self.fail_create_bucket {
            return Err(Error::AnyError {
                source: "AccessDenied".into(),
            });
        }
        if self.buckets.lock().unwrap().insert(bucket.to_owned()) {
            Ok(BucketStatus::Created)
        } else {
            Ok(BucketStatus::AlreadyExists)
        }
    }

    async fn put_object(&self, request: PutRequest) -> Result<u64, Error> {
        let index = {
            let mut puts = self.puts.lock().unwrap();
            puts.push(request.key.clone());
            puts.len() - 1
        };
        if let Some((_, path)) = self.remove_on_put.as_ref().filter(|(at, _)| *at == index) {
            if path.is_dir() {
                std::fs::remove_dir_all(path).unwrap();
            } else {
                std::fs::remove_file(path).unwrap();
            }
        }
        if self.fail_put_at == Some(index) {
            return Err(SdkError::<PutObjectError>::construction_failure(
                "simulated failure",
            ))
            .context(err::PutObject { key: request.key });
        }
        if !self.has_bucket(&request.bucket) {
            return Err(Error::AnyError {
                source: format!("NoSuchBucket: {}", request.bucket).into(),
            });
        }
        let data = request
            .body
            .collect()
            .await
            .map_err(|e| Error::AnyError {
                source: Box::new(e),
            })?
            .to_vec();
        assert_eq!(data.len() as u64, request.content_length);
        let len = data.len() as u64;
        self.objects.lock().unwrap().insert(
            (request.bucket, request.key),
            MockObject {
                data,
                content_type: request.content_type,
            },
        );
        Ok(len)
    }
}
