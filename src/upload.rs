use crate::*;
use aws_sdk_s3::primitives::{ByteStream, Length};
use futures_stopwatch::try_stopwatch;
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

impl<S: ObjectStore> Uploader<S> {
    /// Upload all files under `root`, one at a time, in traversal order.
    ///
    /// Each file is stored under its path relative to `root` (see [`s3_key`]). Directories,
    /// symbolic links and files ending in [`IGNORED_SUFFIX`] are not uploaded.
    ///
    /// `progress` is called once for every file that was attempted, with a [`Progress::Uploaded`]
    /// report carrying its sequence number and size, or a [`Progress::Failed`] for the file that
    /// ended the run.
    ///
    /// The first error (traversal, opening a file or the upload itself) stops the walk; the
    /// returned [`Aborted`] holds the totals of everything uploaded before it. `cancel` is checked
    /// before each entry is visited.
    pub async fn upload_dir<P>(
        &self,
        root: PathBuf,
        mut progress: P,
        cancel: &CancellationToken,
    ) -> Result<Totals, Aborted>
    where
        P: FnMut(Progress),
    {
        let mut totals = Totals::default();
        let mut files = files_recursive(root);
        loop {
            if cancel.is_cancelled() {
                tracing::warn!(files = totals.files, "upload cancelled");
                return Err(Aborted {
                    totals,
                    error: Error::Cancelled,
                });
            }
            let src = match files.next() {
                None => break,
                Some(Ok(src)) => src,
                Some(Err(error)) => {
                    tracing::error!(%error, "directory traversal failed");
                    return Err(Aborted { totals, error });
                }
            };
            match self.upload_file(&src).await {
                Ok((size, total_time)) => {
                    let report = RequestReport {
                        seq: totals.files as usize,
                        key: src.key,
                        size,
                        total_time,
                    };
                    totals.record(&report);
                    progress(Progress::Uploaded(report));
                }
                Err(error) => {
                    tracing::error!(key = %src.key, %error, "upload failed");
                    progress(Progress::Failed { key: src.key });
                    return Err(Aborted { totals, error });
                }
            }
        }
        tracing::debug!(files = totals.files, bytes = totals.bytes, "upload complete");
        Ok(totals)
    }

    /// Upload a single file, returning the bytes written and the time it took.
    pub async fn upload_file(&self, src: &ObjectSource) -> Result<(u64, Duration), Error> {
        try_stopwatch(async {
            let (body, len) = src.create_stream().await?;
            tracing::debug!(key = %src.key, len, "uploading");
            self.s3
                .put_object(PutRequest {
                    bucket: self.bucket.clone(),
                    key: src.key.clone(),
                    body,
                    content_length: len,
                    content_type: CONTENT_TYPE.to_owned(),
                })
                .await
        })
        .await
    }
}

/// A local file and the key it is uploaded under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSource {
    pub path: PathBuf,
    pub key: String,
}
impl ObjectSource {
    pub fn file(path: PathBuf, key: String) -> Self {
        Self { path, key }
    }
    /// Open the file and stream it. The length comes from the file's metadata.
    pub async fn create_stream(&self) -> Result<(ByteStream, u64), Error> {
        let file = tokio::fs::File::open(&self.path).await.with_context({
            let path = self.path.clone();
            move || err::Io {
                description: path.display().to_string(),
            }
        })?;
        let metadata = file.metadata().await.with_context({
            let path = self.path.clone();
            move || err::Io {
                description: path.display().to_string(),
            }
        })?;

        let len = metadata.len();

        let stream = ByteStream::read_from()
            .file(file)
            .length(Length::Exact(len))
            .build()
            .await
            .context(err::ReadBody { path: &self.path })?;
        Ok((stream, len))
    }
}

/// The object key of `current`: its path relative to `root`.
///
/// Separators are kept as the filesystem writes them. If `current` is not strictly under `root`
/// (including `current == root`) it is returned as is, so a key is never empty.
pub fn s3_key(root: &Path, current: &Path) -> String {
    match current.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative,
        _ => current,
    }
    .to_string_lossy()
    .into_owned()
}

/// Whether a directory entry with this file name must never be uploaded.
pub fn is_ignored(file_name: &std::ffi::OsStr) -> bool {
    file_name.to_string_lossy().ends_with(IGNORED_SUFFIX)
}

/// Traverse all files in directory `src_dir` (using `walkdir`), depth first and sorted by file
/// name within each directory. Yields the files to upload, with a key equal to the file's path
/// with `src_dir` stripped away.
///
/// Unlike entries that are skipped, traversal errors are yielded so the caller can stop on them.
pub fn files_recursive(src_dir: PathBuf) -> impl Iterator<Item = Result<ObjectSource, Error>> {
    walkdir::WalkDir::new(&src_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry.context(err::Walk) {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                None
            } else if is_ignored(entry.file_name()) {
                tracing::debug!(path = %entry.path().display(), "skipping ignored file");
                None
            } else if !file_type.is_file() {
                tracing::warn!(path = %entry.path().display(), "skipping non-regular file");
                None
            } else {
                let path = entry.into_path();
                let key = s3_key(&src_dir, &path);
                Some(Ok(ObjectSource::file(path, key)))
            }
        })
}
