//! Command line and environment settings, layered over an optional YAML config file.
use crate::{Config, Error};
use clap::Parser;
use std::path::PathBuf;

/// Upload a local directory to an S3-compatible bucket.
///
/// Every option can also be given through its environment variable; a flag on the command line
/// wins over the environment, which wins over the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "s3-dir-upload", version)]
pub struct Cli {
    /// YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Object store endpoint, e.g. `127.0.0.1:9000`
    #[arg(long, env = "APP_UPLOAD_ENDPOINT")]
    pub endpoint: Option<String>,
    #[arg(long = "accesskeyid", alias = "access-key-id", env = "APP_UPLOAD_ACCESS_KEY")]
    pub access_key_id: Option<String>,
    #[arg(
        long = "secretaccesskey",
        alias = "secret-access-key",
        env = "APP_UPLOAD_SECRET_KEY",
        hide_env_values = true
    )]
    pub secret_access_key: Option<String>,
    /// Use https to talk to the endpoint
    #[arg(long, env = "SECURE")]
    pub secure: Option<bool>,
    /// Directory to upload
    #[arg(long, env = "DATA_PATH")]
    pub data_path: Option<PathBuf>,
    /// Target bucket, created if missing. Defaults to a random name.
    #[arg(long = "bucketname", alias = "bucket-name", env = "APP_ASSETS_FOLDER")]
    pub bucket_name: Option<String>,
    #[arg(long, env = "APP_UPLOAD_REGION")]
    pub region: Option<String>,
}

impl Cli {
    /// Build the effective configuration: defaults, then the config file, then these settings.
    pub fn load_config(&self) -> Result<Config, Error> {
        let config = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };
        Ok(self.apply(config))
    }

    /// Override the fields of `config` that were given on the command line or in the
    /// environment.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.access_key_id {
            config.access_key_id = key.clone();
        }
        if let Some(secret) = &self.secret_access_key {
            config.secret_access_key = secret.clone();
        }
        if let Some(secure) = self.secure {
            config.secure = secure;
        }
        if let Some(path) = &self.data_path {
            config.data_path = path.clone();
        }
        if let Some(bucket) = &self.bucket_name {
            config.bucket_name = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        config
    }
}
