use crate::{err, Error, DEFAULT_REGION};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Object store endpoint, `host:port` or a full URL
    pub endpoint: String,
    #[serde(alias = "accesskeyid")]
    pub access_key_id: String,
    #[serde(alias = "secretaccesskey")]
    pub secret_access_key: String,
    /// Use https when `endpoint` carries no scheme
    pub secure: bool,
    /// Directory whose contents are uploaded
    pub data_path: PathBuf,
    /// Target bucket. A random name is generated when left empty.
    #[serde(alias = "bucketname")]
    pub bucket_name: String,
    pub region: String,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:9000".to_owned(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            secure: false,
            data_path: PathBuf::from("dist/"),
            bucket_name: String::new(),
            region: DEFAULT_REGION.to_owned(),
        }
    }
}

impl Config {
    /// Read a YAML config file. Fields missing from the file keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).context(err::ReadConfig { path })?;
        Self::from_yaml(&contents).context(err::ParseConfig { path })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Fill in what the user did not: an absolute `data_path`, and a random bucket name.
    pub fn resolve(mut self) -> Result<Self, Error> {
        if !self.data_path.is_absolute() {
            self.data_path = std::env::current_dir()
                .context(err::CurrentDir)?
                .join(&self.data_path);
        }
        if self.bucket_name.is_empty() {
            self.bucket_name = uuid::Uuid::new_v4().to_string();
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("endpoint", &self.endpoint),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("region", &self.region),
        ] {
            if value.is_empty() {
                return Err(Error::MissingSetting {
                    name: name.to_owned(),
                });
            }
        }
        if !self.data_path.is_dir() {
            return Err(Error::InvalidSetting {
                name: "data_path".to_owned(),
                reason: format!("'{}' is not a directory", self.data_path.display()),
            });
        }
        Ok(())
    }

    /// The endpoint as a URL, with a scheme chosen by `secure` if it has none.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else if self.secure {
            format!("https://{}", self.endpoint)
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}
