//! The single, immutable configuration of one discovery pass.
//!
//! Values come from the optional YAML file first, the `ecs` command line
//! flags are merged on top of it afterwards.

use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use exitcode::ExitCode;
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_OUTPUT: &str = "/tmp/test.json";
const DEFAULT_DOMAIN_SUFFIX: &str = "ali-netbase.com";
const DEFAULT_EXPORTER_PORT: u16 = 9100;

const fn default_page_size() -> NonZeroU32 {
    match NonZeroU32::new(10) {
        Some(size) => size,
        None => unreachable!(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read config file {path:?} failed, {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config file {path:?} failed, {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid tag filter {0:?}, expect key=value")]
    InvalidTagFilter(String),

    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    PageSize(u32),

    #[error("both access_key_id and access_key_secret must be set")]
    IncompleteCredentials,

    #[error(transparent)]
    Credentials(#[from] aliyun::ConfigError),
}

impl Error {
    pub fn exit_code(&self) -> ExitCode {
        exitcode::CONFIG
    }
}

/// An exact `key=value` match on instance tags, applied by the API.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagFilter {
    pub key: String,
    pub value: String,
}

impl FromStr for TagFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(TagFilter {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(Error::InvalidTagFilter(s.to_string())),
        }
    }
}

impl TryFrom<String> for TagFilter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagFilter> for String {
    fn from(filter: TagFilter) -> Self {
        filter.to_string()
    }
}

impl Display for TagFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Credentials and endpoints. Anything left empty falls back to the
/// environment or the aliyun cli profile.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AliyunConfig {
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub region_id: Option<String>,

    /// Name of a profile in `~/.aliyun/config.json`
    pub profile: Option<String>,

    pub ecs_endpoint: Option<String>,
    pub vpc_endpoint: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the `file_sd` document is written
    pub output: PathBuf,

    /// Prepended with a `_` to every tag derived label key and to `vpc`
    pub label_prefix: String,

    pub instance_name: Option<String>,

    pub page_size: NonZeroU32,

    pub tags: Vec<TagFilter>,

    /// Regex patterns, an instance name must match at least one of them
    pub include_names: Vec<String>,
    pub exclude_tag_keys: Vec<String>,
    pub exclude_tag_values: Vec<String>,

    pub domain_suffix: String,
    pub exporter_port: u16,

    pub aliyun: AliyunConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output: PathBuf::from(DEFAULT_OUTPUT),
            label_prefix: String::new(),
            instance_name: None,
            page_size: default_page_size(),
            tags: vec![],
            include_names: vec![],
            exclude_tag_keys: vec![],
            exclude_tag_values: vec![],
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
            exporter_port: DEFAULT_EXPORTER_PORT,
            aliyun: AliyunConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Config::from_yaml(&content).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Config, serde_yaml::Error> {
        // an empty document is not an error, everything takes the default
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size.get() > MAX_PAGE_SIZE {
            return Err(Error::PageSize(self.page_size.get()));
        }

        let aliyun = &self.aliyun;
        if aliyun.access_key_id.is_some() != aliyun.access_key_secret.is_some() {
            return Err(Error::IncompleteCredentials);
        }

        Ok(())
    }

    /// Keys of the config file win, then the named profile, then the
    /// environment and the current aliyun cli profile. `region_id` of the
    /// config file overrides whatever region the credentials came with.
    pub fn credentials(&self) -> Result<aliyun::Config, Error> {
        let aliyun = &self.aliyun;

        let mut resolved = match (
            &aliyun.access_key_id,
            &aliyun.access_key_secret,
            &aliyun.profile,
        ) {
            (Some(access_key_id), Some(access_key_secret), _) => aliyun::Config {
                credentials: aliyun::Credentials {
                    access_key_id: access_key_id.clone(),
                    access_key_secret: access_key_secret.clone(),
                },
                region_id: String::new(),
            },
            (None, None, Some(profile)) => aliyun::Config::from_profile(profile)?,
            (None, None, None) => aliyun::Config::load()?,
            _ => return Err(Error::IncompleteCredentials),
        };

        if let Some(region_id) = &aliyun.region_id {
            resolved.region_id = region_id.clone();
        }
        if resolved.region_id.is_empty() {
            resolved.region_id = aliyun::DEFAULT_REGION.to_string();
        }

        Ok(resolved)
    }
}
