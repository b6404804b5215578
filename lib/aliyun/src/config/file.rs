use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{Config, Credentials};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read the aliyun cli config
    #[error("failed to read '{1:?}': {0}")]
    ReadFile(#[source] std::io::Error, PathBuf),
    /// Failed to parse the aliyun cli config
    #[error("failed to parse aliyun config json: {0}")]
    Parse(#[source] serde_json::Error),
    /// Failed to determine current profile
    #[error("failed to determine current profile")]
    CurrentProfileNotSet,
    /// The named profile does not exist
    #[error("failed to find profile: {0}")]
    FindProfile(String),
    /// Only AccessKey profiles can be used for signing
    #[error("profile {0} uses unsupported credential mode {1}, only AK is supported")]
    UnsupportedMode(String, String),
    #[error("profile {0} has no access key")]
    MissingAccessKey(String),
}

/// One entry of `profiles` in `~/.aliyun/config.json`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Profile {
    pub name: String,

    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub access_key_secret: String,

    #[serde(default)]
    pub region_id: String,
}

#[derive(Debug, Deserialize)]
struct CliConfig {
    #[serde(default)]
    current: String,

    #[serde(default)]
    profiles: Vec<Profile>,
}

pub fn from_config(path: PathBuf, profile: Option<&str>) -> Result<Config, Error> {
    let data = std::fs::read(&path).map_err(|err| Error::ReadFile(err, path.clone()))?;
    let cli_config = serde_json::from_slice::<CliConfig>(&data).map_err(Error::Parse)?;

    let name = match profile {
        Some(name) => name,
        None if cli_config.current.is_empty() => return Err(Error::CurrentProfileNotSet),
        None => cli_config.current.as_str(),
    };

    let profile = cli_config
        .profiles
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::FindProfile(name.to_string()))?;

    // older cli versions do not write the mode
    if !profile.mode.is_empty() && profile.mode != "AK" {
        return Err(Error::UnsupportedMode(
            profile.name.clone(),
            profile.mode.clone(),
        ));
    }

    if profile.access_key_id.is_empty() || profile.access_key_secret.is_empty() {
        return Err(Error::MissingAccessKey(profile.name.clone()));
    }

    debug!(message = "load credentials from aliyun profile", ?path, profile = name);

    Ok(Config {
        credentials: Credentials {
            access_key_id: profile.access_key_id.clone(),
            access_key_secret: profile.access_key_secret.clone(),
        },
        region_id: profile.region_id.clone(),
    })
}
