mod env;
mod file;

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

/// Used when neither the environment nor the profile names a region.
pub const DEFAULT_REGION: &str = "cn-hangzhou";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Env(#[from] env::Error),

    #[error(transparent)]
    File(#[from] file::Error),

    #[error("no credentials found, set ALICLOUD_ACCESS_KEY and ALICLOUD_SECRET_KEY or configure an aliyun cli profile")]
    NotFound,
}

/// An AccessKey pair, the secret part is never printed.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"******")
            .finish()
    }
}

/// Everything the [`Client`](crate::Client) needs to sign requests for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub credentials: Credentials,

    pub region_id: String,
}

impl Config {
    /// Environment variables first, then the current profile of the aliyun
    /// cli config file.
    pub fn load() -> Result<Config, Error> {
        if let Some(config) = env::from_env()? {
            return Ok(config);
        }

        if let Some(path) = default_profile_path()
            && path.exists()
        {
            return file::from_config(path, None).map_err(Into::into);
        }

        Err(Error::NotFound)
    }

    /// Load a named profile of the aliyun cli config file.
    pub fn from_profile(profile: &str) -> Result<Config, Error> {
        let path = default_profile_path().ok_or(Error::NotFound)?;

        file::from_config(path, Some(profile)).map_err(Into::into)
    }
}

fn default_profile_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".aliyun").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_secret() {
        let credentials = Credentials {
            access_key_id: "LTAI4Fabcdef".to_string(),
            access_key_secret: "very-secret".to_string(),
        };

        let text = format!("{credentials:?}");
        assert!(text.contains("LTAI4Fabcdef"));
        assert!(!text.contains("very-secret"));
    }
}
