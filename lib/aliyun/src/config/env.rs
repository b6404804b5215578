use std::env;

use super::{Config, Credentials, DEFAULT_REGION};

const ACCESS_KEY_ENV: &str = "ALICLOUD_ACCESS_KEY";
const SECRET_KEY_ENV: &str = "ALICLOUD_SECRET_KEY";
const REGION_ENV: &str = "ALICLOUD_REGION";

/// Errors from loading credentials from the environment
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The access key is set, but the secret is not, or the other way around
    #[error("environment variable {0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),

    /// Failed to read an environment variable
    #[error("failed to read environment variable {0}, {1}")]
    ReadEnvironmentVariable(&'static str, #[source] env::VarError),
}

/// Returns `Ok(None)` when none of the credential variables are set.
pub fn from_env() -> Result<Option<Config>, Error> {
    let access_key_id = read(ACCESS_KEY_ENV)?;
    let access_key_secret = read(SECRET_KEY_ENV)?;

    let (access_key_id, access_key_secret) = match (access_key_id, access_key_secret) {
        (None, None) => return Ok(None),
        (Some(id), Some(secret)) => (id, secret),
        (Some(_), None) => return Err(Error::Incomplete(ACCESS_KEY_ENV, SECRET_KEY_ENV)),
        (None, Some(_)) => return Err(Error::Incomplete(SECRET_KEY_ENV, ACCESS_KEY_ENV)),
    };

    let region_id = read(REGION_ENV)?.unwrap_or_else(|| DEFAULT_REGION.to_string());

    Ok(Some(Config {
        credentials: Credentials {
            access_key_id,
            access_key_secret,
        },
        region_id,
    }))
}

fn read(key: &'static str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::ReadEnvironmentVariable(key, err)),
    }
}
