use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};

pub trait EnvVars: Sized {
    fn load() -> Result<Self>;
}

pub fn required_var(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} environment variable not set"))
}

/// Reads `key` and parses it, falling back to `default` when the variable is
/// absent. A present but unparsable value is an error.
pub fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        Err(_) => {
            tracing::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
