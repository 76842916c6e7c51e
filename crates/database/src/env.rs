use anyhow::Result;

use thebestory_common::{required_var, try_load, EnvVars};

pub struct DatabaseEnv {
    pub database_url: String,
    pub max_connections: u32,
}

impl EnvVars for DatabaseEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            database_url: required_var("DATABASE_URL")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", 5)?,
        })
    }
}
