use anyhow::Result;
use paperhub_common::{required_env_var, EnvVars};

pub struct DatabaseEnv {
    pub database_url: String,
}

impl EnvVars for DatabaseEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            database_url: required_env_var("DATABASE_URL")?,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "DATABASE_URL" => Some(self.database_url.clone()),
            _ => None,
        }
    }
}
