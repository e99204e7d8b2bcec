use anyhow::{anyhow, Result};
use paperhub_common::{optional_env_var, EnvVars};

pub struct ApiServerEnv {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Result<Self> {
        let port = optional_env_var("PORT", "3033")
            .parse()
            .map_err(|e| anyhow!("PORT is not a valid port number: {}", e))?;

        let cors_origins = optional_env_var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self { port, cors_origins })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "PORT" => Some(self.port.to_string()),
            "CORS_ORIGINS" => Some(self.cors_origins.join(",")),
            _ => None,
        }
    }
}
