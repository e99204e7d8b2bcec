use std::path::PathBuf;

use anyhow::Result;
use paperhub_common::{optional_env_var, EnvVars};

pub const DEFAULT_PAPERS_DIR: &str = "app/data/papers";

#[derive(Debug, Clone)]
pub struct CrawlerEnv {
    pub papers_dir: PathBuf,
}

impl EnvVars for CrawlerEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            papers_dir: PathBuf::from(optional_env_var("PAPERS_DIR", DEFAULT_PAPERS_DIR)),
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "PAPERS_DIR" => Some(self.papers_dir.display().to_string()),
            _ => None,
        }
    }
}
