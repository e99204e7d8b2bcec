mod client;
mod env;

pub use client::ModuleClient;
pub use env::{EnvVars, optional_env_var, required_env_var};
