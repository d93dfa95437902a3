use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix
            .add_source(Environment::with_prefix("APP").separator("_"))
            .set_default("data_dir", "data")?
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("admin_name", "Administrator")?
            .set_default("admin_email", "admin@example.com")?
            .set_default("admin_password", "default-password-change-me")?
            .build()?;

        config.try_deserialize()
    }
}
