use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// token 有效期，毫秒。启动时校验 >= 1。
    pub jwt_expiration_ms: i64,
    pub server_host: String,
    pub server_port: u16,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_expiration_ms = env::var("JWT_EXPIRATION_MS")
            .unwrap_or_else(|_| "3600000".to_string())
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid("JWT_EXPIRATION_MS", e.to_string()))?;
        if jwt_expiration_ms < 1 {
            return Err(ConfigError::Invalid(
                "JWT_EXPIRATION_MS",
                format!("must be >= 1, got {}", jwt_expiration_ms),
            ));
        }

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid("SERVER_PORT", e.to_string()))?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            // 允许为空，TokenService 会替换弱密钥并告警
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            jwt_expiration_ms,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".to_string()),
            server_port,
        })
    }
}
