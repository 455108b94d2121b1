use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub issuer: IssuerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// 开票流程参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// 单次匹配最多尝试的选取次数, 超出即放弃
    pub max_search_steps: u64,
    /// 并发冲突时的最大重试次数
    pub max_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/gst_invoice".to_string(),
                max_connections: 20,
                run_migrations: true,
            },
            issuer: IssuerConfig::default(),
        }
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            max_search_steps: 1_000_000,
            max_retries: 3,
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/default.toml (可选) -> APP_* 环境变量 -> 兼容旧变量名
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.run_migrations", defaults.database.run_migrations)?
            .set_default("issuer.max_search_steps", defaults.issuer.max_search_steps.to_string())?
            .set_default("issuer.max_retries", i64::from(defaults.issuer.max_retries))?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .build()?
            .try_deserialize()
    }
}
