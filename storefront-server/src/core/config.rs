use crate::auth::JwtConfig;
use crate::core::{Result, ServerError};
use crate::orders::PlacementSettings;
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置 - 店铺服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/storefront.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | ORDER_TX_TIMEOUT_MS | 15000 | 下单事务超时(毫秒) |
/// | ORDER_CONFLICT_RETRIES | 3 | 写冲突重试次数 |
/// | DEFAULT_COUNTRY | Pakistan | 收货地址默认国家 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志文件目录 |
/// | JWT_SECRET / JWT_ISSUER / JWT_AUDIENCE / JWT_EXPIRATION_MINUTES | | JWT 配置 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/storefront HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// 数据库文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 下单事务超时时间 (毫秒)，覆盖整个事务及其重试
    pub order_tx_timeout_ms: u64,
    /// 写冲突后重新执行事务的次数
    pub order_conflict_retries: u32,
    /// 收货地址未填写国家时使用
    pub default_country: String,
    /// 日志级别
    pub log_level: String,
    /// 日志文件目录 (None 则只输出到控制台)
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Result<Self> {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("storefront.db")
                .to_string_lossy()
                .into_owned()
        });
        let jwt = JwtConfig::from_env().map_err(|e| ServerError::Config(e.to_string()))?;

        Ok(Self {
            work_dir,
            database_path,
            http_port: env_or("HTTP_PORT", 3000),
            jwt,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            order_tx_timeout_ms: env_or("ORDER_TX_TIMEOUT_MS", 15000),
            order_conflict_retries: env_or("ORDER_CONFLICT_RETRIES", 3),
            default_country: std::env::var("DEFAULT_COUNTRY")
                .ok()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "Pakistan".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        })
    }

    /// 测试用配置：固定 JWT 密钥，不读取环境变量
    pub fn for_tests(database_path: impl Into<String>) -> Self {
        Self {
            work_dir: ".".into(),
            database_path: database_path.into(),
            http_port: 0,
            jwt: JwtConfig {
                secret: "storefront-test-secret-0123456789abcdef".into(),
                expiration_minutes: 60,
                issuer: "storefront".into(),
                audience: "storefront-clients".into(),
            },
            environment: "test".into(),
            request_timeout_ms: 30000,
            order_tx_timeout_ms: 15000,
            order_conflict_retries: 3,
            default_country: "Pakistan".into(),
            log_level: "debug".into(),
            log_dir: None,
        }
    }

    /// 下单事务参数
    pub fn placement_settings(&self) -> PlacementSettings {
        PlacementSettings {
            tx_timeout: Duration::from_millis(self.order_tx_timeout_ms),
            conflict_retries: self.order_conflict_retries,
            default_country: self.default_country.clone(),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
