//! 访问日志错误处理模块
//!
//! 拦截器本身从不让调用失败，这里的错误只来自配置加载和日志订阅器初始化

use thiserror::Error;

/// 访问日志统一错误类型
#[derive(Error, Debug)]
pub enum AccessLogError {
    /// 配置文件读取失败
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置值不合法
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// 日志订阅器初始化失败
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl AccessLogError {
    /// 创建配置值错误
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        AccessLogError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// 创建日志初始化错误
    pub fn logging(msg: impl Into<String>) -> Self {
        AccessLogError::Logging(msg.into())
    }
}

/// 访问日志结果类型
pub type Result<T> = std::result::Result<T, AccessLogError>;
