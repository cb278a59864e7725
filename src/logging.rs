//! tracing 订阅器初始化

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::{AccessLogError, Result};

/// 构建过滤器，`RUST_LOG` 优先于配置中的默认指令
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            AccessLogError::logging(format!("invalid filter `{}`: {err}", config.level))
        }),
    }
}

/// 安装全局订阅器
///
/// 已经存在全局订阅器时返回错误而不是 panic
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|err| AccessLogError::logging(err.to_string()))
}
