use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{AccessLogError, Result};

/// 访问日志配置
///
/// 所有字段都有默认值，空配置即可得到标准的 `[RPC]` 行格式
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// 每行开头的标记
    pub line_prefix: String,
    /// 请求 ID 前缀
    pub request_id_prefix: String,
    /// chrono 时间格式
    pub time_format: String,
    /// 客户端地址列宽（右对齐）
    pub client_ip_width: usize,
    /// 耗时列宽（右对齐）
    pub duration_width: usize,
    pub logging: LoggingConfig,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            line_prefix: DEFAULT_LINE_PREFIX.to_string(),
            request_id_prefix: DEFAULT_REQUEST_ID_PREFIX.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            client_ip_width: DEFAULT_CLIENT_IP_WIDTH,
            duration_width: DEFAULT_DURATION_WIDTH,
            logging: LoggingConfig::default(),
        }
    }
}

pub const DEFAULT_LINE_PREFIX: &str = "[RPC]";
pub const DEFAULT_REQUEST_ID_PREFIX: &str = "req-";
pub const DEFAULT_TIME_FORMAT: &str = "%Y/%m/%d - %H:%M:%S";
pub const DEFAULT_CLIENT_IP_WIDTH: usize = 15;
pub const DEFAULT_DURATION_WIDTH: usize = 13;

/// tracing 订阅器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认过滤指令，`RUST_LOG` 存在时以其为准
    pub level: String,
    /// 是否输出 JSON
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AccessLogConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AccessLogError::ConfigIo {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AccessLogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    ///
    /// 前缀中出现换行会破坏一行一条记录的格式
    pub fn validate(&self) -> Result<()> {
        if self.time_format.trim().is_empty() {
            return Err(AccessLogError::invalid_config(
                "time_format",
                "must not be empty",
            ));
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(AccessLogError::invalid_config(
                "time_format",
                format!("unsupported specifier in `{}`", self.time_format),
            ));
        }
        if self.line_prefix.contains('\n') {
            return Err(AccessLogError::invalid_config(
                "line_prefix",
                "must not contain a newline",
            ));
        }
        if self.request_id_prefix.contains('\n') {
            return Err(AccessLogError::invalid_config(
                "request_id_prefix",
                "must not contain a newline",
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(AccessLogError::invalid_config(
                "logging.level",
                "must not be empty",
            ));
        }
        Ok(())
    }
}
