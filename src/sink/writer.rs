use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use tracing::warn;

use super::{LogSink, render_time};
use crate::config::AccessLogConfig;
use crate::context::{CorrelatedContext, UnaryServerInfo};

/// 字节流输出
///
/// 每条记录先完整格式化，再在锁内一次写出，并发调用的行不会交错撕裂
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
    line_prefix: String,
    time_format: String,
    client_ip_width: usize,
}

impl WriterSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self::with_config(writer, &AccessLogConfig::default())
    }

    pub fn with_config(writer: impl Write + Send + 'static, config: &AccessLogConfig) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            line_prefix: config.line_prefix.clone(),
            time_format: config.time_format.clone(),
            client_ip_width: config.client_ip_width,
        }
    }

    /// 输出到标准输出
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// 未指定输出目标时使用标准输出
    pub fn from_option(writer: Option<Box<dyn Write + Send>>, config: &AccessLogConfig) -> Self {
        match writer {
            Some(writer) => Self::with_config(writer, config),
            None => Self::with_config(io::stdout(), config),
        }
    }

    fn format_line(
        &self,
        ctx: &CorrelatedContext,
        timestamp: &DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    ) -> String {
        format!(
            "{} {} | {:>width$} | {} | {} | {}",
            self.line_prefix,
            render_time(timestamp, &self.time_format),
            ctx.client_ip(),
            ctx.request_id(),
            info.full_method,
            args,
            width = self.client_ip_width,
        )
    }
}

impl Default for WriterSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for WriterSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("line_prefix", &self.line_prefix)
            .field("time_format", &self.time_format)
            .field("client_ip_width", &self.client_ip_width)
            .finish_non_exhaustive()
    }
}

impl LogSink for WriterSink {
    fn emit(
        &self,
        ctx: &CorrelatedContext,
        timestamp: DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    ) {
        let line = self.format_line(ctx, &timestamp, info, args);

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            warn!(
                request_id = %ctx.request_id(),
                method = %info.full_method,
                error = %err,
                "Failed to write access log line"
            );
        }
    }
}
