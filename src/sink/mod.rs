//! 日志输出模块
//!
//! 一个能力：给定调用上下文、时间戳和格式化载荷，输出一条访问日志。
//! 两种实现：写入字节流的 [`WriterSink`] 与委托给结构化日志器的 [`StructuredSink`]。

pub mod structured;
pub mod writer;

pub use structured::{
    CLIENT_IP_FIELD, FieldLogger, Fields, LogEntry, METHOD_FIELD, REQUEST_ID_FIELD,
    StructuredSink, TIME_FIELD, TracingFieldLogger,
};
pub use writer::WriterSink;

use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::context::{CorrelatedContext, UnaryServerInfo};

/// 访问日志输出
///
/// 两种实现对 `args` 的处理完全相同，调用方不需要关心当前使用哪一种
pub trait LogSink: Send + Sync {
    fn emit(
        &self,
        ctx: &CorrelatedContext,
        timestamp: DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    );
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn emit(
        &self,
        ctx: &CorrelatedContext,
        timestamp: DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    ) {
        (**self).emit(ctx, timestamp, info, args)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn emit(
        &self,
        ctx: &CorrelatedContext,
        timestamp: DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    ) {
        (**self).emit(ctx, timestamp, info, args)
    }
}

/// 按格式渲染时间
///
/// 格式串非法时退回 RFC 3339，避免 chrono 在 `to_string` 中 panic
pub(crate) fn render_time(timestamp: &DateTime<Local>, format: &str) -> String {
    let mut rendered = String::new();
    match write!(rendered, "{}", timestamp.format(format)) {
        Ok(()) => rendered,
        Err(_) => timestamp.to_rfc3339(),
    }
}
