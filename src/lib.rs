//! Flare Access Log
//!
//! Access logging for unary gRPC calls: every call gets a request id, a "before" line with the
//! serialized request and an "after" line with the elapsed time and error message, written either
//! to a byte stream or to a structured logger.

pub mod config;
pub mod context;
pub mod correlation;
pub mod error;
pub mod interceptor;
pub mod logging;
pub mod sink;
pub mod utils;

// Re-exports
pub use config::{AccessLogConfig, LoggingConfig};
pub use context::{CallContext, CorrelatedContext, UnaryServerInfo};
pub use correlation::{RequestId, RequestIdGenerator};
pub use error::{AccessLogError, Result};
pub use interceptor::AccessLogInterceptor;
pub use sink::{
    FieldLogger, Fields, LogEntry, LogSink, StructuredSink, TracingFieldLogger, WriterSink,
};
pub use utils::{Clock, SystemClock, format_elapsed};
