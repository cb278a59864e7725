//! gRPC 拦截器模块
//!
//! 提供一元调用的访问日志拦截器

pub mod access_log;

pub use access_log::AccessLogInterceptor;
