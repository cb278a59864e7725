//! 调用上下文
//!
//! `CallContext` 描述一次进入的调用，`CorrelatedContext` 是拦截器在调用入口
//! 盖上请求 ID 与开始时间后的只读视图。日志输出和耗时计算只接受后者，
//! 所以"读取时缺少关联信息"在类型上不可能出现。

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tonic::Request;

use crate::correlation::{RequestId, RequestIdGenerator};

/// 一元调用的服务端信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryServerInfo {
    /// 完整方法名，如 `/pkg.Service/Method`
    pub full_method: String,
}

impl UnaryServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }
}

/// 进入的调用上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    peer: Option<SocketAddr>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(peer: SocketAddr) -> Self {
        Self { peer: Some(peer) }
    }

    /// 从 tonic 请求提取对端地址
    pub fn from_request<T>(req: &Request<T>) -> Self {
        Self {
            peer: req.remote_addr(),
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// 客户端地址，未知时为空字符串
    pub fn client_ip(&self) -> String {
        self.peer.map(|addr| addr.to_string()).unwrap_or_default()
    }

    /// 盖上开始时间和请求 ID，返回新的视图，自身不变
    pub fn correlate(&self, now: DateTime<Local>, ids: &RequestIdGenerator) -> CorrelatedContext {
        CorrelatedContext {
            call: self.clone(),
            inner: Arc::new(Correlation {
                request_begin: now,
                request_id: ids.generate(&now),
            }),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Correlation {
    request_begin: DateTime<Local>,
    request_id: RequestId,
}

/// 已关联的调用上下文
///
/// 克隆只复制引用，请求 ID 和开始时间在整个调用期间不变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedContext {
    call: CallContext,
    inner: Arc<Correlation>,
}

impl CorrelatedContext {
    pub fn call(&self) -> &CallContext {
        &self.call
    }

    pub fn request_begin(&self) -> DateTime<Local> {
        self.inner.request_begin
    }

    pub fn request_id(&self) -> &RequestId {
        &self.inner.request_id
    }

    pub fn client_ip(&self) -> String {
        self.call.client_ip()
    }

    /// 读取拦截器放入请求扩展中的上下文
    pub fn from_request<T>(req: &Request<T>) -> Option<&CorrelatedContext> {
        req.extensions().get::<CorrelatedContext>()
    }
}
