use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tonic::{Request, Response, Status};

use crate::config::AccessLogConfig;
use crate::context::{CallContext, CorrelatedContext, UnaryServerInfo};
use crate::correlation::RequestIdGenerator;
use crate::sink::{FieldLogger, LogSink, StructuredSink, WriterSink};
use crate::utils::{Clock, SystemClock, elapsed_between, format_elapsed};

/// 访问日志拦截器
///
/// 每次一元调用输出两行：进入时记录序列化后的请求，返回后记录耗时和错误信息。
/// 响应和错误原样返回给调用方，拦截器只观察不修改。
///
/// ```rust,no_run
/// use flare_access_log::{AccessLogInterceptor, UnaryServerInfo};
/// use tonic::{Request, Response, Status};
///
/// # async fn example(req: Request<serde_json::Value>) -> Result<Response<String>, Status> {
/// let interceptor = AccessLogInterceptor::stdout();
/// let info = UnaryServerInfo::new("/pkg.Svc/Get");
///
/// interceptor
///     .serve(&info, req, |_ctx, req| async move {
///         Ok(Response::new(req.into_inner().to_string()))
///     })
///     .await
/// # }
/// ```
pub struct AccessLogInterceptor<S> {
    sink: Arc<S>,
    ids: Arc<RequestIdGenerator>,
    clock: Arc<dyn Clock>,
    duration_width: usize,
}

impl<S> Clone for AccessLogInterceptor<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            ids: Arc::clone(&self.ids),
            clock: Arc::clone(&self.clock),
            duration_width: self.duration_width,
        }
    }
}

impl AccessLogInterceptor<WriterSink> {
    /// 输出到标准输出
    pub fn stdout() -> Self {
        Self::new(WriterSink::stdout(), &AccessLogConfig::default())
    }

    /// 输出到指定字节流
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self::new(WriterSink::new(writer), &AccessLogConfig::default())
    }

    /// 按配置构建字节流拦截器，`writer` 为空时使用标准输出
    pub fn from_config(writer: Option<Box<dyn Write + Send>>, config: &AccessLogConfig) -> Self {
        Self::new(WriterSink::from_option(writer, config), config)
    }
}

impl<L: FieldLogger> AccessLogInterceptor<StructuredSink<L>> {
    /// 输出到结构化日志器
    pub fn with_field_logger(logger: L) -> Self {
        let config = AccessLogConfig::default();
        Self::new(StructuredSink::with_config(logger, &config), &config)
    }
}

impl<S: LogSink> AccessLogInterceptor<S> {
    pub fn new(sink: S, config: &AccessLogConfig) -> Self {
        Self {
            sink: Arc::new(sink),
            ids: Arc::new(RequestIdGenerator::new(config.request_id_prefix.clone())),
            clock: Arc::new(SystemClock),
            duration_width: config.duration_width,
        }
    }

    /// 替换时钟
    ///
    /// 只影响当前实例，输出和请求 ID 生成器仍与克隆出的实例共享
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// 包装一次一元调用
    ///
    /// 进入日志一定先于 `handler` 执行输出，返回日志一定在 `handler` 完成后输出
    pub async fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: &CallContext,
        info: &UnaryServerInfo,
        req: Req,
        handler: F,
    ) -> Result<Resp, Status>
    where
        Req: Serialize,
        F: FnOnce(CorrelatedContext, Req) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let ctx = self.before_handle(ctx, info, &req);
        let result = handler(ctx.clone(), req).await;
        self.after_handle(&ctx, info, result.as_ref().err());
        result
    }

    /// 包装 tonic 请求
    ///
    /// 对端地址取自请求，关联后的上下文会放入请求扩展，
    /// 下游可用 [`CorrelatedContext::from_request`] 读取
    pub async fn serve<Req, Resp, F, Fut>(
        &self,
        info: &UnaryServerInfo,
        mut request: Request<Req>,
        handler: F,
    ) -> Result<Response<Resp>, Status>
    where
        Req: Serialize,
        F: FnOnce(CorrelatedContext, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        let ctx = self.before_handle(&CallContext::from_request(&request), info, request.get_ref());
        request.extensions_mut().insert(ctx.clone());
        let result = handler(ctx.clone(), request).await;
        self.after_handle(&ctx, info, result.as_ref().err());
        result
    }

    fn before_handle<Req: Serialize>(
        &self,
        ctx: &CallContext,
        info: &UnaryServerInfo,
        req: &Req,
    ) -> CorrelatedContext {
        let request_begin = self.clock.now();
        let ctx = ctx.correlate(request_begin, &self.ids);

        match serde_json::to_string(req) {
            Ok(body) => self
                .sink
                .emit(&ctx, request_begin, info, format_args!("{}\n", body)),
            Err(err) => self.sink.emit(
                &ctx,
                request_begin,
                info,
                format_args!("failed to marshal the request: {}\n", err),
            ),
        }

        ctx
    }

    fn after_handle(&self, ctx: &CorrelatedContext, info: &UnaryServerInfo, err: Option<&Status>) {
        let request_end = self.clock.now();
        let elapsed = format_elapsed(elapsed_between(ctx.request_begin(), request_end));
        let message = err.map(Status::message).unwrap_or_default();

        self.sink.emit(
            ctx,
            request_end,
            info,
            format_args!(
                "{:>width$}\n{}",
                elapsed,
                message,
                width = self.duration_width
            ),
        );
    }
}
