use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use tracing::{Level, info};

use super::{LogSink, render_time};
use crate::config::AccessLogConfig;
use crate::context::{CorrelatedContext, UnaryServerInfo};

pub const TIME_FIELD: &str = "Time";
pub const CLIENT_IP_FIELD: &str = "ClientIP";
pub const REQUEST_ID_FIELD: &str = "RequestID";
pub const METHOD_FIELD: &str = "Method";

/// 附加在日志记录上的字段集合
pub type Fields = BTreeMap<&'static str, String>;

/// 结构化日志器
pub trait FieldLogger: Send + Sync {
    type Entry: LogEntry;

    /// 创建携带字段的日志记录
    fn with_fields(&self, fields: Fields) -> Self::Entry;
}

/// 携带字段的单条日志记录
pub trait LogEntry {
    /// 以 info 级别输出
    fn info(self, args: fmt::Arguments<'_>);
}

/// 结构化输出
///
/// 载荷原样交给日志器，字段的存储与格式化由日志器负责
#[derive(Debug)]
pub struct StructuredSink<L> {
    logger: L,
    time_format: String,
}

impl<L: FieldLogger> StructuredSink<L> {
    pub fn new(logger: L) -> Self {
        Self::with_config(logger, &AccessLogConfig::default())
    }

    pub fn with_config(logger: L, config: &AccessLogConfig) -> Self {
        Self {
            logger,
            time_format: config.time_format.clone(),
        }
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }
}

impl<L: FieldLogger> LogSink for StructuredSink<L> {
    fn emit(
        &self,
        ctx: &CorrelatedContext,
        timestamp: DateTime<Local>,
        info: &UnaryServerInfo,
        args: fmt::Arguments<'_>,
    ) {
        let fields = Fields::from([
            (TIME_FIELD, render_time(&timestamp, &self.time_format)),
            (CLIENT_IP_FIELD, ctx.client_ip()),
            (REQUEST_ID_FIELD, ctx.request_id().to_string()),
            (METHOD_FIELD, info.full_method.clone()),
        ]);

        self.logger.with_fields(fields).info(args);
    }
}

/// 基于 tracing 的结构化日志器
///
/// 每条记录是 target 为 `access_log` 的 info 事件
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFieldLogger;

impl FieldLogger for TracingFieldLogger {
    type Entry = TracingEntry;

    fn with_fields(&self, fields: Fields) -> TracingEntry {
        TracingEntry { fields }
    }
}

#[derive(Debug, Clone)]
pub struct TracingEntry {
    fields: Fields,
}

impl TracingEntry {
    fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl LogEntry for TracingEntry {
    fn info(self, args: fmt::Arguments<'_>) {
        if !tracing::enabled!(target: "access_log", Level::INFO) {
            return;
        }

        let message = args.to_string();
        info!(
            target: "access_log",
            Time = %self.field(TIME_FIELD),
            ClientIP = %self.field(CLIENT_IP_FIELD),
            RequestID = %self.field(REQUEST_ID_FIELD),
            Method = %self.field(METHOD_FIELD),
            "{}",
            message.trim_end_matches('\n')
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::correlation::RequestIdGenerator;
    use crate::sink::testing::SharedBuffer;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        records: Arc<Mutex<Vec<(Fields, String)>>>,
    }

    struct RecordedEntry {
        fields: Fields,
        records: Arc<Mutex<Vec<(Fields, String)>>>,
    }

    impl FieldLogger for Recorder {
        type Entry = RecordedEntry;

        fn with_fields(&self, fields: Fields) -> RecordedEntry {
            RecordedEntry {
                fields,
                records: Arc::clone(&self.records),
            }
        }
    }

    impl LogEntry for RecordedEntry {
        fn info(self, args: fmt::Arguments<'_>) {
            self.records
                .lock()
                .unwrap()
                .push((self.fields, args.to_string()));
        }
    }

    fn correlated() -> CorrelatedContext {
        CallContext::with_peer("10.0.0.5:4000".parse().unwrap())
            .correlate(Local::now(), &RequestIdGenerator::default())
    }

    #[test]
    fn attaches_four_fields() {
        let recorder = Recorder::default();
        let sink = StructuredSink::new(recorder.clone());
        let ctx = correlated();
        let ts = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        sink.emit(
            &ctx,
            ts,
            &UnaryServerInfo::new("/pkg.Svc/Get"),
            format_args!("{}\n", "payload"),
        );

        let records = recorder.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let (fields, message) = &records[0];
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[TIME_FIELD], "2024/01/02 - 03:04:05");
        assert_eq!(fields[CLIENT_IP_FIELD], "10.0.0.5:4000");
        assert_eq!(fields[REQUEST_ID_FIELD], ctx.request_id().as_str());
        assert_eq!(fields[METHOD_FIELD], "/pkg.Svc/Get");
        assert_eq!(message, "payload\n");
    }

    #[test]
    fn missing_peer_is_empty_field() {
        let recorder = Recorder::default();
        let sink = StructuredSink::new(recorder.clone());
        let ctx = CallContext::new().correlate(Local::now(), &RequestIdGenerator::default());

        sink.emit(
            &ctx,
            Local::now(),
            &UnaryServerInfo::new("/a.B/C"),
            format_args!("x"),
        );

        assert_eq!(recorder.records.lock().unwrap()[0].0[CLIENT_IP_FIELD], "");
    }

    #[test]
    fn tracing_logger_emits_fields() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let sink = StructuredSink::new(TracingFieldLogger);
        let ctx = correlated();

        tracing::subscriber::with_default(subscriber, || {
            sink.emit(
                &ctx,
                Local::now(),
                &UnaryServerInfo::new("/pkg.Svc/Get"),
                format_args!("{}\n", r#"{"id":1}"#),
            );
        });

        let out = buffer.contents();
        assert!(out.contains("INFO"));
        assert!(out.contains("access_log"));
        assert!(out.contains(r#"{"id":1}"#));
        assert!(out.contains("ClientIP=10.0.0.5:4000"));
        assert!(out.contains(&format!("RequestID={}", ctx.request_id())));
        assert!(out.contains("Method=/pkg.Svc/Get"));
    }

    #[test]
    fn tracing_logger_skips_disabled_target() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::WARN)
            .with_ansi(false)
            .finish();

        let sink = StructuredSink::new(TracingFieldLogger);
        let ctx = correlated();

        tracing::subscriber::with_default(subscriber, || {
            sink.emit(
                &ctx,
                Local::now(),
                &UnaryServerInfo::new("/pkg.Svc/Get"),
                format_args!("{}\n", "dropped"),
            );
        });

        assert_eq!(buffer.contents(), "");
    }
}
