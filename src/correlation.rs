//! 请求 ID 生成
//!
//! 令牌为 UUIDv7：前 48 位是调用开始时间的毫秒数，随后是 `ContextV7` 维护的计数器。
//! 同一毫秒内计数器递增，小写十六进制文本的排序与字节序一致。

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeZone};
use uuid::{ContextV7, Timestamp, Uuid};

use crate::config::DEFAULT_REQUEST_ID_PREFIX;

/// 令牌文本长度（带连字符的 UUID）
pub const TOKEN_LEN: usize = 36;

/// 请求 ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 请求 ID 生成器
///
/// 每个生成器持有独立的 v7 上下文，同一毫秒内的并发调用依靠其中的计数器区分
pub struct RequestIdGenerator {
    prefix: String,
    context: Mutex<ContextV7>,
}

impl fmt::Debug for RequestIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdGenerator")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RequestIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            context: Mutex::new(ContextV7::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 根据调用开始时间生成请求 ID
    pub fn generate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> RequestId {
        // 早于 1970 年的时间统一按 0 处理
        let seconds = u64::try_from(now.timestamp()).unwrap_or(0);
        let nanos = now.timestamp_subsec_nanos();

        let token = {
            let context = self.context.lock().unwrap_or_else(PoisonError::into_inner);
            Uuid::new_v7(Timestamp::from_unix(&*context, seconds, nanos))
        };

        let mut id = String::with_capacity(self.prefix.len() + TOKEN_LEN);
        id.push_str(&self.prefix);
        id.push_str(&token.hyphenated().to_string());
        RequestId(id)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_ID_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn token_of<'a>(id: &'a RequestId, prefix: &str) -> &'a str {
        &id.as_str()[prefix.len()..]
    }

    #[test]
    fn id_has_prefix_and_fixed_length() {
        let generator = RequestIdGenerator::default();
        let id = generator.generate(&Utc::now());

        assert!(id.as_str().starts_with("req-"));
        assert_eq!(id.as_str().len(), "req-".len() + TOKEN_LEN);
        assert!(
            token_of(&id, "req-")
                .chars()
                .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn custom_prefix_is_used() {
        let generator = RequestIdGenerator::new("call-");
        assert!(generator.generate(&Utc::now()).as_str().starts_with("call-"));
    }

    #[test]
    fn token_embeds_call_start_time() {
        let generator = RequestIdGenerator::default();
        let now = Utc::now();
        let id = generator.generate(&now);

        let uuid = Uuid::parse_str(token_of(&id, "req-")).unwrap();
        assert_eq!(uuid.get_version_num(), 7);

        let (seconds, nanos) = uuid.get_timestamp().unwrap().to_unix();
        assert_eq!(seconds, now.timestamp() as u64);
        assert_eq!(nanos / 1_000_000, now.timestamp_subsec_millis());
    }

    #[test]
    fn same_timestamp_yields_distinct_ids() {
        let generator = RequestIdGenerator::default();
        let now = Utc::now();

        let ids: HashSet<_> = (0..1000).map(|_| generator.generate(&now)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn concurrent_generation_yields_distinct_ids() {
        let generator = Arc::new(RequestIdGenerator::default());
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| generator.generate(&now))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 2000);
    }

    #[test]
    fn ids_sort_by_generation_time() {
        let generator = RequestIdGenerator::default();
        let start = Utc::now();

        let ids: Vec<_> = (0..50)
            .map(|i| generator.generate(&(start + Duration::milliseconds(i / 5))))
            .collect();

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn later_timestamp_sorts_after_earlier_one() {
        let now = Utc::now();

        let later = RequestIdGenerator::default().generate(&(now + Duration::seconds(1)));
        let earlier = RequestIdGenerator::default().generate(&now);
        assert!(earlier < later);
    }
}
