//! 工具函数模块

use std::time::Duration;

use chrono::{DateTime, Local};

/// 时钟
///
/// 拦截器通过它获取调用开始和结束时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 计算两个时间点之间的耗时，结束早于开始时为零
pub fn elapsed_between(begin: DateTime<Local>, end: DateTime<Local>) -> Duration {
    (end - begin).to_std().unwrap_or(Duration::ZERO)
}

/// 将耗时格式化为紧凑形式
///
/// 小于一秒时按 ns/µs/ms 中最合适的单位输出并去掉小数末尾的 0，
/// 否则输出 `1h2m3.5s` 形式，例如 `12.5ms`、`1.5µs`、`1m0s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let nanos = elapsed.as_nanos();

    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return with_fraction(nanos, 3, "µs");
    }
    if nanos < 1_000_000_000 {
        return with_fraction(nanos, 6, "ms");
    }

    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = with_fraction(
        u128::from(total_secs % 60) * 1_000_000_000 + u128::from(elapsed.subsec_nanos()),
        9,
        "s",
    );

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}")
    } else {
        seconds
    }
}

fn with_fraction(value: u128, precision: u32, unit: &str) -> String {
    let scale = 10u128.pow(precision);
    let whole = value / scale;
    let fraction = value % scale;

    if fraction == 0 {
        return format!("{whole}{unit}");
    }

    let digits = format!("{:0width$}", fraction, width = precision as usize);
    format!("{whole}.{}{unit}", digits.trim_end_matches('0'))
}
