//! 通知冷却模块 - 按事件类型限流
//!
//! 每种事件类型独立维护最近一次时间戳：
//! - leading：突发中的第一条通过，冷却期内的后续事件被丢弃
//! - trailing：突发中的事件都被丢弃，静默超过冷却期后的第一条通过
//!
//! 边界处（经过时间 == 冷却时长）仍视为冷却中。

use super::duration::{parse_iso8601_duration, DurationError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// 冷却触发沿
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    #[default]
    Leading,
    Trailing,
}

impl EdgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::Leading => "leading",
            EdgeMode::Trailing => "trailing",
        }
    }
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leading" => Ok(EdgeMode::Leading),
            "trailing" => Ok(EdgeMode::Trailing),
            other => Err(other.to_string()),
        }
    }
}

/// 通知冷却器
///
/// 由一次插件激活独占持有，生命周期与激活相同。
#[derive(Debug)]
pub struct CooldownGuard {
    cooldown: Duration,
    edge: EdgeMode,
    /// 事件类型 -> 最近记录时间
    last_seen: HashMap<String, Instant>,
}

impl CooldownGuard {
    /// 创建冷却器
    pub fn new(cooldown: Duration, edge: EdgeMode) -> Self {
        Self {
            cooldown,
            edge,
            last_seen: HashMap::new(),
        }
    }

    /// 从 ISO 8601 时长创建冷却器
    pub fn from_iso8601(cooldown: &str, edge: EdgeMode) -> Result<Self, DurationError> {
        let millis = parse_iso8601_duration(cooldown)?;
        Ok(Self::new(Duration::from_millis(millis), edge))
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// 已记录的事件类型数量
    pub fn tracked_event_types(&self) -> usize {
        self.last_seen.len()
    }

    /// 检查事件是否放行（会更新内部状态）
    pub fn should_allow(&mut self, event_type: &str) -> bool {
        self.should_allow_at(event_type, Instant::now())
    }

    /// 检查事件是否放行（带时间戳，用于测试）
    pub fn should_allow_at(&mut self, event_type: &str, now: Instant) -> bool {
        if self.cooldown.is_zero() {
            return true;
        }

        let last = self.last_seen.get(event_type).copied();
        let cooling = |last: Instant| now.saturating_duration_since(last) <= self.cooldown;

        let allowed = match self.edge {
            EdgeMode::Leading => {
                if last.is_some_and(cooling) {
                    false
                } else {
                    self.last_seen.insert(event_type.to_string(), now);
                    true
                }
            }
            EdgeMode::Trailing => {
                // 每次调用都重置窗口
                self.last_seen.insert(event_type.to_string(), now);
                matches!(last, Some(last) if !cooling(last))
            }
        };

        debug!(
            event_type = %event_type,
            edge = %self.edge,
            allowed,
            "Cooldown check"
        );
        allowed
    }
}
