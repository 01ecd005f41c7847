//! 配置加载 - 从环境变量读取 ntfy 推送配置
//!
//! 所有配置都通过键值表读取，`from_env` 只是把进程环境变量收集成表，
//! 测试可以直接传入构造好的表。

use crate::hook::event::EventKind;
use crate::notification::cooldown::EdgeMode;
use crate::notification::duration::{parse_iso8601_duration, DurationError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER: &str = "https://ntfy.sh";
pub const DEFAULT_ICON_LIGHT: &str = "https://opencode.ai/favicon-96x96.png";
pub const DEFAULT_ICON_DARK: &str = "https://opencode.ai/apple-touch-icon.png";

/// 配置错误（激活时致命）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("NTFY_TOPIC environment variable is required")]
    MissingTopic,

    #[error("NTFY_PRIORITY must be one of: {}", Priority::VALID.join(", "))]
    InvalidPriority(String),

    #[error("NTFY_ICON_MODE must be one of: light, dark (got \"{0}\")")]
    InvalidIconMode(String),

    #[error("NTFY_COOLDOWN_EDGE must be one of: leading, trailing (got \"{0}\")")]
    InvalidEdge(String),

    #[error("{var}: {source}")]
    Duration {
        var: &'static str,
        #[source]
        source: DurationError,
    },
}

/// ntfy 消息优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Min,
    Low,
    #[default]
    Default,
    High,
    Max,
}

impl Priority {
    pub const VALID: [&'static str; 5] = ["min", "low", "default", "high", "max"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Min => "min",
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
            Priority::Max => "max",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(Priority::Min),
            "low" => Ok(Priority::Low),
            "default" => Ok(Priority::Default),
            "high" => Ok(Priority::High),
            "max" => Ok(Priority::Max),
            other => Err(ConfigError::InvalidPriority(other.to_string())),
        }
    }
}

/// 通知图标主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconMode {
    Light,
    #[default]
    Dark,
}

impl FromStr for IconMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(IconMode::Light),
            "dark" => Ok(IconMode::Dark),
            other => Err(ConfigError::InvalidIconMode(other.to_string())),
        }
    }
}

/// 单个事件的字段命令模板
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldCommands {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl FieldCommands {
    fn from_env_map(env: &HashMap<String, String>, kind: EventKind) -> Self {
        let prefix = kind.env_prefix();
        let get = |field: &str| non_empty(env, &format!("NTFY_{}_{}_CMD", prefix, field));
        Self {
            title: get("TITLE"),
            message: get("MESSAGE"),
            tags: get("TAGS"),
            priority: get("PRIORITY"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.message.is_none() && self.tags.is_none() && self.priority.is_none()
    }
}

/// ntfy 推送配置
#[derive(Clone)]
pub struct NtfyConfig {
    /// 主题（必填）
    pub topic: String,
    /// 服务器地址，不带结尾的 `/`
    pub server: String,
    /// Bearer token
    pub token: Option<String>,
    /// 默认优先级
    pub priority: Priority,
    pub icon_mode: IconMode,
    pub icon_light: String,
    pub icon_dark: String,
    /// 冷却时长，None 表示不限流
    pub cooldown: Option<Duration>,
    pub cooldown_edge: EdgeMode,
    /// HTTP 请求超时
    pub fetch_timeout: Option<Duration>,
    /// 字段命令超时
    pub command_timeout: Option<Duration>,
    /// 按事件类型的字段命令覆盖
    pub commands: HashMap<EventKind, FieldCommands>,
}

impl NtfyConfig {
    /// 创建只有主题的最小配置，其余取默认值
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            server: DEFAULT_SERVER.to_string(),
            token: None,
            priority: Priority::Default,
            icon_mode: IconMode::default(),
            icon_light: DEFAULT_ICON_LIGHT.to_string(),
            icon_dark: DEFAULT_ICON_DARK.to_string(),
            cooldown: None,
            cooldown_edge: EdgeMode::default(),
            fetch_timeout: None,
            command_timeout: None,
            commands: HashMap::new(),
        }
    }

    /// 从进程环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    /// 从键值表加载
    pub fn from_env_map(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let topic = non_empty(env, "NTFY_TOPIC").ok_or(ConfigError::MissingTopic)?;
        let mut config = Self::new(topic);

        if let Some(server) = non_empty(env, "NTFY_SERVER") {
            config.server = server.trim_end_matches('/').to_string();
        }
        config.token = non_empty(env, "NTFY_TOKEN");

        if let Some(priority) = non_empty(env, "NTFY_PRIORITY") {
            config.priority = priority.parse()?;
        }
        if let Some(mode) = non_empty(env, "NTFY_ICON_MODE") {
            config.icon_mode = mode.parse()?;
        }
        if let Some(url) = non_empty(env, "NTFY_ICON_LIGHT") {
            config.icon_light = url;
        }
        if let Some(url) = non_empty(env, "NTFY_ICON_DARK") {
            config.icon_dark = url;
        }

        config.cooldown = duration_var(env, "NTFY_COOLDOWN")?;
        if let Some(edge) = non_empty(env, "NTFY_COOLDOWN_EDGE") {
            config.cooldown_edge = edge.parse().map_err(ConfigError::InvalidEdge)?;
        }
        config.fetch_timeout = duration_var(env, "NTFY_FETCH_TIMEOUT")?;
        config.command_timeout = duration_var(env, "NTFY_COMMAND_TIMEOUT")?;

        for kind in EventKind::ALL {
            let commands = FieldCommands::from_env_map(env, kind);
            if !commands.is_empty() {
                config.commands.insert(kind, commands);
            }
        }

        Ok(config)
    }

    /// 当前主题对应的图标 URL
    pub fn icon_url(&self) -> &str {
        match self.icon_mode {
            IconMode::Light => &self.icon_light,
            IconMode::Dark => &self.icon_dark,
        }
    }

    /// 发布地址 `{server}/{topic}`
    pub fn publish_url(&self) -> String {
        format!("{}/{}", self.server, self.topic)
    }

    /// 某个事件的字段命令
    pub fn commands_for(&self, kind: EventKind) -> Option<&FieldCommands> {
        self.commands.get(&kind)
    }

    /// 用于展示的配置摘要（token 已脱敏）
    pub fn summary(&self) -> ConfigSummary<'_> {
        ConfigSummary {
            topic: &self.topic,
            server: &self.server,
            token: self.token.as_ref().map(|_| "***"),
            priority: self.priority,
            icon_mode: self.icon_mode,
            icon_url: self.icon_url(),
            cooldown_ms: self.cooldown.map(|d| d.as_millis() as u64),
            cooldown_edge: self.cooldown_edge.as_str(),
            fetch_timeout_ms: self.fetch_timeout.map(|d| d.as_millis() as u64),
            command_timeout_ms: self.command_timeout.map(|d| d.as_millis() as u64),
            commands: EventKind::ALL
                .iter()
                .filter_map(|kind| self.commands.get(kind).map(|c| (kind.as_str(), c)))
                .collect(),
        }
    }
}

impl fmt::Debug for NtfyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfyConfig")
            .field("topic", &self.topic)
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("priority", &self.priority)
            .field("icon_mode", &self.icon_mode)
            .field("cooldown", &self.cooldown)
            .field("cooldown_edge", &self.cooldown_edge)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("command_timeout", &self.command_timeout)
            .field("commands", &self.commands)
            .finish()
    }
}

/// 配置摘要
#[derive(Debug, Serialize)]
pub struct ConfigSummary<'a> {
    pub topic: &'a str,
    pub server: &'a str,
    pub token: Option<&'static str>,
    pub priority: Priority,
    pub icon_mode: IconMode,
    pub icon_url: &'a str,
    pub cooldown_ms: Option<u64>,
    pub cooldown_edge: &'static str,
    pub fetch_timeout_ms: Option<u64>,
    pub command_timeout_ms: Option<u64>,
    pub commands: Vec<(&'static str, &'a FieldCommands)>,
}

fn non_empty(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key).filter(|v| !v.is_empty()).cloned()
}

fn duration_var(env: &HashMap<String, String>, var: &'static str) -> Result<Option<Duration>, ConfigError> {
    non_empty(env, var)
        .map(|text| {
            parse_iso8601_duration(&text)
                .map(Duration::from_millis)
                .map_err(|source| ConfigError::Duration { var, source })
        })
        .transpose()
}
