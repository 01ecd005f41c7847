//! 宿主运行时事件
//!
//! 宿主以 `{"type": "...", "properties": {...}}` 的形式推送生命周期事件。
//! 支持的事件：session.idle, session.error, permission.asked，其他类型忽略。

use serde::{Deserialize, Deserializer, Serialize};

/// 会触发通知的事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    #[serde(rename = "session.idle")]
    SessionIdle,
    #[serde(rename = "session.error")]
    SessionError,
    #[serde(rename = "permission.asked")]
    PermissionAsked,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::SessionIdle,
        EventKind::SessionError,
        EventKind::PermissionAsked,
    ];

    /// 事件类型字符串（也是冷却器的 key）
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionIdle => "session.idle",
            EventKind::SessionError => "session.error",
            EventKind::PermissionAsked => "permission.asked",
        }
    }

    /// 环境变量中的事件前缀，如 `NTFY_SESSION_IDLE_TITLE_CMD`
    pub fn env_prefix(&self) -> &'static str {
        match self {
            EventKind::SessionIdle => "SESSION_IDLE",
            EventKind::SessionError => "SESSION_ERROR",
            EventKind::PermissionAsked => "PERMISSION_ASKED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 宿主事件
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    #[serde(rename = "session.idle")]
    SessionIdle {
        #[serde(default)]
        properties: SessionProperties,
    },
    #[serde(rename = "session.error")]
    SessionError {
        #[serde(default)]
        properties: SessionErrorProperties,
    },
    #[serde(rename = "permission.asked")]
    PermissionAsked {
        #[serde(default)]
        properties: PermissionProperties,
    },
    /// 未知事件，不处理
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionProperties {
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionErrorProperties {
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub error: Option<SessionError>,
}

/// 会话错误，形如 `{"name": "UnknownError", "data": {"message": "..."}}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionError {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<SessionErrorData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionErrorData {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PermissionProperties {
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
    /// 权限类型（如 bash, edit）
    #[serde(alias = "type", default)]
    pub permission: String,
    /// 匹配的模式列表，兼容单个 `pattern` 字符串
    #[serde(alias = "pattern", default, deserialize_with = "one_or_many")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

impl HostEvent {
    /// 解析单个事件 JSON
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// 事件种类，未知事件返回 None
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            HostEvent::SessionIdle { .. } => Some(EventKind::SessionIdle),
            HostEvent::SessionError { .. } => Some(EventKind::SessionError),
            HostEvent::PermissionAsked { .. } => Some(EventKind::PermissionAsked),
            HostEvent::Other => None,
        }
    }

    /// 事件类型字符串
    pub fn event_type(&self) -> &'static str {
        self.kind().map(|k| k.as_str()).unwrap_or("other")
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            HostEvent::SessionIdle { properties } => properties.session_id.as_deref(),
            HostEvent::SessionError { properties } => properties.session_id.as_deref(),
            HostEvent::PermissionAsked { properties } => properties.session_id.as_deref(),
            HostEvent::Other => None,
        }
    }

    /// session.error 携带的错误信息
    pub fn error_message(&self) -> Option<&str> {
        match self {
            HostEvent::SessionError { properties } => properties
                .error
                .as_ref()
                .and_then(|e| e.data.as_ref())
                .and_then(|d| d.message.as_deref()),
            _ => None,
        }
    }
}
