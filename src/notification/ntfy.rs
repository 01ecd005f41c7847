//! ntfy 客户端模块
//!
//! 通过 HTTP POST `{server}/{topic}` 推送通知，标题、优先级、标签和图标放在请求头里，
//! 消息正文是纯文本 body。只尝试一次，不重试。

use crate::config::NtfyConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// 推送失败
#[derive(Debug, Error)]
pub enum NtfyError {
    /// 服务端返回非 2xx
    #[error("ntfy request failed: {status} {reason}")]
    Status { status: u16, reason: String },

    /// 请求超时
    #[error("ntfy request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// 网络等其他 HTTP 错误
    #[error("ntfy request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// 通知内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub tags: String,
    /// 为 None 时使用配置中的默认优先级
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, message: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tags: tags.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

/// 通知发送能力
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 发送一条通知，失败时返回错误
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NtfyError>;
}

/// ntfy HTTP 客户端
#[derive(Debug, Clone)]
pub struct NtfyClient {
    client: Client,
    url: String,
    token: Option<String>,
    default_priority: String,
    icon_url: String,
    timeout: Option<Duration>,
}

impl NtfyClient {
    /// 根据配置创建客户端
    pub fn new(config: &NtfyConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// 使用已有的 reqwest Client
    pub fn with_client(client: Client, config: &NtfyConfig) -> Self {
        Self {
            client,
            url: config.publish_url(),
            token: config.token.clone(),
            default_priority: config.priority.to_string(),
            icon_url: config.icon_url().to_string(),
            timeout: config.fetch_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSender for NtfyClient {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), NtfyError> {
        let priority = payload.priority.as_deref().unwrap_or(&self.default_priority);

        let mut request = self
            .client
            .post(&self.url)
            .header("Title", &payload.title)
            .header("Priority", priority)
            .header("Tags", &payload.tags)
            .header("X-Icon", &self.icon_url)
            .body(payload.message.clone());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        debug!(url = %self.url, title = %payload.title, priority = %priority, "Sending ntfy notification");

        let response = request.send().await.map_err(|e| match self.timeout {
            Some(timeout) if e.is_timeout() => NtfyError::Timeout(timeout),
            _ => NtfyError::Http(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NtfyError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        info!(url = %self.url, title = %payload.title, "Notification sent");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 测试用的发送器：记录所有 payload
    #[derive(Default)]
    pub(crate) struct RecordingSender {
        pub(crate) sent: Mutex<Vec<NotificationPayload>>,
        pub(crate) fail_with_status: Option<u16>,
    }

    impl RecordingSender {
        pub(crate) fn failing(status: u16) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_with_status: Some(status),
            }
        }

        pub(crate) fn sent(&self) -> Vec<NotificationPayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, payload: &NotificationPayload) -> Result<(), NtfyError> {
            self.sent.lock().unwrap().push(payload.clone());
            match self.fail_with_status {
                Some(status) => Err(NtfyError::Status {
                    status,
                    reason: "Server Error".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_client_uses_config() {
        let mut config = NtfyConfig::new("my-topic");
        config.server = "https://ntfy.example.com".to_string();
        let client = NtfyClient::new(&config);
        assert_eq!(client.url(), "https://ntfy.example.com/my-topic");
        assert_eq!(client.default_priority, "default");
        assert_eq!(client.icon_url, config.icon_url());
    }

    #[test]
    fn test_payload_builder() {
        let payload = NotificationPayload::new("T", "body", "robot").with_priority("high");
        assert_eq!(payload.priority.as_deref(), Some("high"));
        assert_eq!(payload.tags, "robot");
    }

    #[test]
    fn test_status_error_contains_code() {
        let err = NtfyError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "ntfy request failed: 500 Internal Server Error");
    }
}
