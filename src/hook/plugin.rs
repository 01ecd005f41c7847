//! 事件处理 - 冷却检查、字段解析、推送
//!
//! 一次激活对应一个 `NtfyPlugin`，它独占冷却器、命令执行器和发送器。
//! 事件逐个处理：先过冷却器，再并发解析四个字段，最后发送一次。

use super::event::{EventKind, HostEvent};
use crate::config::{ConfigError, FieldCommands, NtfyConfig, Priority};
use crate::infra::command::{resolve_field, CommandRunner, ShellRunner};
use crate::notification::cooldown::CooldownGuard;
use crate::notification::ntfy::{NotificationPayload, NotificationSender, NtfyClient, NtfyError};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 激活参数
#[derive(Debug, Clone, Default)]
pub struct PluginInput {
    /// 宿主的工作目录
    pub directory: String,
    /// 环境变量
    pub env: HashMap<String, String>,
}

/// 事件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// 已推送
    Sent(NotificationPayload),
    /// 被冷却器拦截
    Suppressed,
    /// 不关心的事件
    Ignored,
}

/// ntfy 通知插件
pub struct NtfyPlugin<R = ShellRunner, S = NtfyClient> {
    config: NtfyConfig,
    project: String,
    cooldown: Option<CooldownGuard>,
    runner: R,
    sender: S,
}

impl NtfyPlugin {
    /// 激活插件
    ///
    /// 未配置 `NTFY_TOPIC` 时返回 `Ok(None)`（插件不生效），配置非法时返回错误。
    pub fn activate(input: PluginInput) -> Result<Option<Self>, ConfigError> {
        if input.env.get("NTFY_TOPIC").map_or(true, |t| t.is_empty()) {
            info!("NTFY_TOPIC not set, ntfy notifications disabled");
            return Ok(None);
        }

        let config = NtfyConfig::from_env_map(&input.env)?;
        let runner = ShellRunner::new().with_timeout(config.command_timeout);
        let sender = NtfyClient::new(&config);
        let project = project_name(&input.directory);

        info!(
            project = %project,
            url = %sender.url(),
            cooldown_ms = ?config.cooldown.map(|d| d.as_millis()),
            edge = %config.cooldown_edge,
            "ntfy plugin activated"
        );

        Ok(Some(Self::with_parts(config, project, runner, sender)))
    }
}

impl<R, S> NtfyPlugin<R, S>
where
    R: CommandRunner,
    S: NotificationSender,
{
    /// 使用指定的执行器和发送器组装插件
    pub fn with_parts(config: NtfyConfig, project: impl Into<String>, runner: R, sender: S) -> Self {
        let cooldown = config
            .cooldown
            .map(|cooldown| CooldownGuard::new(cooldown, config.cooldown_edge));
        Self {
            config,
            project: project.into(),
            cooldown,
            runner,
            sender,
        }
    }

    pub fn config(&self) -> &NtfyConfig {
        &self.config
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// 处理一个宿主事件
    pub async fn handle_event(&mut self, event: &HostEvent) -> Result<HandleOutcome, NtfyError> {
        self.handle_event_at(event, Instant::now()).await
    }

    /// 处理一个宿主事件（带时间戳，用于测试）
    pub async fn handle_event_at(
        &mut self,
        event: &HostEvent,
        now: Instant,
    ) -> Result<HandleOutcome, NtfyError> {
        let Some(kind) = event.kind() else {
            debug!("Ignoring unsupported event");
            return Ok(HandleOutcome::Ignored);
        };

        if let Some(cooldown) = self.cooldown.as_mut() {
            if !cooldown.should_allow_at(kind.as_str(), now) {
                info!(event = %kind, "Notification suppressed by cooldown");
                return Ok(HandleOutcome::Suppressed);
            }
        }

        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let variables = self.variables(event, kind, &time);
        let defaults = self.default_payload(event, kind, &time);
        let payload = self.resolve_payload(kind, &variables, defaults).await;

        self.sender.send(&payload).await?;
        info!(event = %kind, session_id = ?event.session_id(), "Event forwarded to ntfy");
        Ok(HandleOutcome::Sent(payload))
    }

    /// 命令模板可用的变量
    fn variables(&self, event: &HostEvent, kind: EventKind, time: &str) -> HashMap<String, String> {
        let mut vars = HashMap::from([
            ("PROJECT".to_string(), self.project.clone()),
            ("EVENT".to_string(), kind.as_str().to_string()),
            ("TIME".to_string(), time.to_string()),
        ]);

        if let Some(message) = event.error_message() {
            vars.insert("ERROR".to_string(), message.to_string());
        }
        if let HostEvent::PermissionAsked { properties } = event {
            vars.insert("PERMISSION_TYPE".to_string(), properties.permission.clone());
            vars.insert("PERMISSION_PATTERNS".to_string(), properties.patterns.join(", "));
        }
        vars
    }

    /// 未配置命令时的默认通知内容
    fn default_payload(&self, event: &HostEvent, kind: EventKind, time: &str) -> NotificationPayload {
        let project = &self.project;
        let mut message = format!("Event: {}\nProject: {}\nTime: {}", kind, project, time);

        let (title, tags) = match event {
            HostEvent::SessionError { .. } => {
                if let Some(error) = event.error_message() {
                    message.push_str(&format!("\nError: {}", error));
                }
                (format!("{} - Session Error", project), "warning")
            }
            HostEvent::PermissionAsked { properties } => {
                message.push_str(&format!("\nPermission: {}", properties.permission));
                if !properties.patterns.is_empty() {
                    message.push_str(&format!("\nPatterns: {}", properties.patterns.join(", ")));
                }
                (format!("{} - Permission Requested", project), "lock")
            }
            _ => (format!("{} - Session Idle", project), "hourglass_done"),
        };

        NotificationPayload::new(title, message, tags).with_priority(self.config.priority.as_str())
    }

    /// 并发解析四个字段
    async fn resolve_payload(
        &self,
        kind: EventKind,
        variables: &HashMap<String, String>,
        defaults: NotificationPayload,
    ) -> NotificationPayload {
        let commands = self.config.commands_for(kind).cloned().unwrap_or_default();
        let FieldCommands {
            title,
            message,
            tags,
            priority,
        } = &commands;
        let default_priority = defaults.priority.as_deref().unwrap_or(Priority::Default.as_str());

        let (title, message, tags, priority) = tokio::join!(
            resolve_field(&self.runner, title.as_deref(), variables, &defaults.title),
            resolve_field(&self.runner, message.as_deref(), variables, &defaults.message),
            resolve_field(&self.runner, tags.as_deref(), variables, &defaults.tags),
            resolve_field(&self.runner, priority.as_deref(), variables, default_priority),
        );

        let priority = match priority.parse::<Priority>() {
            Ok(p) => p.to_string(),
            Err(_) => {
                warn!(event = %kind, priority = %priority, "Command returned invalid priority, using default");
                default_priority.to_string()
            }
        };

        NotificationPayload {
            title: header_safe(kind, "title", title, &defaults.title),
            message,
            tags: header_safe(kind, "tags", tags, &defaults.tags),
            priority: Some(priority),
        }
    }
}

/// 标题和标签走 HTTP 头，含控制字符（如多行输出）时回退到默认值
fn header_safe(kind: EventKind, field: &str, value: String, fallback: &str) -> String {
    if value.chars().any(char::is_control) {
        warn!(event = %kind, field, value = ?value, "Command output not usable as header, using default");
        fallback.to_string()
    } else {
        value
    }
}

/// 从工作目录提取项目名
pub fn project_name(directory: &str) -> String {
    directory
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(directory)
        .to_string()
}
