//! agent-ntfy - 把 AI 编码代理的生命周期事件推送到 ntfy

pub mod cli;
pub mod config;
pub mod hook;
pub mod infra;
pub mod notification;

pub use config::{ConfigError, FieldCommands, IconMode, NtfyConfig, Priority};
pub use hook::{EventKind, HandleOutcome, HostEvent, NtfyPlugin, PluginInput};
pub use infra::{CommandRunner, ShellRunner};
pub use notification::{
    parse_iso8601_duration, CooldownGuard, DurationError, EdgeMode, NotificationPayload,
    NotificationSender, NtfyClient, NtfyError,
};
