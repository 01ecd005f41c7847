//! 宿主 Hook 接入 - 事件模型、插件激活与事件流处理

pub mod event;
pub mod listener;
pub mod plugin;

pub use event::{EventKind, HostEvent};
pub use listener::{run_event_loop, ListenStats};
pub use plugin::{project_name, HandleOutcome, NtfyPlugin, PluginInput};
