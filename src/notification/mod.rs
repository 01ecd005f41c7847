//! 通知层 - 冷却限流与 ntfy 推送
//!
//! # 使用示例
//! ```ignore
//! use agent_ntfy::notification::{CooldownGuard, EdgeMode, NotificationPayload, NotificationSender, NtfyClient};
//!
//! let mut guard = CooldownGuard::from_iso8601("PT30S", EdgeMode::Leading)?;
//! if guard.should_allow("session.idle") {
//!     let client = NtfyClient::new(&config);
//!     client.send(&NotificationPayload::new("Title", "Body", "robot")).await?;
//! }
//! ```

pub mod cooldown;
pub mod duration;
pub mod ntfy;

pub use cooldown::{CooldownGuard, EdgeMode};
pub use duration::{parse_iso8601_duration, DurationError};
pub use ntfy::{NotificationPayload, NotificationSender, NtfyClient, NtfyError};
