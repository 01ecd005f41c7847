//! 事件流读取 - 逐行读取宿主推送的 JSON 事件
//!
//! 每行一个事件，按顺序处理完一个再读下一个。
//! 解析失败或推送失败只记日志，不中断事件流。

use super::event::HostEvent;
use super::plugin::{HandleOutcome, NtfyPlugin};
use crate::infra::command::CommandRunner;
use crate::notification::ntfy::NotificationSender;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, warn};

/// 事件流处理统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenStats {
    pub received: usize,
    pub sent: usize,
    pub suppressed: usize,
    pub ignored: usize,
    pub invalid: usize,
    pub failed: usize,
}

/// 处理事件流直到 EOF
pub async fn run_event_loop<R, S, I>(
    plugin: &mut NtfyPlugin<R, S>,
    mut input: I,
) -> std::io::Result<ListenStats>
where
    R: CommandRunner,
    S: NotificationSender,
    I: AsyncBufRead + Unpin,
{
    let mut stats = ListenStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "Skipping non UTF-8 event line");
                stats.received += 1;
                stats.invalid += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        stats.received += 1;

        let event = match HostEvent::parse(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping unparsable event");
                stats.invalid += 1;
                continue;
            }
        };

        match plugin.handle_event(&event).await {
            Ok(HandleOutcome::Sent(_)) => stats.sent += 1,
            Ok(HandleOutcome::Suppressed) => stats.suppressed += 1,
            Ok(HandleOutcome::Ignored) => stats.ignored += 1,
            Err(e) => {
                error!(event = %event.event_type(), error = %e, "Notification failed");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NtfyConfig;
    use crate::infra::command::tests::FakeRunner;
    use crate::notification::ntfy::tests::RecordingSender;
    use std::time::Duration;

    #[tokio::test]
    async fn test_event_loop_counts_outcomes() {
        let mut config = NtfyConfig::new("t");
        config.cooldown = Some(Duration::from_secs(60));
        let mut plugin = NtfyPlugin::with_parts(
            config,
            "p",
            FakeRunner::replying("", 0),
            RecordingSender::default(),
        );

        let input = concat!(
            "{\"type\":\"session.idle\",\"properties\":{}}\n",
            "\n",
            "{\"type\":\"session.idle\",\"properties\":{}}\n",
            "garbage\n",
            "{\"type\":\"message.updated\",\"properties\":{}}\n",
            "{\"type\":\"session.error\",\"properties\":{}}\n",
        );

        let stats = run_event_loop(&mut plugin, input.as_bytes()).await.unwrap();
        assert_eq!(
            stats,
            ListenStats {
                received: 5,
                sent: 2,
                suppressed: 1,
                ignored: 1,
                invalid: 1,
                failed: 0,
            }
        );
        assert_eq!(plugin.sender().sent().len(), 2);
    }

    #[tokio::test]
    async fn test_event_loop_skips_non_utf8_line() {
        let mut plugin = NtfyPlugin::with_parts(
            NtfyConfig::new("t"),
            "p",
            FakeRunner::replying("", 0),
            RecordingSender::default(),
        );
        let input: &[u8] = b"{\"type\":\"session.idle\"}\n\xff\xfe garbage\n{\"type\":\"session.error\"}\n";

        let stats = run_event_loop(&mut plugin, input).await.unwrap();
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.received, 3);
        assert_eq!(plugin.sender().sent().len(), 2);
    }

    #[tokio::test]
    async fn test_event_loop_continues_after_failure() {
        let mut plugin = NtfyPlugin::with_parts(
            NtfyConfig::new("t"),
            "p",
            FakeRunner::replying("", 0),
            RecordingSender::failing(503),
        );
        let input = "{\"type\":\"session.idle\"}\n{\"type\":\"session.error\"}\n";

        let stats = run_event_loop(&mut plugin, input.as_bytes()).await.unwrap();
        assert_eq!(stats.failed, 2);
        assert_eq!(plugin.sender().sent().len(), 2);
    }
}
