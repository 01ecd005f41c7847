// src/cli/send.rs
//! send / config 命令 - 直接推送一条通知、查看当前配置

use super::output::format_output;
use crate::config::{NtfyConfig, Priority};
use crate::notification::{NotificationPayload, NotificationSender, NtfyClient};
use anyhow::Result;
use clap::Args;

/// send 命令参数
#[derive(Args)]
pub struct SendArgs {
    /// Notification title
    #[arg(long, short)]
    pub title: String,

    /// Notification body
    #[arg(long, short)]
    pub message: String,

    /// Comma separated ntfy tags / emoji shortcodes
    #[arg(long, default_value = "robot")]
    pub tags: String,

    /// Priority: min, low, default, high, max (defaults to NTFY_PRIORITY)
    #[arg(long, short)]
    pub priority: Option<String>,
}

/// config 命令参数
#[derive(Args)]
pub struct ConfigArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 处理 send 命令
pub async fn handle_send(args: SendArgs) -> Result<()> {
    let config = NtfyConfig::from_env()?;

    let mut payload = NotificationPayload::new(args.title, args.message, args.tags);
    if let Some(priority) = args.priority {
        let priority: Priority = priority.parse()?;
        payload = payload.with_priority(priority.as_str());
    }

    let client = NtfyClient::new(&config);
    client.send(&payload).await?;
    println!("sent to {}", client.url());
    Ok(())
}

/// 处理 config 命令
pub fn handle_config(args: ConfigArgs) -> Result<()> {
    let config = NtfyConfig::from_env()?;
    println!("{}", format_output(&config.summary(), args.json));
    Ok(())
}
