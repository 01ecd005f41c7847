// src/cli/hook.rs
//! Hook 命令处理
//!
//! `hook` 从 stdin 持续读取宿主事件；`event` 只处理命令行传入的单个事件。

use crate::hook::{run_event_loop, HandleOutcome, HostEvent, NtfyPlugin, PluginInput};
use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashMap;
use tokio::io::BufReader;
use tracing::info;

/// hook 命令参数
#[derive(Args)]
pub struct HookArgs {
    /// Project directory of the agent session (defaults to the current directory)
    #[arg(long, short)]
    pub directory: Option<String>,
}

/// event 命令参数
#[derive(Args)]
pub struct EventArgs {
    /// Event JSON payload, e.g. {"type":"session.idle","properties":{}}
    pub payload: String,

    /// Project directory of the agent session (defaults to the current directory)
    #[arg(long, short)]
    pub directory: Option<String>,
}

fn plugin_input(directory: Option<String>) -> Result<PluginInput> {
    let directory = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()
            .context("Failed to determine current directory")?
            .to_string_lossy()
            .into_owned(),
    };
    let env: HashMap<String, String> = std::env::vars().collect();
    Ok(PluginInput { directory, env })
}

/// 处理 hook 命令：读取 stdin 事件流直到 EOF
pub async fn handle_hook(args: HookArgs) -> Result<()> {
    let Some(mut plugin) = NtfyPlugin::activate(plugin_input(args.directory)?)? else {
        return Ok(());
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let stats = run_event_loop(&mut plugin, stdin)
        .await
        .context("Failed to read events from stdin")?;

    info!(?stats, "Event stream closed");
    Ok(())
}

/// 处理 event 命令：单个事件，推送失败时返回错误
pub async fn handle_event(args: EventArgs) -> Result<()> {
    let event = HostEvent::parse(&args.payload)
        .with_context(|| format!("Failed to parse event payload: {}", args.payload))?;

    let Some(mut plugin) = NtfyPlugin::activate(plugin_input(args.directory)?)? else {
        return Ok(());
    };

    match plugin.handle_event(&event).await? {
        HandleOutcome::Sent(payload) => println!("sent: {}", payload.title),
        HandleOutcome::Suppressed => println!("suppressed"),
        HandleOutcome::Ignored => println!("ignored: {}", event.event_type()),
    }
    Ok(())
}
