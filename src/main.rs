//! agent-ntfy CLI
//!
//! 把 AI 编码代理 (OpenCode 等) 的 session.idle / session.error / permission.asked
//! 事件推送到 ntfy

use agent_ntfy::cli::{ConfigArgs, EventArgs, HookArgs, SendArgs};
use agent_ntfy::parse_iso8601_duration;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "agent-ntfy")]
#[command(about = "agent-ntfy - 把编码代理的生命周期事件推送到 ntfy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 从 stdin 逐行读取宿主事件并推送（每行一个 JSON）
    Hook(HookArgs),
    /// 处理单个事件
    Event(EventArgs),
    /// 直接发送一条通知
    Send(SendArgs),
    /// 查看当前配置（token 已脱敏）
    Config(ConfigArgs),
    /// 解析 ISO 8601 时长并输出毫秒数
    Duration {
        /// 时长，如 PT30S、PT1H30M
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug agent-ntfy hook
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agent_ntfy=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hook(args) => agent_ntfy::cli::handle_hook(args).await?,
        Commands::Event(args) => agent_ntfy::cli::handle_event(args).await?,
        Commands::Send(args) => agent_ntfy::cli::handle_send(args).await?,
        Commands::Config(args) => agent_ntfy::cli::handle_config(args)?,
        Commands::Duration { text } => {
            println!("{}", parse_iso8601_duration(&text)?);
        }
    }

    Ok(())
}
