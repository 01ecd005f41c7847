//! 外部命令执行 - 通知字段的动态解析
//!
//! 配置里的命令模板先做 `${NAME}` 变量替换，再交给 shell 执行，
//! 输出（去除首尾空白后）作为字段值。任何失败都回退到默认值。

use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

static TEMPLATE_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").unwrap());

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// 标准输出（原样）
    pub stdout: String,
    /// 退出码，被信号终止时为 None
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// 命令执行能力
///
/// 测试中可替换为不启动真实进程的实现。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行一条 shell 命令
    async fn run(&self, command: &str) -> io::Result<CommandOutput>;
}

/// 通过 `sh -c` 执行命令
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new() -> Self {
        let shell = which::which("sh").unwrap_or_else(|_| PathBuf::from("/bin/sh"));
        Self {
            shell,
            timeout: None,
        }
    }

    /// 设置单条命令的超时时间
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = cmd.output();

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("command timed out after {}ms", timeout.as_millis()),
                )
            })??,
            None => child.await?,
        };

        if !output.stderr.is_empty() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Command wrote to stderr"
            );
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// 替换模板中的 `${NAME}` 变量
///
/// 未知变量替换为空字符串；替换结果不会再次扫描。
pub fn substitute_template(template: &str, variables: &HashMap<String, String>) -> String {
    TEMPLATE_VAR
        .replace_all(template, |caps: &Captures| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// 解析单个通知字段
///
/// 模板为空、命令执行失败、退出码非 0 或输出为空时返回 `fallback`。
pub async fn resolve_field<R>(
    runner: &R,
    command_template: Option<&str>,
    variables: &HashMap<String, String>,
    fallback: &str,
) -> String
where
    R: CommandRunner + ?Sized,
{
    let template = match command_template {
        Some(t) if !t.is_empty() => t,
        _ => return fallback.to_string(),
    };

    let command = substitute_template(template, variables);

    match runner.run(&command).await {
        Ok(output) if !output.success() => {
            warn!(command = %command, exit_code = ?output.exit_code, "Field command failed, using fallback");
            fallback.to_string()
        }
        Ok(output) => {
            let trimmed = output.stdout.trim();
            if trimmed.is_empty() {
                debug!(command = %command, "Field command produced no output, using fallback");
                fallback.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!(command = %command, error = %e, "Field command could not run, using fallback");
            fallback.to_string()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 测试用的 runner：记录命令并返回预设结果
    pub(crate) struct FakeRunner {
        handler: Box<dyn Fn(&str) -> io::Result<CommandOutput> + Send + Sync>,
        pub(crate) commands: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub(crate) fn new<F>(handler: F) -> Self
        where
            F: Fn(&str) -> io::Result<CommandOutput> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                commands: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(stdout: &str, exit_code: i32) -> Self {
            let stdout = stdout.to_string();
            Self::new(move |_| {
                Ok(CommandOutput {
                    stdout: stdout.clone(),
                    exit_code: Some(exit_code),
                })
            })
        }

        pub(crate) fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, command: &str) -> io::Result<CommandOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            (self.handler)(command)
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let v = vars(&[("PROJECT", "my-project"), ("EVENT", "session.idle")]);
        assert_eq!(
            substitute_template(r#"echo "${PROJECT} - ${EVENT} ${ERROR}""#, &v),
            r#"echo "my-project - session.idle ""#
        );
    }

    #[test]
    fn test_substitute_is_single_pass() {
        let v = vars(&[("A", "${B}"), ("B", "nope")]);
        assert_eq!(substitute_template("${A}", &v), "${B}");
    }

    #[test]
    fn test_substitute_leaves_other_dollar_forms() {
        let v = vars(&[("HOME", "/root")]);
        assert_eq!(substitute_template("echo $HOME ${HOME}", &v), "echo $HOME /root");
    }

    #[tokio::test]
    async fn test_resolve_missing_template_returns_fallback() {
        let runner = FakeRunner::replying("should not run", 0);
        assert_eq!(resolve_field(&runner, None, &HashMap::new(), "fb").await, "fb");
        assert_eq!(resolve_field(&runner, Some(""), &HashMap::new(), "fb").await, "fb");
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_substitutes_and_trims() {
        let runner = FakeRunner::replying("  custom title  \n", 0);
        let v = vars(&[
            ("PROJECT", "my-project"),
            ("EVENT", "session.idle"),
            ("TIME", "2026-01-01T00:00:00Z"),
        ]);
        let result = resolve_field(&runner, Some(r#"echo "${PROJECT} - ${EVENT}""#), &v, "fb").await;
        assert_eq!(result, "custom title");
        assert_eq!(runner.commands(), vec![r#"echo "my-project - session.idle""#.to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_unset_variable_is_empty() {
        let runner = FakeRunner::replying("result", 0);
        let v = vars(&[("PROJECT", "my-project")]);
        let result = resolve_field(&runner, Some(r#"echo "${PROJECT} ${ERROR}""#), &v, "fb").await;
        assert_eq!(result, "result");
        assert_eq!(runner.commands(), vec![r#"echo "my-project ""#.to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_nonzero_exit_returns_fallback() {
        let runner = FakeRunner::replying("some output before failure", 1);
        assert_eq!(
            resolve_field(&runner, Some("failing-command"), &HashMap::new(), "fb").await,
            "fb"
        );
    }

    #[tokio::test]
    async fn test_resolve_killed_process_returns_fallback() {
        let runner = FakeRunner::new(|_| {
            Ok(CommandOutput {
                stdout: "partial".to_string(),
                exit_code: None,
            })
        });
        assert_eq!(resolve_field(&runner, Some("x"), &HashMap::new(), "fb").await, "fb");
    }

    #[tokio::test]
    async fn test_resolve_whitespace_output_returns_fallback() {
        let runner = FakeRunner::replying("   \n", 0);
        assert_eq!(resolve_field(&runner, Some("echo ''"), &HashMap::new(), "fb").await, "fb");
    }

    #[tokio::test]
    async fn test_resolve_runner_error_returns_fallback() {
        let runner = FakeRunner::new(|_| Err(io::Error::new(io::ErrorKind::NotFound, "no shell")));
        assert_eq!(resolve_field(&runner, Some("anything"), &HashMap::new(), "fb").await, "fb");
    }

    #[tokio::test]
    async fn test_shell_runner_executes_command() {
        let runner = ShellRunner::new();
        let output = runner.run("printf 'hello'; exit 0").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");

        let output = runner.run("echo nope; exit 3").await.unwrap();
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_shell_runner_runs_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("title.sh");
        std::fs::write(&script, "echo \"$1 is idle\"\n").unwrap();

        let script_path = script.to_string_lossy().to_string();

        let runner = ShellRunner::new();
        let v = vars(&[("SCRIPT", script_path.as_str()), ("PROJECT", "demo")]);
        let result = resolve_field(&runner, Some("sh ${SCRIPT} ${PROJECT}"), &v, "fb").await;
        assert_eq!(result, "demo is idle");
    }

    #[tokio::test]
    async fn test_shell_runner_timeout_falls_back() {
        let runner = ShellRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let err = runner.run("sleep 5").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(resolve_field(&runner, Some("sleep 5"), &HashMap::new(), "fb").await, "fb");
    }
}
