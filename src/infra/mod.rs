//! 基础设施层 - 外部命令执行

pub mod command;

pub use command::{resolve_field, substitute_template, CommandOutput, CommandRunner, ShellRunner};
