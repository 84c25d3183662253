// src/utils/command.rs: external process execution

use std::path::Path;
use std::process::Stdio;

use log::error;
use tokio::process::Command;

use crate::config::defs::PipelineError;
use crate::utils::file::append_log;

/// Seam over external process execution. Pipeline stages talk to their
/// wrapped tools through this trait so tests can substitute a recording
/// mock and assert exactly which invocations happened.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Runs `cmd` to completion. Without a log the child inherits the
    /// parent's stdout/stderr; with a log, the joined command line is
    /// appended first and the child's output after it.
    async fn run(&self, cmd: &[String], log: Option<&Path>) -> Result<(), PipelineError>;

    /// Runs `cmd` to completion with stdout redirected into `stdout_to`.
    /// With a log, `cmd > file` is appended and stderr goes to the log.
    async fn run_stdout(
        &self,
        cmd: &[String],
        stdout_to: &Path,
        log: Option<&Path>,
    ) -> Result<(), PipelineError>;
}

/// Joins an argument vector back into the command line used for logs and
/// failure diagnostics.
pub fn command_line(cmd: &[String]) -> String {
    cmd.join(" ")
}

/// Production CommandRunner on tokio::process. One attempt per call, no
/// retries; a non-zero exit becomes a ToolExecution error carrying the
/// reconstructed command line.
pub struct ToolRunner;

impl ToolRunner {
    fn spawn_error(cmd: &[String], e: std::io::Error) -> PipelineError {
        PipelineError::ToolExecution {
            tool: cmd[0].clone(),
            error: format!("Failed to spawn {}: {}. Is {} installed?", cmd[0], e, cmd[0]),
        }
    }

    fn exit_error(cmd: &[String], log: Option<&Path>) -> PipelineError {
        let msg = format!("{}\n", command_line(cmd));
        if let Some(log_path) = log {
            let _ = append_log(log_path, &msg);
        }
        error!("command exited non-zero: {}", command_line(cmd));
        PipelineError::ToolExecution {
            tool: cmd[0].clone(),
            error: msg,
        }
    }

    fn check(cmd: &[String]) -> Result<(), PipelineError> {
        if cmd.is_empty() {
            return Err(PipelineError::InvalidConfig("empty command".to_string()));
        }
        Ok(())
    }
}

impl CommandRunner for ToolRunner {
    async fn run(&self, cmd: &[String], log: Option<&Path>) -> Result<(), PipelineError> {
        Self::check(cmd)?;
        match log {
            None => {
                let status = Command::new(&cmd[0])
                    .args(&cmd[1..])
                    .status()
                    .await
                    .map_err(|e| Self::spawn_error(cmd, e))?;
                if !status.success() {
                    return Err(Self::exit_error(cmd, None));
                }
            }
            Some(log_path) => {
                append_log(log_path, &format!("{}\n", command_line(cmd)))?;
                let output = Command::new(&cmd[0])
                    .args(&cmd[1..])
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await
                    .map_err(|e| Self::spawn_error(cmd, e))?;
                if output.status.success() {
                    append_log(log_path, &String::from_utf8_lossy(&output.stdout))?;
                    append_log(log_path, &String::from_utf8_lossy(&output.stderr))?;
                } else {
                    let mut msg = String::new();
                    if !output.stdout.is_empty() {
                        msg.push_str(&String::from_utf8_lossy(&output.stdout));
                        msg.push('\n');
                    }
                    if !output.stderr.is_empty() {
                        msg.push_str(&String::from_utf8_lossy(&output.stderr));
                        msg.push('\n');
                    }
                    msg.push_str(&command_line(cmd));
                    msg.push('\n');
                    append_log(log_path, &msg)?;
                    error!("command exited non-zero: {}", command_line(cmd));
                    return Err(PipelineError::ToolExecution {
                        tool: cmd[0].clone(),
                        error: msg,
                    });
                }
            }
        }
        Ok(())
    }

    async fn run_stdout(
        &self,
        cmd: &[String],
        stdout_to: &Path,
        log: Option<&Path>,
    ) -> Result<(), PipelineError> {
        Self::check(cmd)?;
        let out_file = std::fs::File::create(stdout_to)?;
        let status = match log {
            None => Command::new(&cmd[0])
                .args(&cmd[1..])
                .stdout(Stdio::from(out_file))
                .status()
                .await
                .map_err(|e| Self::spawn_error(cmd, e))?,
            Some(log_path) => {
                append_log(
                    log_path,
                    &format!("{} > {}\n", command_line(cmd), stdout_to.display()),
                )?;
                let log_file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_path)?;
                Command::new(&cmd[0])
                    .args(&cmd[1..])
                    .stdout(Stdio::from(out_file))
                    .stderr(Stdio::from(log_file))
                    .status()
                    .await
                    .map_err(|e| Self::spawn_error(cmd, e))?
            }
        };
        if !status.success() {
            return Err(Self::exit_error(cmd, log));
        }
        Ok(())
    }
}
