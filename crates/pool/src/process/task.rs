use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::LaunchError;
use crate::scheduler::task::Runnable;

use super::output;
use super::status::{StatusHandle, TaskState};

/// A named OS command run as a child process.
///
/// On Unix the child leads its own process group, so stopping reaches
/// everything it spawned: SIGTERM goes to the whole group, and the group is
/// SIGKILLed if the leader is still alive once the grace period has passed.
/// The direct child is also killed if the task is dropped while running.
pub struct ProcessTask {
    name: String,
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    current_dir: Option<PathBuf>,
    output_prefix: Option<String>,
    child: Option<Child>,
    status: StatusHandle,
}

impl ProcessTask {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        let name = name.into();
        let status = StatusHandle::new(&name);
        Self {
            name,
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
            output_prefix: None,
            child: None,
            status,
        }
    }

    /// Run `command_line` through `sh -c`.
    pub fn shell(name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self::new(name, "sh").arg("-c").arg(command_line)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: HashMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Pipe stdout/stderr and relay each line behind `prefix`
    /// (see [`output::prefix_for`]). Without a prefix output is inherited.
    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }

    /// Handle for observing this task's progress after it is moved into the pool.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Program and arguments as a single display string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        if self.output_prefix.is_some() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        cmd
    }
}

#[async_trait]
impl Runnable for ProcessTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> Result<(), LaunchError> {
        if self.status.state() != TaskState::Pending {
            return Err(LaunchError::AlreadyStarted(self.name.clone()));
        }

        let mut child = self.build_command().spawn().map_err(|source| {
            self.status.mark_finished(TaskState::LaunchFailed {
                reason: source.to_string(),
            });
            LaunchError::Spawn {
                task: self.name.clone(),
                source,
            }
        })?;

        if let Some(prefix) = &self.output_prefix {
            output::relay(&mut child, prefix);
        }

        let pid = child.id();
        debug!(task = %self.name, pid = ?pid, command = %self.command_line(), "spawned process");
        self.status.mark_running(pid);
        self.child = Some(child);
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(exit)) => {
                debug!(task = %self.name, code = ?exit.code(), "process exited");
                self.status.mark_finished(TaskState::Exited { code: exit.code() });
                self.child = None;
                false
            }
            Err(e) => {
                warn!(task = %self.name, error = %e, "failed to poll process, treating as exited");
                self.status.mark_finished(TaskState::Exited { code: None });
                self.child = None;
                false
            }
        }
    }

    async fn stop(&mut self, timeout: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(Some(exit)) = child.try_wait() {
            self.status.mark_finished(TaskState::Exited { code: exit.code() });
            return;
        }

        terminate(&mut child, &self.name).await;

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(exit)) => {
                info!(task = %self.name, code = ?exit.code(), "process stopped gracefully");
                self.status.mark_finished(TaskState::Stopped {
                    forced: false,
                    code: exit.code(),
                });
            }
            Ok(Err(e)) => {
                warn!(task = %self.name, error = %e, "error waiting for stopped process");
                self.status.mark_finished(TaskState::Stopped {
                    forced: false,
                    code: None,
                });
            }
            Err(_) => {
                warn!(task = %self.name, timeout = ?timeout, "grace period elapsed, force killing");
                #[cfg(unix)]
                if let Some(pid) = child.id() {
                    signal_group(pid, "KILL", &self.name).await;
                }
                if let Err(e) = child.kill().await {
                    warn!(task = %self.name, error = %e, "force kill failed");
                }
                self.status.mark_finished(TaskState::Stopped {
                    forced: true,
                    code: None,
                });
            }
        }
    }
}

/// Ask the child to exit: SIGTERM to its process group on Unix, an
/// immediate kill elsewhere.
async fn terminate(child: &mut Child, name: &str) {
    let Some(pid) = child.id() else {
        return;
    };

    #[cfg(unix)]
    signal_group(pid, "TERM", name).await;

    #[cfg(not(unix))]
    {
        if let Err(e) = child.start_kill() {
            warn!(task = %name, pid = pid, error = %e, "failed to send kill signal");
        }
    }
}

/// Send `signal` to every process in the group led by `pid`.
#[cfg(unix)]
async fn signal_group(pid: u32, signal: &str, name: &str) {
    let flag = format!("-{signal}");
    let group = format!("-{pid}");
    match Command::new("kill")
        .args([flag.as_str(), "--", group.as_str()])
        .status()
        .await
    {
        Ok(status) if status.success() => {
            debug!(task = %name, pgid = pid, signal = signal, "signalled process group")
        }
        Ok(status) => {
            debug!(task = %name, pgid = pid, signal = signal, code = ?status.code(), "process group already gone")
        }
        Err(e) => warn!(task = %name, pgid = pid, signal = signal, error = %e, "failed to signal process group"),
    }
}
