//! Subprocess supervision.
//!
//! Conversion tools may fork helpers, so a supervised process is placed in
//! its own process group and terminated as a whole where the platform
//! allows it:
//! - Unix: graceful signal to the group, fixed grace window, then a kill
//!   signal to the group
//! - Windows: new process group for console isolation, direct kill only

use std::ffi::OsString;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

pub use platform::GRACE_PERIOD;

/// Errors from running a supervised process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("a process is already running")]
    AlreadyRunning,

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process exited with {status}")]
    Exited { status: String, stderr: String },

    #[error("process cancelled")]
    Cancelled,
}

/// Sender half of a cancellation context
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Signal every [`CancelSignal`] derived from this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver half of a cancellation context
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    ///
    /// Pends forever if the handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Spawns one subprocess at a time and guarantees it can be torn down.
pub struct ProcessSupervisor {
    program: OsString,
    child: Option<Child>,
    group: Option<u32>,
    stderr_task: Option<JoinHandle<String>>,
}

impl ProcessSupervisor {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            child: None,
            group: None,
            stderr_task: None,
        }
    }

    /// OS process id of the running child
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Start the program in its own process group with stderr captured.
    pub fn spawn(&mut self, args: &[String]) -> Result<(), ProcessError> {
        if self.id().is_some() {
            return Err(ProcessError::AlreadyRunning);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        platform::isolate(&mut cmd);

        let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;
        debug!("Spawned {:?} (pid {:?})", self.program, child.id());
        self.group = child.id();

        let stderr = child.stderr.take();
        self.stderr_task = Some(tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!("Failed to read process stderr: {}", e);
                }
            }
            String::from_utf8_lossy(&buf).trim().to_string()
        }));
        self.child = Some(child);
        Ok(())
    }

    /// Tear down the child and everything in its process group.
    ///
    /// A no-op if nothing was ever spawned.
    pub async fn terminate(&mut self) -> std::io::Result<()> {
        match self.child.as_mut() {
            Some(child) => platform::terminate(child).await,
            None => Ok(()),
        }
    }

    /// Wait for the child to exit, terminating it if `cancel` fires first.
    ///
    /// Helpers left in the child's process group are killed once the child
    /// exits. Cancellation is honoured until stderr has been collected.
    pub async fn wait(&mut self, cancel: &mut CancelSignal) -> Result<(), ProcessError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let Some(status) = status else {
            return Err(self.cancel_running().await);
        };

        if let Some(group) = self.group.take() {
            platform::kill_group(group);
        }

        let status = status.map_err(ProcessError::Wait)?;

        let stderr = match self.stderr_task.as_mut() {
            Some(task) => {
                let collected = tokio::select! {
                    out = task => Some(out.unwrap_or_default()),
                    _ = cancel.cancelled() => None,
                };
                match collected {
                    Some(stderr) => {
                        self.stderr_task = None;
                        stderr
                    }
                    None => return Err(self.cancel_running().await),
                }
            }
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Exited {
                status: status.to_string(),
                stderr,
            })
        }
    }

    /// Spawn and wait in one step
    pub async fn run(
        &mut self,
        args: &[String],
        cancel: &mut CancelSignal,
    ) -> Result<(), ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        self.spawn(args)?;
        self.wait(cancel).await
    }

    async fn cancel_running(&mut self) -> ProcessError {
        if let Err(e) = self.terminate().await {
            warn!("Failed to terminate cancelled process: {}", e);
        }
        if let Some(group) = self.group.take() {
            platform::kill_group(group);
        }
        // Survivors outside the group may still hold the pipe open
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        ProcessError::Cancelled
    }
}
