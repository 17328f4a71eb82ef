use std::io;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::debug;

/// Time between the graceful and the forced signal
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

pub(super) fn isolate(cmd: &mut Command) {
    cmd.process_group(0);
}

fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

pub(super) async fn terminate(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped
        return Ok(());
    };

    // SAFETY: getpgid(2) has no memory-safety preconditions.
    let pgid = unsafe { libc::getpgid(pid as libc::pid_t) };
    if pgid < 0 {
        child.start_kill()?;
        child.wait().await?;
        return Ok(());
    }

    if let Err(e) = signal_group(pgid, libc::SIGTERM) {
        debug!("SIGTERM to process group {} failed: {}", pgid, e);
    }
    tokio::time::sleep(GRACE_PERIOD).await;
    if let Err(e) = signal_group(pgid, libc::SIGKILL) {
        debug!("SIGKILL to process group {} failed: {}", pgid, e);
    }

    child.wait().await?;
    Ok(())
}

/// Kill whatever is left in a group whose leader has already exited.
pub(super) fn kill_group(pgid: u32) {
    if let Err(e) = signal_group(pgid as libc::pid_t, libc::SIGKILL) {
        if e.raw_os_error() != Some(libc::ESRCH) {
            debug!("SIGKILL to process group {} failed: {}", pgid, e);
        }
    }
}
