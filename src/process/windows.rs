use std::io;
use std::time::Duration;
use tokio::process::{Child, Command};

/// No graceful stage on this platform
pub const GRACE_PERIOD: Duration = Duration::ZERO;

const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

pub(super) fn isolate(cmd: &mut Command) {
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

/// Kills the direct child only; grandchildren are not guaranteed to exit.
pub(super) async fn terminate(child: &mut Child) -> io::Result<()> {
    if child.id().is_none() {
        return Ok(());
    }
    if let Err(e) = child.start_kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            return Err(e);
        }
    }
    child.wait().await?;
    Ok(())
}

/// Group members cannot be reached without job objects.
pub(super) fn kill_group(_pgid: u32) {}
