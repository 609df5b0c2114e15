//! Process-tree termination (C12). Ported from `core/process.py`'s Unix
//! branch: graceful `SIGTERM` to the process group, a bounded wait, then
//! `SIGKILL` to the group. The original's Windows branch is not ported —
//! this crate targets Unix.

use std::time::Duration;

use tokio::process::Child;
use tracing::debug;

/// Default grace period between `SIGTERM` and `SIGKILL`.
pub const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(2);

fn getpgid(pid: i32) -> Option<i32> {
    let pgid = unsafe { libc::getpgid(pid) };
    if pgid < 0 { None } else { Some(pgid) }
}

fn killpg(pgid: i32, sig: i32) -> bool {
    unsafe { libc::killpg(pgid, sig) == 0 }
}

/// Terminate `child` and its process group: `SIGTERM`, wait up to
/// `graceful_timeout`, then `SIGKILL` if it is still alive. Swallows
/// lookup/permission failures the same way the original does — a process
/// that already exited, or one we can no longer signal, is not an error here.
pub async fn terminate_process_tree(child: &mut Child, graceful_timeout: Duration) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }

    let Some(pid) = child.id() else { return };
    let pid = pid as i32;

    if let Some(pgid) = getpgid(pid) {
        if killpg(pgid, libc::SIGTERM) {
            debug!(pgid, "sent SIGTERM to process group");
        }
    } else {
        let _ = child.start_kill();
    }

    if tokio::time::timeout(graceful_timeout, child.wait()).await.is_ok() {
        return;
    }

    if let Some(pgid) = getpgid(pid) {
        if killpg(pgid, libc::SIGKILL) {
            debug!(pgid, "sent SIGKILL to process group");
        }
    } else {
        let _ = child.start_kill();
    }

    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    #[tokio::test]
    async fn terminates_a_sleeping_child_promptly() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sleep");

        let start = std::time::Instant::now();
        terminate_process_tree(&mut child, Duration::from_millis(200)).await;
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn already_exited_child_is_a_noop() {
        let mut child = Command::new("true").spawn().expect("spawn true");
        let _ = child.wait().await;
        terminate_process_tree(&mut child, Duration::from_millis(200)).await;
    }
}
