//! Process groups for spawned children.
//!
//! A wrapped script may start processes of its own. Giving the child a group
//! of its own lets a deadline take all of them down at once, the way
//! coreutils `timeout` does.

use tokio::process::{Child, Command};

/// Makes the command the leader of a new process group once spawned.
pub(crate) fn own_group(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Kills the whole process group of a child when dropped, unless released.
///
/// Dropping the future that waits on a child (a deadline winning a
/// `select!`) drops the guard with it.
#[derive(Debug)]
pub(crate) struct GroupGuard {
    leader: Option<u32>,
}

impl GroupGuard {
    pub(crate) fn new(child: &Child) -> Self {
        Self { leader: child.id() }
    }

    /// The child ended on its own; leftovers of a finished run are not ours to kill.
    pub(crate) fn release(&mut self) {
        self.leader = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(leader) = self.leader.take() {
            log::debug!("Killing process group {leader}");
            kill_group(leader);
        }
    }
}

#[cfg(unix)]
fn kill_group(leader: u32) {
    // SAFETY: killpg only sends a signal; a group that is already gone yields ESRCH
    unsafe {
        libc::killpg(leader as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;

    #[tokio::test]
    async fn dropping_the_guard_kills_grandchildren() {
        let dir = tempfile::TempDir::new().unwrap();
        let late = dir.path().join("late");
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(format!("(sleep 1; touch {}) & wait", late.display()))
            .stdout(Stdio::null())
            .kill_on_drop(true);
        let child = own_group(&mut command).spawn().unwrap();

        let guard = GroupGuard::new(&child);
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(guard);
        drop(child);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!late.exists());
    }

    #[tokio::test]
    async fn released_guard_leaves_the_group_alone() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("exit 0");
        let mut child = own_group(&mut command).spawn().unwrap();

        let mut guard = GroupGuard::new(&child);
        child.wait().await.unwrap();
        guard.release();
        assert!(guard.leader.is_none());
    }
}
