use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Detached deadline timer for the TIMEOUT mode.
///
/// The handle is created before the wrapped action starts, so the expiry can
/// never be delivered to nobody. Each handle owns its own channel: once the
/// handle is cancelled or dropped, nothing can reach the invocation anymore.
#[derive(Debug)]
pub struct WatcherHandle {
    id: Uuid,
    duration: Duration,
    started_at: Instant,
    task: Option<JoinHandle<()>>,
    expiry: Option<oneshot::Receiver<Uuid>>,
    fired: bool,
}

pub struct TimeoutWatcher;

impl TimeoutWatcher {
    /// Spawns the timer. Must be called from within a tokio runtime.
    pub fn start(duration: Duration) -> WatcherHandle {
        let id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // The receiver is gone when the invocation already finished.
            let _ = sender.send(id);
        });
        log::debug!("Timeout watcher {id} armed for {}s", duration.as_secs());

        WatcherHandle {
            id,
            duration,
            started_at: Instant::now(),
            task: Some(task),
            expiry: Some(receiver),
            fired: false,
        }
    }
}

impl WatcherHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_some() && !self.fired
    }

    /// Resolves when the deadline elapses. Never resolves for a cancelled
    /// handle, so it is safe to race against other work in `select!`.
    pub async fn expired(&mut self) {
        let Some(receiver) = self.expiry.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = receiver.await;
        match outcome {
            Ok(id) if id == self.id => {
                self.expiry = None;
                self.task = None;
                self.fired = true;
            }
            _ => {
                self.expiry = None;
                std::future::pending::<()>().await
            }
        }
    }

    /// Stops the timer if it is still pending. Idempotent.
    ///
    /// Returns `true` when a pending timer was actually stopped.
    pub fn cancel(&mut self) -> bool {
        self.expiry = None;
        match self.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                log::debug!("Timeout watcher {} cancelled after {:?}", self.id, self.elapsed());
                true
            }
            _ => false,
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
