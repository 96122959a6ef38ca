use crate::auth::gate::Destination;
use std::time::Duration;
use tokio::{sync::oneshot, task::JoinHandle, time::sleep};
use tracing::debug;

/// Delayed navigation owned by whoever holds it.
///
/// The timer runs on a spawned task and is aborted when this value is dropped
/// or cancelled, so leaving the screen early never fires a stale redirect.
#[derive(Debug)]
pub struct ScheduledNavigation {
    destination: Destination,
    task: JoinHandle<()>,
    fired: Option<oneshot::Receiver<Destination>>,
}

impl ScheduledNavigation {
    /// Schedule navigation to `destination` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn schedule(destination: Destination, delay: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            debug!(%destination, "scheduled navigation fired");
            let _ = tx.send(destination);
        });

        Self {
            destination,
            task,
            fired: Some(rx),
        }
    }

    #[must_use]
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Wait for the delay to elapse. Returns `None` if it was cancelled.
    pub async fn wait(&mut self) -> Option<Destination> {
        let fired = self.fired.take()?;
        fired.await.ok()
    }

    pub fn cancel(&mut self) {
        self.task.abort();
        self.fired = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.fired.is_some() && !self.task.is_finished()
    }
}

impl Drop for ScheduledNavigation {
    fn drop(&mut self) {
        self.task.abort();
    }
}
