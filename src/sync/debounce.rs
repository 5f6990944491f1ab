//! One-shot deferred task with cancel-and-reschedule semantics

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const WAITING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

struct Pending {
    handle: JoinHandle<()>,
    state: Arc<AtomicU8>,
}

/// Holds at most one waiting deferred task.
///
/// Scheduling replaces whatever is waiting. Once the delay elapses the task
/// is committed: a later `cancel` or `schedule` never aborts work that has
/// already started. Committed tasks can be awaited with
/// [`Debouncer::wait_running`].
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
    running: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .field("running", &self.running.len())
            .finish()
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            running: Vec::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the delay, cancelling any task still waiting
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        let state = Arc::new(AtomicU8::new(WAITING));
        let timer_state = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if timer_state
                .compare_exchange(WAITING, FIRED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                task.await;
            }
        });
        self.pending = Some(Pending { handle, state });
    }

    /// Drop the waiting task. Returns true if one was still waiting; a task
    /// whose delay already elapsed keeps running.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let claimed = pending
            .state
            .compare_exchange(WAITING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            pending.handle.abort();
        } else {
            self.running.retain(|h| !h.is_finished());
            if !pending.handle.is_finished() {
                self.running.push(pending.handle);
            }
        }
        claimed
    }

    /// True while a task is waiting for its delay to elapse
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.state.load(Ordering::SeqCst) == WAITING)
    }

    /// Wait for every task whose delay elapsed before the last `cancel`
    pub async fn wait_running(&mut self) {
        for handle in self.running.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("Deferred task failed: {}", e);
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
