//! Persistence synchronizer
//!
//! Decouples frequent in-memory mutations from durable writes. The store
//! pushes a [`SyncIntent`] onto an unbounded channel after each change; a
//! background task owns the [`Debouncer`] and only the latest snapshot in a
//! debounce window reaches the data service.
//!
//! Saves are not retried. A failed save is logged and dropped; the next
//! mutation schedules a new one with the then-current state.

pub mod debounce;
pub mod service;

pub use debounce::Debouncer;
pub use service::{DataService, HttpDataService};

use crate::roster::types::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Work item for the persistence task
#[derive(Debug)]
pub enum SyncIntent {
    /// (Re)start the debounce window with this snapshot as the latest state
    Save(Snapshot),
    /// Persist the pending snapshot now, then acknowledge once all writes
    /// issued so far have completed
    Flush(oneshot::Sender<()>),
    /// Discard the pending snapshot and wait for writes already under way.
    /// Replies whether a snapshot was discarded.
    Cancel(oneshot::Sender<bool>),
}

/// Sender side of the persistence task, held by the store
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncIntent>,
    service: Arc<dyn DataService>,
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl SyncHandle {
    /// Queue `snapshot` for a debounced write; never blocks
    pub fn schedule_save(&self, snapshot: Snapshot) {
        if self.tx.send(SyncIntent::Save(snapshot)).is_err() {
            tracing::warn!("Persistence task has stopped; change will not be saved");
        }
    }

    /// Write any pending snapshot immediately and wait for in-flight saves
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SyncIntent::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Drop a save that has not started yet and wait for the ones that have.
    ///
    /// Returns true if a pending snapshot was discarded.
    pub async fn cancel_pending(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SyncIntent::Cancel(done_tx)).is_err() {
            return false;
        }
        done_rx.await.unwrap_or(false)
    }

    pub fn service(&self) -> Arc<dyn DataService> {
        self.service.clone()
    }
}

/// Spawns the persistence task
pub struct Synchronizer;

impl Synchronizer {
    /// Start a persistence task writing to `service` with the given debounce
    /// window. The task ends once every [`SyncHandle`] is dropped, writing
    /// out a snapshot that was still waiting.
    pub fn spawn(service: Arc<dyn DataService>, debounce: Duration) -> SyncHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(service.clone(), debounce, rx));
        SyncHandle { tx, service }
    }
}

async fn run(
    service: Arc<dyn DataService>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<SyncIntent>,
) {
    let mut debouncer = Debouncer::new(debounce);
    // Serialises writes from this client so an older snapshot never lands
    // after a newer one
    let gate = Arc::new(Mutex::new(()));
    let mut latest: Option<Snapshot> = None;

    while let Some(intent) = rx.recv().await {
        match intent {
            SyncIntent::Save(snapshot) => {
                latest = Some(snapshot.clone());
                let service = service.clone();
                let gate = gate.clone();
                debouncer.schedule(async move {
                    save(service.as_ref(), &gate, &snapshot).await;
                });
            }
            SyncIntent::Flush(done) => {
                settle(&mut debouncer, service.as_ref(), &gate, &mut latest).await;
                let _ = done.send(());
            }
            SyncIntent::Cancel(done) => {
                let discarded = debouncer.cancel();
                latest = None;
                debouncer.wait_running().await;
                if discarded {
                    tracing::debug!("Discarded pending roster snapshot");
                }
                let _ = done.send(discarded);
            }
        }
    }

    settle(&mut debouncer, service.as_ref(), &gate, &mut latest).await;
    tracing::debug!("Persistence task stopped");
}

/// Finish saves already under way, then write the waiting snapshot if any
async fn settle(
    debouncer: &mut Debouncer,
    service: &dyn DataService,
    gate: &Mutex<()>,
    latest: &mut Option<Snapshot>,
) {
    let waiting = debouncer.cancel();
    debouncer.wait_running().await;
    if waiting {
        if let Some(snapshot) = latest.take() {
            save(service, gate, &snapshot).await;
        }
    }
}

async fn save(service: &dyn DataService, gate: &Mutex<()>, snapshot: &Snapshot) {
    let _guard = gate.lock().await;
    match service.replace(snapshot).await {
        Ok(()) => tracing::debug!(
            people = snapshot.people.len(),
            assignments = snapshot.assignments.len(),
            "Saved roster snapshot"
        ),
        Err(e) => tracing::warn!("Failed to save roster snapshot: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::roster::store::RosterStore;
    use crate::roster::types::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every replace call; optionally fails them
    #[derive(Default)]
    struct RecordingService {
        stored: std::sync::Mutex<Snapshot>,
        saves: std::sync::Mutex<Vec<Snapshot>>,
        fail_saves: AtomicBool,
        fail_fetch: AtomicBool,
    }

    impl RecordingService {
        fn saves(&self) -> Vec<Snapshot> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DataService for RecordingService {
        async fn fetch(&self) -> Result<Snapshot> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(Error::Service("connection refused".to_string()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(Error::Service("disk full".to_string()));
            }
            self.saves.lock().unwrap().push(snapshot.clone());
            *self.stored.lock().unwrap() = snapshot.clone();
            Ok(())
        }
    }

    fn person(nickname: &str) -> NewPerson {
        NewPerson {
            nickname: nickname.to_string(),
            full_name: format!("{} Example", nickname),
            email: format!("{}@example.com", nickname.to_lowercase()),
            color_index: None,
        }
    }

    fn store_with(service: &Arc<RecordingService>) -> RosterStore {
        let handle = Synchronizer::spawn(service.clone(), Duration::from_secs(1));
        RosterStore::with_sync(handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_coalesce_into_one_save() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);

        let c = store.add_committee(NewCommittee {
            name: "Logistics".to_string(),
            description: None,
        });
        for name in ["Al", "Bea", "Cy", "Di"] {
            store.add_person(person(name));
        }
        store.update_committee(
            &c,
            CommitteePatch {
                name: Some("Ops".to_string()),
                ..Default::default()
            },
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(service.saves().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let saves = service.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(&saves[0], store.snapshot());
        assert_eq!(saves[0].people.len(), 4);
        assert_eq!(saves[0].committees[0].name, "Ops");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_save_separately() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);

        store.add_person(person("Al"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        store.add_person(person("Bea"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let saves = service.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[0].people.len(), 1);
        assert_eq!(saves[1].people.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_does_not_save() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);

        store.set_selected_person(Some("p1".to_string()));
        store.toggle_group("Community");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_saves_immediately() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);

        store.add_person(person("Al"));
        store.flush().await;
        assert_eq!(service.saves().len(), 1);

        // Nothing left pending after a flush
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(service.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_dropped_then_next_mutation_saves() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);

        service.fail_saves.store(true, Ordering::SeqCst);
        store.add_person(person("Al"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.saves().is_empty());

        service.fail_saves.store(false, Ordering::SeqCst);
        store.add_person(person("Bea"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        let saves = service.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].people.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_writes_pending_snapshot() {
        let service = Arc::new(RecordingService::default());
        {
            let mut store = store_with(&service);
            store.add_person(person("Al"));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(service.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_inside_window_discards_stale_save() {
        let service = Arc::new(RecordingService::default());
        service.stored.lock().unwrap().committees.push(Committee {
            id: "c-server".to_string(),
            name: "ServerSide".to_string(),
            description: None,
        });

        let mut store = store_with(&service);
        store.add_person(person("Local"));
        store.load().await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.saves().is_empty());
        let durable = service.stored.lock().unwrap().clone();
        assert_eq!(&durable, store.snapshot());
        assert_eq!(durable.committees[0].name, "ServerSide");
        assert!(durable.people.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_pending_change() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);
        store.add_person(person("Al"));

        service.fail_fetch.store(true, Ordering::SeqCst);
        assert!(store.load().await.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let saves = service.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].people[0].nickname, "Al");
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_prunes_dangling_assignments_and_saves() {
        let service = Arc::new(RecordingService::default());
        {
            let mut stored = service.stored.lock().unwrap();
            stored.committees.push(Committee {
                id: "c1".to_string(),
                name: "Logistics".to_string(),
                description: None,
            });
            stored.assignments.push(Assignment {
                id: "a1".to_string(),
                person_id: "gone".to_string(),
                committee_id: "c1".to_string(),
                program_id: "g1".to_string(),
            });
        }

        let mut store = store_with(&service);
        store.load().await.unwrap();
        assert!(store.assignments().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let saves = service.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(&saves[0], store.snapshot());
    }

    #[tokio::test]
    async fn test_load_replaces_state() {
        let service = Arc::new(RecordingService::default());
        {
            let mut stored = service.stored.lock().unwrap();
            stored.people.push(Person {
                id: "p1".to_string(),
                nickname: "JD".to_string(),
                full_name: "Jane Doe".to_string(),
                email: "jane@x.com".to_string(),
                color_index: 0,
            });
            stored.committees.push(Committee {
                id: "c1".to_string(),
                name: "Logistics".to_string(),
                description: None,
            });
        }

        let mut store = store_with(&service);
        store.load().await.unwrap();
        assert_eq!(store.people().len(), 1);
        assert_eq!(store.committees().len(), 1);
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_state() {
        let service = Arc::new(RecordingService::default());
        let mut store = store_with(&service);
        store.add_person(person("Al"));

        service.fail_fetch.store(true, Ordering::SeqCst);
        assert!(store.load().await.is_err());
        assert_eq!(store.people().len(), 1);
        assert!(store.last_error().unwrap().contains("connection refused"));
    }
}
