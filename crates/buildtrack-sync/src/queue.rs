//! Offline queue service: buffers mutations and replays them on reconnect

use anyhow::Result;
use buildtrack_core::{ActionPayload, EntityRef, PendingAction, TemporaryId};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::events::{QueueEvent, SyncOutcome};
use crate::network::NetworkMonitor;
use crate::remap::IdentifierRemap;
use crate::remote::{RemoteApi, RemoteError};
use crate::storage::Storage;
use crate::store::QueueStore;
use crate::task_cache::TaskCache;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Why a single action could not be applied
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("references {0}, which has not been created on the server yet")]
    Unresolved(TemporaryId),
}

/// Offline action queue.
///
/// Cheap to clone; clones share storage, the in-flight flag and the event
/// channel, so at most one sync pass runs across all of them.
#[derive(Clone)]
pub struct OfflineQueue {
    store: QueueStore,
    cache: TaskCache,
    remote: Arc<dyn RemoteApi>,
    network: NetworkMonitor,
    events: broadcast::Sender<QueueEvent>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when a pass ends, however it ends
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl OfflineQueue {
    pub fn new(
        storage: Arc<dyn Storage>,
        remote: Arc<dyn RemoteApi>,
        network: NetworkMonitor,
    ) -> Self {
        Self::with_event_capacity(storage, remote, network, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(
        storage: Arc<dyn Storage>,
        remote: Arc<dyn RemoteApi>,
        network: NetworkMonitor,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));

        Self {
            store: QueueStore::new(storage.clone()),
            cache: TaskCache::new(storage),
            remote,
            network,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a queue from configuration
    pub async fn from_config(config: &Config, remote: Arc<dyn RemoteApi>) -> Result<Self> {
        let storage = config.storage.open().await?;
        let network = NetworkMonitor::new(config.sync.start_online);
        info!("Offline queue using {} storage", storage.name());

        Ok(Self::with_event_capacity(
            storage,
            remote,
            network,
            config.sync.event_capacity,
        ))
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn task_cache(&self) -> &TaskCache {
        &self.cache
    }

    /// Subscribe to queue and sync notifications
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Whether a sync pass is running right now
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Store an action for later replay.
    ///
    /// The action is timestamped, persisted and reflected in the project's
    /// task cache. Payloads are not validated.
    pub async fn enqueue(&self, project_id: i64, action: ActionPayload) -> Result<PendingAction> {
        let pending = PendingAction::new(project_id, action);

        let len = match self.store.append(pending.clone()).await {
            Ok(len) => len,
            Err(e) => {
                error!("Failed to enqueue {} for project {}: {:#}", pending.kind(), project_id, e);
                return Err(e);
            }
        };
        debug!("Enqueued {} ({}) for project {}", pending.kind(), pending.id, project_id);

        if let Err(e) = self.cache.apply_optimistic(&pending).await {
            warn!("Failed to update task cache for project {}: {:#}", project_id, e);
        }

        self.emit(QueueEvent::Enqueued { action: pending.clone() });
        self.emit(QueueEvent::QueueChanged { pending: len });
        Ok(pending)
    }

    /// Unsynced actions in enqueue order
    pub async fn list_pending(&self) -> Vec<PendingAction> {
        self.store.load().await
    }

    pub async fn pending_count(&self) -> usize {
        self.store.load().await.len()
    }

    /// Replay the queue against the remote.
    ///
    /// Returns without touching storage or the remote when a pass is already
    /// running, the network is offline, or the queue is empty. Every call
    /// ends with a `SyncCompleted` event carrying the outcome.
    pub async fn try_sync(&self) -> SyncOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Sync already in progress, skipping");
            return self.complete(SyncOutcome::Skipped);
        };

        if !self.network.is_online() {
            debug!("Offline, not syncing");
            return self.complete(SyncOutcome::Offline);
        }

        let snapshot = self.store.load().await;
        if snapshot.is_empty() {
            return self.complete(SyncOutcome::NoOp);
        }

        info!("Sync pass starting: {} pending actions", snapshot.len());
        self.emit(QueueEvent::SyncStarted { pending: snapshot.len() });

        let mut remap = IdentifierRemap::new();
        let mut consumed: HashSet<Uuid> = HashSet::new();
        let mut projects: BTreeSet<i64> = BTreeSet::new();
        let mut failed = 0;

        for pending in &snapshot {
            projects.insert(pending.project_id);

            match self.dispatch(pending, &mut remap).await {
                Ok(()) => {
                    debug!("Applied {} ({})", pending.kind(), pending.id);
                    consumed.insert(pending.id);
                }
                Err(e) => {
                    warn!("Failed to apply {} ({}): {}", pending.kind(), pending.id, e);
                    failed += 1;
                }
            }
        }

        let (outcome, remaining) = match self.store.commit_pass(&consumed, &remap).await {
            Ok(remaining) => {
                self.reconcile_caches(&projects, &remap).await;
                let synced = consumed.len();
                let outcome = if failed == 0 {
                    SyncOutcome::Synced { synced }
                } else {
                    SyncOutcome::Partial { synced, failed }
                };
                (outcome, remaining.len())
            }
            Err(e) => {
                // Nothing was removed, so the whole snapshot counts as failed
                error!(
                    "Failed to persist queue after sync pass, {} applied actions will be replayed: {:#}",
                    consumed.len(),
                    e
                );
                let outcome = SyncOutcome::Partial { synced: 0, failed: snapshot.len() };
                (outcome, self.store.load().await.len())
            }
        };

        info!("Sync pass finished: {}, {} remaining", outcome.notice(), remaining);
        self.complete(outcome);
        self.emit(QueueEvent::QueueChanged { pending: remaining });
        outcome
    }

    /// Run `try_sync` on every offline-to-online transition.
    ///
    /// The task lives as long as the network monitor; abort the handle to
    /// stop it.
    pub fn start_auto_sync(&self) -> JoinHandle<()> {
        let queue = self.clone();
        let mut rx = self.network.subscribe();
        // Read before spawning so a transition racing the spawn is not missed
        let mut was_online = *rx.borrow_and_update();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    info!("Connection restored, replaying offline queue");
                    let outcome = queue.try_sync().await;
                    info!("{}", outcome.notice());
                }
                was_online = online;
            }
        })
    }

    async fn dispatch(
        &self,
        pending: &PendingAction,
        remap: &mut IdentifierRemap,
    ) -> Result<(), DispatchError> {
        let mut payload = pending.action.clone();
        remap.resolve(&mut payload);

        match &payload {
            ActionPayload::CreateTask { temp_id, task } => {
                let id = self.remote.create_task(pending.project_id, task).await?;
                remap.record(temp_id.clone(), id);
            }
            ActionPayload::UpdateTask { task_id, changes } => {
                self.remote.update_task(server_id(task_id)?, changes).await?;
            }
            ActionPayload::AddComment { task_id, comment, temp_id } => {
                let id = self.remote.add_comment(server_id(task_id)?, comment).await?;
                if let Some(temp_id) = temp_id {
                    remap.record(temp_id.clone(), id);
                }
            }
            ActionPayload::UploadDocument { task_id, document, temp_id } => {
                let task_id = task_id.as_ref().map(server_id).transpose()?;
                let id = self
                    .remote
                    .upload_document(pending.project_id, task_id, document)
                    .await?;
                if let Some(temp_id) = temp_id {
                    remap.record(temp_id.clone(), id);
                }
            }
        }

        Ok(())
    }

    async fn reconcile_caches(&self, projects: &BTreeSet<i64>, remap: &IdentifierRemap) {
        for &project_id in projects {
            if let Err(e) = self.cache.reconcile(project_id, remap, &self.store).await {
                warn!("Failed to reconcile task cache for project {}: {:#}", project_id, e);
            }
        }
    }

    fn complete(&self, outcome: SyncOutcome) -> SyncOutcome {
        self.emit(QueueEvent::SyncCompleted { outcome });
        outcome
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn server_id(entity: &EntityRef) -> Result<i64, DispatchError> {
    match entity {
        EntityRef::Server(id) => Ok(*id),
        EntityRef::Temporary(tmp) => Err(DispatchError::Unresolved(tmp.clone())),
    }
}
