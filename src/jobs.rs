use crate::{
    models::{ApiError, SyncRequest, SyncResponse},
    sync::SyncService,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::info;
use uuid::Uuid;

/// Completed jobs beyond this count are dropped oldest first.
const MAX_FINISHED_JOBS: usize = 1024;

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    statuses: Arc<Mutex<HashMap<Uuid, Tracked>>>,
    retention: Duration,
}

struct Tracked {
    state: JobState,
    finished_at: Option<Instant>,
}

impl Tracked {
    fn open(state: JobState) -> Self {
        Self {
            state,
            finished_at: None,
        }
    }
}

struct Job {
    id: Uuid,
    items: Vec<SyncRequest>,
}

/// Outcome for one item of a batch; items fail independently.
#[derive(Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchItem {
    Synced {
        #[serde(flatten)]
        response: SyncResponse,
    },
    Rejected {
        #[serde(rename = "productId", skip_serializing_if = "Option::is_none")]
        product_id: Option<String>,
        #[serde(flatten)]
        error: ApiError,
    },
}

#[derive(Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed {
        synced: usize,
        rejected: usize,
        items: Vec<BatchItem>,
    },
}

#[derive(Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobQueue {
    /// Starts the worker. Completed jobs stay queryable for `retention`.
    pub fn spawn(
        service: SyncService,
        capacity: usize,
        retention: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity);
        let statuses = Arc::new(Mutex::new(HashMap::new()));
        let statuses_bg = statuses.clone();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                {
                    let mut guard = statuses_bg.lock().await;
                    guard.insert(job.id, Tracked::open(JobState::Running));
                }

                let mut items = Vec::with_capacity(job.items.len());
                for request in job.items {
                    let product_id = request.product_id.clone();
                    match service.run(request).await {
                        Ok(response) => items.push(BatchItem::Synced { response }),
                        Err(err) => items.push(BatchItem::Rejected {
                            product_id,
                            error: ApiError::new(err.kind().code(), err.to_string()),
                        }),
                    }
                }
                let synced = items
                    .iter()
                    .filter(|item| matches!(item, BatchItem::Synced { .. }))
                    .count();
                let rejected = items.len() - synced;
                info!(
                    target = "pricesync.jobs",
                    job_id = %job.id,
                    synced,
                    rejected,
                    "batch sync finished"
                );

                let mut guard = statuses_bg.lock().await;
                let now = Instant::now();
                guard.insert(
                    job.id,
                    Tracked {
                        state: JobState::Completed {
                            synced,
                            rejected,
                            items,
                        },
                        finished_at: Some(now),
                    },
                );
                prune(&mut guard, now, retention);
            }
        });

        (
            Self {
                tx,
                statuses,
                retention,
            },
            handle,
        )
    }

    pub async fn enqueue_batch(&self, items: Vec<SyncRequest>) -> Result<Uuid, ApiError> {
        let id = Uuid::new_v4();
        {
            let mut guard = self.statuses.lock().await;
            prune(&mut guard, Instant::now(), self.retention);
            guard.insert(id, Tracked::open(JobState::Queued));
        }
        if self.tx.send(Job { id, items }).await.is_err() {
            self.statuses.lock().await.remove(&id);
            return Err(ApiError::new(
                "queue_send_failed",
                "sync worker is not available",
            ));
        }
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<JobInfo> {
        let mut guard = self.statuses.lock().await;
        prune(&mut guard, Instant::now(), self.retention);
        guard.get(&id).map(|tracked| JobInfo {
            id: id.to_string(),
            state: tracked.state.clone(),
        })
    }
}

/// Drops completed jobs older than `retention`, then the oldest completed
/// ones past `MAX_FINISHED_JOBS`. Queued and running jobs are never dropped.
fn prune(statuses: &mut HashMap<Uuid, Tracked>, now: Instant, retention: Duration) {
    statuses.retain(|_, tracked| {
        tracked
            .finished_at
            .is_none_or(|at| now.duration_since(at) < retention)
    });
    let mut finished: Vec<(Instant, Uuid)> = statuses
        .iter()
        .filter_map(|(id, tracked)| tracked.finished_at.map(|at| (at, *id)))
        .collect();
    if finished.len() <= MAX_FINISHED_JOBS {
        return;
    }
    finished.sort_unstable();
    for (_, id) in finished.iter().take(finished.len() - MAX_FINISHED_JOBS) {
        statuses.remove(id);
    }
}
