//! Manages the state of long-running, asynchronous background jobs.
//!
//! Certificate batches run outside the request/response cycle. The merge service registers
//! a job here, the batch reports through a channel, and the status, cancel and download
//! routes read the shared maps.
//!
//! The main components are:
//! - `JobsState`: A clonable, thread-safe struct that holds the shared state of all jobs.
//!   It is injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: A message struct used to communicate status changes from a background
//!   job back to the central state manager.
//! - `start_job_updater`: A long-running task that listens for `JobUpdate` messages
//!   on an MPSC channel and applies them to the shared `JobsState`.
//! - `start_job_janitor`: A periodic task that forgets finished jobs, and any archive
//!   nobody downloaded, once they are older than the configured TTL.

use crate::certificates::CancellationFlag;
use common::jobs::JobStatus;
use std::time::{Duration, Instant};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// A thread-safe, shareable container for the state of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Current status per job id. Only the updater task writes after registration.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Finished archives waiting for their single download.
    pub archives: Arc<RwLock<HashMap<String, Vec<u8>>>>,

    /// Cancellation flags of jobs that have not reached a terminal state.
    pub cancellations: Arc<RwLock<HashMap<String, CancellationFlag>>>,

    /// When each job reached its terminal state; drives eviction.
    pub finished: Arc<RwLock<HashMap<String, Instant>>>,

    /// Session that started each job.
    pub owners: Arc<RwLock<HashMap<String, String>>>,

    /// Background tasks push `JobUpdate` messages through this sender instead of
    /// writing to `jobs` themselves.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// Represents a status update for a specific background job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            archives: Arc::new(RwLock::new(HashMap::new())),
            cancellations: Arc::new(RwLock::new(HashMap::new())),
            finished: Arc::new(RwLock::new(HashMap::new())),
            owners: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }

    /// Registers a new job of `session_id` as `Pending` and remembers how to cancel it.
    pub async fn register(&self, job_id: &str, session_id: &str, cancel: CancellationFlag) {
        self.jobs
            .write()
            .await
            .insert(job_id.to_string(), JobStatus::Pending);
        self.cancellations
            .write()
            .await
            .insert(job_id.to_string(), cancel);
        self.owners
            .write()
            .await
            .insert(job_id.to_string(), session_id.to_string());
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Trips the job's cancellation flag. Returns `false` for unknown or finished jobs.
    pub async fn cancel(&self, job_id: &str) -> bool {
        match self.cancellations.read().await.get(job_id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn store_archive(&self, job_id: &str, archive: Vec<u8>) {
        self.archives
            .write()
            .await
            .insert(job_id.to_string(), archive);
    }

    /// Hands the finished archive out once; later calls get `None`.
    pub async fn take_archive(&self, job_id: &str) -> Option<Vec<u8>> {
        self.archives.write().await.remove(job_id)
    }

    /// Forgets every job that finished at least `ttl` before `now`, archive included.
    ///
    /// Returns the number of jobs removed.
    pub async fn evict_expired(&self, ttl: Duration, now: Instant) -> usize {
        let mut jobs = self.jobs.write().await;
        let mut finished = self.finished.write().await;
        let expired: Vec<String> = finished
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) >= ttl)
            .map(|(job_id, _)| job_id.clone())
            .collect();

        let mut archives = self.archives.write().await;
        let mut owners = self.owners.write().await;
        for job_id in &expired {
            jobs.remove(job_id);
            finished.remove(job_id);
            archives.remove(job_id);
            owners.remove(job_id);
        }
        expired.len()
    }

    /// Drops the jobs of a deleted session.
    ///
    /// Running jobs are cancelled and left to finish, so the janitor collects them later.
    /// Finished ones are removed right away together with their archives.
    pub async fn discard_session(&self, session_id: &str) -> usize {
        let mut jobs = self.jobs.write().await;
        let cancellations = self.cancellations.read().await;
        let mut finished = self.finished.write().await;
        let mut archives = self.archives.write().await;
        let mut owners = self.owners.write().await;

        let owned: Vec<String> = owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == session_id)
            .map(|(job_id, _)| job_id.clone())
            .collect();
        for job_id in &owned {
            archives.remove(job_id);
            match cancellations.get(job_id) {
                Some(flag) => flag.cancel(),
                None => {
                    jobs.remove(job_id);
                    finished.remove(job_id);
                    owners.remove(job_id);
                }
            }
        }
        owned.len()
    }
}

/// Starts the central job state updater task.
///
/// Spawned once from `main.rs`; it runs until every sender is dropped.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let terminal = update.status.is_terminal();
        let job_id = update.job_id.clone();
        // The flag goes away before readers can observe the terminal status.
        let mut jobs = state.jobs.write().await;
        if apply_update(&mut jobs, update) && terminal {
            state.cancellations.write().await.remove(&job_id);
            state.finished.write().await.insert(job_id, Instant::now());
        }
    }
}

/// Periodically evicts finished jobs older than `ttl`.
///
/// Spawned once from `main.rs` next to the updater.
pub async fn start_job_janitor(state: JobsState, ttl: Duration) {
    let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let evicted = state.evict_expired(ttl, Instant::now()).await;
        if evicted > 0 {
            log::info!("evicted {} finished jobs", evicted);
        }
    }
}

/// Applies one update unless it would leave a terminal state or move progress back.
///
/// Returns whether the stored status changed.
pub(crate) fn apply_update(jobs: &mut HashMap<String, JobStatus>, update: JobUpdate) -> bool {
    let accept = match (jobs.get(&update.job_id), &update.status) {
        (Some(current), _) if current.is_terminal() => false,
        (Some(JobStatus::InProgress(current)), JobStatus::InProgress(next)) => next >= current,
        (Some(JobStatus::InProgress(_)), JobStatus::Pending) => false,
        _ => true,
    };
    if accept {
        log::debug!("job {} -> {:?}", update.job_id, update.status);
        jobs.insert(update.job_id, update.status);
    }
    accept
}
