//! Single-consumer work queue that serializes incremental scheduling requests.
//!
//! Producers get a [`ScheduleTicket`] back and may await it or drop it. The worker runs
//! each job on the blocking pool because the service holds a std mutex for the whole of
//! `update_and_schedule`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::domain::{CandidateId, ScheduleOutcome};
use super::repository::{BookingStore, DataSource};
use super::service::{SchedulingError, SchedulingService};

/// Result of one queued job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub candidate_id: CandidateId,
    pub outcome: ScheduleOutcome,
    /// Whether the pending buffer was flushed to the booking store after this job.
    pub persisted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("scheduling queue is closed")]
    Closed,
    #[error("scheduling worker dropped the job before replying")]
    Dropped,
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error("scheduling job panicked: {0}")]
    Panicked(String),
}

struct Job {
    candidate_id: CandidateId,
    reply: oneshot::Sender<Result<JobReport, QueueError>>,
}

/// Cloneable producer handle.
#[derive(Clone)]
pub struct SchedulingQueue {
    sender: mpsc::UnboundedSender<Job>,
}

/// Awaitable completion handle for one enqueued candidate.
pub struct ScheduleTicket {
    candidate_id: CandidateId,
    receiver: oneshot::Receiver<Result<JobReport, QueueError>>,
}

pub struct SchedulingWorker {
    handle: JoinHandle<usize>,
}

impl SchedulingQueue {
    /// Starts the consumer task on the current runtime.
    pub fn spawn<D, B>(service: Arc<SchedulingService<D, B>>) -> (Self, SchedulingWorker)
    where
        D: DataSource + 'static,
        B: BookingStore + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(service, receiver));
        info!("scheduling queue worker started");
        (Self { sender }, SchedulingWorker { handle })
    }

    pub fn enqueue(&self, candidate_id: CandidateId) -> Result<ScheduleTicket, QueueError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(Job {
                candidate_id: candidate_id.clone(),
                reply,
            })
            .map_err(|_| QueueError::Closed)?;
        debug!(candidate_id = %candidate_id, "queued candidate for scheduling");
        Ok(ScheduleTicket {
            candidate_id,
            receiver,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Closes this handle and waits for the worker to finish queued jobs.
    ///
    /// Other clones keep the channel open, so they must be dropped for this to return.
    pub async fn shutdown(self, worker: SchedulingWorker) -> usize {
        drop(self.sender);
        worker.join().await
    }
}

impl ScheduleTicket {
    pub fn candidate_id(&self) -> &CandidateId {
        &self.candidate_id
    }

    pub async fn outcome(self) -> Result<JobReport, QueueError> {
        self.receiver.await.map_err(|_| QueueError::Dropped)?
    }
}

impl SchedulingWorker {
    /// Waits for the worker to drain. Every [`SchedulingQueue`] clone must be dropped first.
    pub async fn join(self) -> usize {
        match self.handle.await {
            Ok(processed) => processed,
            Err(err) => {
                error!(error = %err, "scheduling worker terminated abnormally");
                0
            }
        }
    }
}

async fn run<D, B>(
    service: Arc<SchedulingService<D, B>>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
) -> usize
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    let mut processed = 0;
    while let Some(job) = receiver.recv().await {
        let service = Arc::clone(&service);
        let candidate_id = job.candidate_id.clone();
        let result = tokio::task::spawn_blocking(move || process(&service, candidate_id))
            .await
            .unwrap_or_else(|err| Err(QueueError::Panicked(err.to_string())));

        if let Err(err) = &result {
            error!(candidate_id = %job.candidate_id, error = %err, "scheduling job failed");
        }
        processed += 1;
        // Receiver may have been dropped; the job still ran.
        let _ = job.reply.send(result);
    }
    info!(processed, "scheduling queue drained");
    processed
}

fn process<D, B>(
    service: &SchedulingService<D, B>,
    candidate_id: CandidateId,
) -> Result<JobReport, QueueError>
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    let outcome = service.update_and_schedule(&candidate_id)?;
    let persisted = match service.flush_pending() {
        Ok(_) => true,
        Err(err) => {
            error!(candidate_id = %candidate_id, error = %err, "booking kept pending");
            false
        }
    };
    Ok(JobReport {
        candidate_id,
        outcome,
        persisted,
    })
}
