use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::AnalysisType;
use crate::domain::{AnalysisId, PropertyId};

/// Work order handed to the external ML pipeline when an analysis starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub property_id: PropertyId,
    pub analysis_id: AnalysisId,
    pub analysis_type: AnalysisType,
    pub imagery: Vec<String>,
    /// The pipeline abandons the run after this instant.
    pub deadline: DateTime<Utc>,
}

/// Outbound hook to the analysis pipeline (queue, RPC client, ...).
pub trait AnalysisDispatcher: Send + Sync {
    fn dispatch(&self, job: AnalysisJob) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("pipeline unavailable: {0}")]
    Unavailable(String),
    #[error("pipeline rejected job: {0}")]
    Rejected(String),
}

/// Jobs held before the queue starts rejecting dispatches.
pub const DEFAULT_JOB_QUEUE_CAPACITY: usize = 1024;

/// In-process job queue. Used when the pipeline polls for work rather than
/// receiving pushes; workers drain it through [`QueuedDispatcher::claim`].
#[derive(Debug, Clone)]
pub struct QueuedDispatcher {
    jobs: Arc<Mutex<VecDeque<AnalysisJob>>>,
    capacity: usize,
}

impl Default for QueuedDispatcher {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOB_QUEUE_CAPACITY)
    }
}

impl QueuedDispatcher {
    /// A zero capacity is raised to one so the queue can hold work at all.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes up to `limit` jobs, oldest first.
    pub fn claim(&self, limit: usize) -> Result<Vec<AnalysisJob>, DispatchError> {
        let mut guard = self.lock()?;
        let take = limit.min(guard.len());
        Ok(guard.drain(..take).collect())
    }

    pub fn drain(&self) -> Vec<AnalysisJob> {
        match self.jobs.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<AnalysisJob>>, DispatchError> {
        self.jobs
            .lock()
            .map_err(|_| DispatchError::Unavailable("job queue lock poisoned".to_string()))
    }
}

impl AnalysisDispatcher for QueuedDispatcher {
    fn dispatch(&self, job: AnalysisJob) -> Result<(), DispatchError> {
        let mut guard = self.lock()?;
        if guard.len() >= self.capacity {
            return Err(DispatchError::Rejected(format!(
                "job queue is full ({} pending)",
                guard.len()
            )));
        }
        guard.push_back(job);
        Ok(())
    }
}
