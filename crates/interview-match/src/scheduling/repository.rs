use std::collections::{BTreeSet, HashSet};

use super::domain::{Booking, Candidate, CandidateId, Interviewer, TakenSlot};

/// Read access to registered candidates and the interviewer roster.
///
/// Implementations may fail; the scheduling service logs failures and carries on with
/// empty data rather than aborting a pass.
pub trait DataSource: Send + Sync {
    /// Candidates in the order scheduling passes should visit them.
    fn list_candidates(&self) -> Result<Vec<Candidate>, DataSourceError>;
    fn list_interviewers(&self) -> Result<Vec<Interviewer>, DataSourceError>;
    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, DataSourceError>;
    /// Case-normalized skills for a candidate or interviewer id; empty when unknown.
    fn skills_for(&self, id: &str) -> Result<BTreeSet<String>, DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("record {0} already exists")]
    Conflict(String),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// Persisted bookings. `append` must tolerate rows that were already written.
pub trait BookingStore: Send + Sync {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError>;
    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError>;
    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BookingStoreError {
    #[error("booking store unavailable: {0}")]
    Unavailable(String),
    #[error("booking ledger io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("booking ledger is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
}
