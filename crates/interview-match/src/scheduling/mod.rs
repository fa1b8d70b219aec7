//! Candidate/interviewer affinity scoring and interview slot scheduling.
//!
//! Scores are computed per candidate against a TF-IDF space fitted on interviewer
//! expertise, combined with a skill-overlap signal, and cached per pair. The
//! [`SchedulingService`] owns the cache, the slot calendar, and the pending booking
//! buffer behind one lock; [`SchedulingQueue`] serializes incremental requests.

pub mod blender;
pub mod cache;
pub mod calendar;
pub mod domain;
pub mod engine;
pub mod ledger;
pub mod overlap;
pub mod queue;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use blender::{BlendError, BlendModel, BlendWeights, ScoreBlender};
pub use cache::ScoreCache;
pub use calendar::{CalendarConfig, CalendarConfigError, SlotCalendar};
pub use domain::{
    normalize_field, normalize_skills, Booking, Candidate, CandidateId, Interviewer,
    InterviewerId, PairKey, ScheduleOutcome, ScheduleRecord, SchedulingFailure, ScorePair, Slot,
    TakenSlot,
};
pub use engine::{AssignmentEngine, RankedInterviewer};
pub use ledger::{read_schedule_csv, write_schedule_csv, CsvBookingLedger};
pub use overlap::{OverlapScore, OverlapWeights, SkillOverlapScorer};
pub use queue::{JobReport, QueueError, ScheduleTicket, SchedulingQueue, SchedulingWorker};
pub use repository::{BookingStore, BookingStoreError, DataSource, DataSourceError};
pub use roster::{Roster, RosterImportError};
pub use router::{scheduling_router, PredictRequest};
pub use service::{
    BatchReport, ScheduleRecordView, SchedulingError, SchedulingService, UnscheduledCandidate,
};
pub use similarity::{jaccard, tokenize, FieldSimilarity};
