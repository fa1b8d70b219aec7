use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, info, warn};

use super::blender::{BlendError, BlendModel, ScoreBlender};
use super::cache::ScoreCache;
use super::calendar::{CalendarConfig, SlotCalendar};
use super::domain::{
    Booking, Candidate, CandidateId, Interviewer, InterviewerId, ScheduleOutcome, ScheduleRecord,
    SchedulingFailure, ScorePair,
};
use super::engine::AssignmentEngine;
use super::repository::{BookingStore, BookingStoreError, DataSource};

/// Owner of the process-wide scheduling state.
///
/// The score cache, slot calendar, and pending booking buffer sit behind one lock, and
/// only coarse operations are exposed, so a score refresh, slot pop, and buffer append
/// for one candidate always land together.
pub struct SchedulingService<D, B> {
    data: Arc<D>,
    store: Arc<B>,
    engine: AssignmentEngine,
    blender: ScoreBlender,
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    interviewers: Vec<Interviewer>,
    cache: ScoreCache,
    calendar: SlotCalendar,
    pending: Vec<Booking>,
    scheduled: HashSet<CandidateId>,
}

/// Summary of one batch pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub booked: Vec<Booking>,
    pub unscheduled: Vec<UnscheduledCandidate>,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnscheduledCandidate {
    pub candidate_id: CandidateId,
    pub failure: SchedulingFailure,
}

/// A schedule row decorated with the scores that selected it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRecordView {
    #[serde(flatten)]
    pub record: ScheduleRecord,
    pub cosine_score: f64,
    pub matching_score: f64,
    pub persisted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("failed to persist bookings: {0}")]
    Persistence(#[from] BookingStoreError),
}

impl<D, B> SchedulingService<D, B>
where
    D: DataSource + 'static,
    B: BookingStore + 'static,
{
    /// Builds the calendar from the roster and the already-persisted bookings.
    ///
    /// An unreadable roster degrades to an empty one; an unreadable booking store is an
    /// error because scheduling on top of it could double-book recorded slots.
    pub fn new(
        data: Arc<D>,
        store: Arc<B>,
        calendar: &CalendarConfig,
    ) -> Result<Self, SchedulingError> {
        let interviewers = data.list_interviewers().unwrap_or_else(|err| {
            warn!(error = %err, "interviewer roster unavailable; continuing with none");
            Vec::new()
        });
        let taken = store.already_taken()?;
        let scheduled = store
            .bookings()?
            .into_iter()
            .map(|booking| booking.candidate_id)
            .collect();

        let state = SchedulerState {
            cache: ScoreCache::new(interviewers.clone()),
            calendar: SlotCalendar::new(calendar, &interviewers, &taken),
            interviewers,
            pending: Vec::new(),
            scheduled,
        };

        Ok(Self {
            data,
            store,
            engine: AssignmentEngine,
            blender: ScoreBlender::default(),
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn candidates(&self) -> Vec<Candidate> {
        self.data.list_candidates().unwrap_or_else(|err| {
            warn!(error = %err, "candidate list unavailable; nothing to schedule");
            Vec::new()
        })
    }

    fn find_candidate(&self, candidate_id: &CandidateId) -> Result<Candidate, SchedulingError> {
        let found = self.data.candidate(candidate_id).unwrap_or_else(|err| {
            warn!(candidate_id = %candidate_id, error = %err, "candidate lookup failed");
            None
        });
        found.ok_or_else(|| SchedulingError::CandidateNotFound(candidate_id.clone()))
    }

    fn skills(&self, id: &str, fallback: &BTreeSet<String>) -> BTreeSet<String> {
        self.data.skills_for(id).unwrap_or_else(|err| {
            warn!(id, error = %err, "skill lookup failed; using snapshot skills");
            fallback.clone()
        })
    }

    /// Computes score rows for every known candidate that has none yet.
    pub fn warm_scores(&self) -> usize {
        let candidates = self.candidates();
        let mut state = self.lock();
        let stored = state.cache.warm(candidates.iter());
        info!(
            candidates = candidates.len(),
            pairs = state.cache.len(),
            "score cache warmed"
        );
        stored
    }

    /// Recomputes one candidate's score rows against the fixed expertise space.
    pub fn update_scores_for_candidate(&self, candidate_id: &CandidateId, field: &str) -> usize {
        let skills = self.skills(&candidate_id.0, &BTreeSet::new());
        let mut state = self.lock();
        state
            .cache
            .update_scores_for_candidate(candidate_id, field, &skills)
    }

    /// Runs one candidate through matching and booking using the current scores.
    pub fn schedule_single_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<ScheduleOutcome, SchedulingError> {
        let candidate = self.find_candidate(candidate_id)?;
        let mut state = self.lock();
        state.cache.ensure(&candidate);
        Ok(self.schedule_locked(&mut state, &candidate))
    }

    /// Refreshes a candidate's scores and schedules it under a single lock acquisition.
    pub fn update_and_schedule(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<ScheduleOutcome, SchedulingError> {
        let candidate = self.find_candidate(candidate_id)?;
        let skills = self.skills(&candidate.id.0, &candidate.skills);

        let mut state = self.lock();
        let stored =
            state
                .cache
                .update_scores_for_candidate(&candidate.id, &candidate.field, &skills);
        info!(candidate_id = %candidate.id, pairs = stored, "updated scores for candidate");

        Ok(self.schedule_locked(&mut state, &candidate))
    }

    /// One pass over every candidate in data-source order, skipping those already booked.
    pub fn schedule_batch(&self) -> BatchReport {
        let candidates = self.candidates();
        let mut state = self.lock();
        let mut report = BatchReport::default();

        for candidate in &candidates {
            state.cache.ensure(candidate);
            match self.schedule_locked(&mut state, candidate) {
                ScheduleOutcome::Booked { booking } => report.booked.push(booking),
                ScheduleOutcome::AlreadyScheduled => report.skipped += 1,
                ScheduleOutcome::Unscheduled { failure } => {
                    report.unscheduled.push(UnscheduledCandidate {
                        candidate_id: candidate.id.clone(),
                        failure,
                    })
                }
            }
        }

        info!(
            booked = report.booked.len(),
            unscheduled = report.unscheduled.len(),
            skipped = report.skipped,
            "generated schedule"
        );
        report
    }

    fn schedule_locked(
        &self,
        state: &mut SchedulerState,
        candidate: &Candidate,
    ) -> ScheduleOutcome {
        if state.scheduled.contains(&candidate.id) {
            return ScheduleOutcome::AlreadyScheduled;
        }

        let SchedulerState {
            interviewers,
            cache,
            calendar,
            pending,
            scheduled,
        } = state;

        match self.engine.assign(candidate, interviewers, cache, calendar) {
            Ok(booking) => {
                pending.push(booking.clone());
                scheduled.insert(candidate.id.clone());
                ScheduleOutcome::Booked { booking }
            }
            Err(failure) => ScheduleOutcome::Unscheduled { failure },
        }
    }

    /// Appends buffered bookings to the store. The buffer is cleared only on success.
    pub fn flush_pending(&self) -> Result<usize, SchedulingError> {
        let mut state = self.lock();
        if state.pending.is_empty() {
            return Ok(0);
        }

        match self.store.append(&state.pending) {
            Ok(()) => {
                let written = state.pending.len();
                state.pending.clear();
                info!(bookings = written, "schedule stored");
                Ok(written)
            }
            Err(err) => {
                error!(
                    error = %err,
                    pending = state.pending.len(),
                    "failed to store schedule; keeping bookings for retry"
                );
                Err(err.into())
            }
        }
    }

    pub fn pending(&self) -> Vec<Booking> {
        self.lock().pending.clone()
    }

    pub fn is_scheduled(&self, candidate_id: &CandidateId) -> bool {
        self.lock().scheduled.contains(candidate_id)
    }

    pub fn scores_for(
        &self,
        candidate_id: &CandidateId,
        interviewer_id: &InterviewerId,
    ) -> ScorePair {
        self.lock().cache.get(candidate_id, interviewer_id)
    }

    pub fn remaining_slots(&self, interviewer_id: &InterviewerId) -> usize {
        self.lock().calendar.remaining(interviewer_id)
    }

    /// Fits the blend model on the cached signals. Scheduling never depends on it.
    pub fn train_blender(&self) -> Result<BlendModel, BlendError> {
        let state = self.lock();
        let model = self.blender.fit(
            &state.cache.cosine_map(),
            &state.cache.jaccard_map(),
            &state.cache.matching_map(),
        )?;
        info!(samples = model.samples, "blend model trained");
        Ok(model)
    }

    pub fn predict(&self, cosine: f64, matching: f64) -> Result<f64, BlendError> {
        Ok(self.train_blender()?.predict(cosine, matching))
    }

    pub fn bookings_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<ScheduleRecordView>, SchedulingError> {
        self.views(|booking| &booking.candidate_id == candidate_id)
    }

    pub fn bookings_for_interviewer(
        &self,
        interviewer_id: &InterviewerId,
    ) -> Result<Vec<ScheduleRecordView>, SchedulingError> {
        self.views(|booking| &booking.interviewer_id == interviewer_id)
    }

    fn views<F>(&self, keep: F) -> Result<Vec<ScheduleRecordView>, SchedulingError>
    where
        F: Fn(&Booking) -> bool,
    {
        let state = self.lock();
        let persisted = self.store.bookings()?;

        let mut views: Vec<ScheduleRecordView> = persisted
            .iter()
            .map(|booking| (booking, true))
            .chain(state.pending.iter().map(|booking| (booking, false)))
            .filter(|(booking, _)| keep(*booking))
            .map(|(booking, persisted)| {
                let scores = state.cache.get(&booking.candidate_id, &booking.interviewer_id);
                ScheduleRecordView {
                    record: booking.to_record(),
                    cosine_score: scores.cosine,
                    matching_score: scores.matching,
                    persisted,
                }
            })
            .collect();

        views.sort_by(|a, b| {
            (a.record.date, &a.record.time).cmp(&(b.record.date, &b.record.time))
        });
        Ok(views)
    }
}
