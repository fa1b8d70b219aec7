//! Greedy best-fit assignment of one candidate to one interviewer slot.
//!
//! A candidate moves `Unscheduled -> Matched -> Booked`. Matching keeps interviewers
//! whose expertise equals the candidate's field and whose similarity and matching
//! scores are both nonzero, then takes the top combined score with ties broken by
//! ascending interviewer id. Booking pops that interviewer's earliest slot. There is no
//! fallback to the runner-up when the top interviewer is fully booked.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cache::ScoreCache;
use super::calendar::SlotCalendar;
use super::domain::{
    normalize_field, Booking, Candidate, Interviewer, InterviewerId, SchedulingFailure,
};

/// An eligible interviewer with the signals that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedInterviewer {
    pub interviewer_id: InterviewerId,
    pub interviewer_email: String,
    pub similarity: f64,
    pub matching: f64,
    pub combined: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentEngine;

impl AssignmentEngine {
    /// Field-matched interviewers passing the double gate, best first.
    pub fn rank(
        &self,
        candidate: &Candidate,
        interviewers: &[Interviewer],
        cache: &ScoreCache,
    ) -> Vec<RankedInterviewer> {
        let field = normalize_field(&candidate.field);
        let mut ranked: Vec<RankedInterviewer> = interviewers
            .iter()
            .filter(|interviewer| normalize_field(&interviewer.field) == field)
            .filter_map(|interviewer| {
                let scores = cache.get(&candidate.id, &interviewer.id);
                if scores.cosine == 0.0 || scores.matching == 0.0 {
                    return None;
                }
                Some(RankedInterviewer {
                    interviewer_id: interviewer.id.clone(),
                    interviewer_email: interviewer.email.clone(),
                    similarity: scores.cosine,
                    matching: scores.matching,
                    combined: scores.cosine + scores.matching,
                })
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }

    /// `Unscheduled -> Matched`.
    pub fn match_candidate(
        &self,
        candidate: &Candidate,
        interviewers: &[Interviewer],
        cache: &ScoreCache,
    ) -> Result<RankedInterviewer, SchedulingFailure> {
        let best = self
            .rank(candidate, interviewers, cache)
            .into_iter()
            .next()
            .ok_or(SchedulingFailure::NoEligibleInterviewer)?;

        debug!(
            candidate_id = %candidate.id,
            interviewer_id = %best.interviewer_id,
            combined = best.combined,
            "matched candidate"
        );
        Ok(best)
    }

    /// `Matched -> Booked`.
    pub fn book(
        &self,
        candidate: &Candidate,
        matched: RankedInterviewer,
        calendar: &mut SlotCalendar,
    ) -> Result<Booking, SchedulingFailure> {
        let slot = calendar.pop_earliest(&matched.interviewer_id).ok_or_else(|| {
            SchedulingFailure::NoAvailableSlot {
                interviewer_id: matched.interviewer_id.clone(),
            }
        })?;

        Ok(Booking {
            interviewer_id: matched.interviewer_id,
            candidate_id: candidate.id.clone(),
            date: slot.date,
            start: slot.start,
            end: slot.end,
            interviewer_email: matched.interviewer_email,
            candidate_email: candidate.email.clone(),
        })
    }

    /// Runs both transitions, logging the terminal state.
    pub fn assign(
        &self,
        candidate: &Candidate,
        interviewers: &[Interviewer],
        cache: &ScoreCache,
        calendar: &mut SlotCalendar,
    ) -> Result<Booking, SchedulingFailure> {
        let result = self
            .match_candidate(candidate, interviewers, cache)
            .and_then(|matched| self.book(candidate, matched, calendar));

        match &result {
            Ok(booking) => info!(
                candidate_id = %booking.candidate_id,
                interviewer_id = %booking.interviewer_id,
                date = %booking.date,
                time = %booking.time_range(),
                "scheduled interview"
            ),
            Err(failure) => warn!(
                candidate_id = %candidate.id,
                %failure,
                "candidate left unscheduled"
            ),
        }
        result
    }
}

fn compare_ranked(a: &RankedInterviewer, b: &RankedInterviewer) -> Ordering {
    b.combined
        .total_cmp(&a.combined)
        .then_with(|| a.interviewer_id.cmp(&b.interviewer_id))
}
