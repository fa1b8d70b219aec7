use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub(crate) const TIME_FORMAT: &str = "%H:%M";

/// Identifier wrapper for registered candidates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for interviewers on the panel roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterviewerId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InterviewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for InterviewerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Snapshot of a registered candidate as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    /// Declared field of interest; may be empty.
    pub field: String,
    pub email: String,
    pub skills: BTreeSet<String>,
}

/// Snapshot of an interviewer, read-mostly within a scheduling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interviewer {
    pub id: InterviewerId,
    /// Free-text field of expertise.
    pub field: String,
    pub email: String,
    pub skills: BTreeSet<String>,
}

/// Cache key for a candidate/interviewer pair.
pub type PairKey = (CandidateId, InterviewerId);

/// Affinity signals for one candidate/interviewer pair, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub cosine: f64,
    pub jaccard: f64,
    pub matching: f64,
}

impl ScorePair {
    pub fn is_zero(&self) -> bool {
        self.cosine == 0.0 && self.jaccard == 0.0 && self.matching == 0.0
    }
}

/// A bookable interview unit owned by exactly one interviewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub interviewer_id: InterviewerId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    pub fn key(&self) -> TakenSlot {
        TakenSlot {
            interviewer_id: self.interviewer_id.clone(),
            date: self.date,
            start: self.start,
        }
    }
}

/// Identity of a consumed slot as recorded by persisted bookings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TakenSlot {
    pub interviewer_id: InterviewerId,
    pub date: NaiveDate,
    pub start: NaiveTime,
}

/// A finalized candidate/interviewer/slot assignment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub interviewer_id: InterviewerId,
    pub candidate_id: CandidateId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub interviewer_email: String,
    pub candidate_email: String,
}

impl Booking {
    pub fn taken_slot(&self) -> TakenSlot {
        TakenSlot {
            interviewer_id: self.interviewer_id.clone(),
            date: self.date,
            start: self.start,
        }
    }

    pub fn time_range(&self) -> String {
        format!(
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }

    pub fn to_record(&self) -> ScheduleRecord {
        ScheduleRecord {
            interviewer_id: self.interviewer_id.0.clone(),
            candidate_id: self.candidate_id.0.clone(),
            date: self.date,
            time: self.time_range(),
            interviewer_email: self.interviewer_email.clone(),
            candidate_email: self.candidate_email.clone(),
        }
    }
}

/// Flat export shape consumed downstream (CSV ledger, JSON views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub interviewer_id: String,
    pub candidate_id: String,
    pub date: NaiveDate,
    /// `HH:MM-HH:MM`
    pub time: String,
    pub interviewer_email: String,
    pub candidate_email: String,
}

impl ScheduleRecord {
    pub fn into_booking(self) -> Option<Booking> {
        let (start, end) = parse_time_range(&self.time)?;
        Some(Booking {
            interviewer_id: InterviewerId(self.interviewer_id),
            candidate_id: CandidateId(self.candidate_id),
            date: self.date,
            start,
            end,
            interviewer_email: self.interviewer_email,
            candidate_email: self.candidate_email,
        })
    }
}

/// Parses `HH:MM-HH:MM`. A bare `HH:MM` is accepted as a start time with an unknown end.
pub(crate) fn parse_time_range(raw: &str) -> Option<(NaiveTime, NaiveTime)> {
    let mut parts = raw.trim().splitn(2, '-');
    let start = NaiveTime::parse_from_str(parts.next()?.trim(), TIME_FORMAT).ok()?;
    let end = match parts.next() {
        Some(value) => NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()?,
        None => start,
    };
    Some((start, end))
}

/// Why a candidate stayed unscheduled after a pass. Soft failures; the candidate is
/// re-evaluated on the next batch or incremental call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SchedulingFailure {
    #[error("no interviewer shares the candidate's field with nonzero scores")]
    NoEligibleInterviewer,
    #[error("interviewer {interviewer_id} has no remaining slots")]
    NoAvailableSlot { interviewer_id: InterviewerId },
}

/// Terminal result of running one candidate through the assignment transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Booked { booking: Booking },
    AlreadyScheduled,
    Unscheduled { failure: SchedulingFailure },
}

impl ScheduleOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            ScheduleOutcome::Booked { .. } => "booked",
            ScheduleOutcome::AlreadyScheduled => "already_scheduled",
            ScheduleOutcome::Unscheduled { .. } => "unscheduled",
        }
    }

    pub fn booking(&self) -> Option<&Booking> {
        match self {
            ScheduleOutcome::Booked { booking } => Some(booking),
            _ => None,
        }
    }
}

/// Lower-cases and trims a free-text field so exact field comparison ignores case.
pub fn normalize_field(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Case-normalizes a skill list, dropping blanks.
pub fn normalize_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .map(|skill| skill.as_ref().trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .collect()
}
