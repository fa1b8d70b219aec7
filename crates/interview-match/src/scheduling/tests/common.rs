use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scheduling::domain::{
    normalize_skills, Booking, Candidate, CandidateId, Interviewer, InterviewerId, TakenSlot,
};
use crate::scheduling::repository::{BookingStore, BookingStoreError};
use crate::scheduling::{CalendarConfig, Roster, SchedulingService};

pub(super) fn interviewer(id: &str, field: &str, skills: &[&str]) -> Interviewer {
    Interviewer {
        id: InterviewerId::from(id),
        field: field.to_string(),
        email: format!("{}@panel.example", id.to_lowercase()),
        skills: normalize_skills(skills.iter()),
    }
}

pub(super) fn candidate(id: &str, field: &str, skills: &[&str]) -> Candidate {
    Candidate {
        id: CandidateId::from(id),
        field: field.to_string(),
        email: format!("{}@mail.example", id.to_lowercase()),
        skills: normalize_skills(skills.iter()),
    }
}

pub(super) fn panel() -> Vec<Interviewer> {
    vec![
        interviewer("I1", "robotics", &["ros", "control"]),
        interviewer("I2", "signal processing", &["dsp", "filters"]),
        interviewer("I3", "machine learning", &["python", "pytorch"]),
    ]
}

pub(super) fn applicants() -> Vec<Candidate> {
    vec![
        candidate("A", "robotics", &["ros"]),
        candidate("B", "Signal Processing", &["dsp"]),
        candidate("C", "machine learning", &[]),
        candidate("D", "", &["python"]),
        candidate("E", "robotics", &["control"]),
    ]
}

/// One working day so capacity tests stay small.
pub(super) fn one_day() -> CalendarConfig {
    CalendarConfig {
        window_days: 1,
        ..CalendarConfig::default()
    }
}

pub(super) fn build_service(
    candidates: Vec<Candidate>,
    interviewers: Vec<Interviewer>,
    calendar: &CalendarConfig,
) -> (
    SchedulingService<Roster, MemoryBookings>,
    Arc<Roster>,
    Arc<MemoryBookings>,
) {
    let roster = Arc::new(Roster::new(candidates, interviewers));
    let store = Arc::new(MemoryBookings::default());
    let service = SchedulingService::new(roster.clone(), store.clone(), calendar)
        .expect("memory store is readable");
    (service, roster, store)
}

pub(super) fn default_service() -> (
    SchedulingService<Roster, MemoryBookings>,
    Arc<Roster>,
    Arc<MemoryBookings>,
) {
    build_service(applicants(), panel(), &CalendarConfig::default())
}

#[derive(Default, Clone)]
pub(super) struct MemoryBookings {
    pub(super) rows: Arc<Mutex<Vec<Booking>>>,
}

impl MemoryBookings {
    pub(super) fn seeded(rows: Vec<Booking>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub(super) fn rows(&self) -> Vec<Booking> {
        self.rows.lock().expect("booking mutex poisoned").clone()
    }
}

impl BookingStore for MemoryBookings {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        Ok(self.rows().iter().map(Booking::taken_slot).collect())
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        Ok(self.rows())
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        let mut guard = self.rows.lock().expect("booking mutex poisoned");
        let taken: HashSet<TakenSlot> = guard.iter().map(Booking::taken_slot).collect();
        guard.extend(
            bookings
                .iter()
                .filter(|booking| !taken.contains(&booking.taken_slot()))
                .cloned(),
        );
        Ok(())
    }
}

/// Store whose writes fail until `recover` is called.
#[derive(Default)]
pub(super) struct FlakyBookings {
    pub(super) inner: MemoryBookings,
    healthy: AtomicBool,
}

impl FlakyBookings {
    pub(super) fn recover(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

impl BookingStore for FlakyBookings {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        self.inner.already_taken()
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        self.inner.bookings()
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(BookingStoreError::Unavailable("ledger offline".to_string()));
        }
        self.inner.append(bookings)
    }
}

/// Store that cannot even be read.
pub(super) struct UnreadableBookings;

impl BookingStore for UnreadableBookings {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        Err(BookingStoreError::Unavailable("ledger offline".to_string()))
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        Err(BookingStoreError::Unavailable("ledger offline".to_string()))
    }

    fn append(&self, _bookings: &[Booking]) -> Result<(), BookingStoreError> {
        Err(BookingStoreError::Unavailable("ledger offline".to_string()))
    }
}

pub(super) fn starts(bookings: &[Booking]) -> Vec<String> {
    bookings
        .iter()
        .map(|booking| booking.start.format("%H:%M").to_string())
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
