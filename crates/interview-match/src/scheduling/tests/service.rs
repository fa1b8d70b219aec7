use std::collections::HashSet;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use super::common::*;
use crate::scheduling::domain::{
    Booking, CandidateId, InterviewerId, ScheduleOutcome, SchedulingFailure, TakenSlot,
};
use crate::scheduling::repository::{BookingStore, BookingStoreError};
use crate::scheduling::{BlendError, CalendarConfig, Roster, SchedulingError, SchedulingService};

#[test]
fn batch_books_each_eligible_candidate_once() {
    let (service, _, store) = default_service();

    let report = service.schedule_batch();

    let booked: Vec<(&str, &str)> = report
        .booked
        .iter()
        .map(|booking| (booking.candidate_id.0.as_str(), booking.interviewer_id.0.as_str()))
        .collect();
    assert_eq!(
        booked,
        vec![("A", "I1"), ("B", "I2"), ("C", "I3"), ("E", "I1")]
    );
    assert_eq!(starts(&report.booked), vec!["10:00", "10:00", "10:00", "10:30"]);
    assert_eq!(report.unscheduled.len(), 1);
    assert_eq!(report.unscheduled[0].candidate_id, CandidateId::from("D"));
    assert_eq!(
        report.unscheduled[0].failure,
        SchedulingFailure::NoEligibleInterviewer
    );

    assert_eq!(service.pending().len(), 4);
    assert_eq!(service.flush_pending().expect("memory store accepts"), 4);
    assert!(service.pending().is_empty());
    assert_eq!(store.rows().len(), 4);
}

#[test]
fn second_batch_skips_booked_candidates() {
    let (service, _, _) = default_service();
    service.schedule_batch();

    let report = service.schedule_batch();
    assert!(report.booked.is_empty());
    assert_eq!(report.skipped, 4);
    assert_eq!(report.unscheduled.len(), 1);
}

#[test]
fn batch_is_deterministic() {
    let (first, _, _) = default_service();
    let (second, _, _) = default_service();

    assert_eq!(first.schedule_batch(), second.schedule_batch());
}

#[test]
fn capacity_limits_never_double_book() {
    let candidates: Vec<_> = (0..15)
        .map(|n| candidate(&format!("C{n:02}"), "robotics", &["ros"]))
        .collect();
    let (service, _, _) = build_service(candidates, panel(), &one_day());

    let report = service.schedule_batch();

    assert_eq!(report.booked.len(), 12);
    assert_eq!(report.unscheduled.len(), 3);
    assert!(report.unscheduled.iter().all(|entry| entry.failure
        == SchedulingFailure::NoAvailableSlot {
            interviewer_id: InterviewerId::from("I1"),
        }));

    let distinct: HashSet<_> = report.booked.iter().map(|b| b.taken_slot()).collect();
    assert_eq!(distinct.len(), report.booked.len());
    assert_eq!(service.remaining_slots(&InterviewerId::from("I1")), 0);
}

#[test]
fn concurrent_incremental_calls_never_double_book() {
    let candidates: Vec<_> = (0..40)
        .map(|n| candidate(&format!("C{n:02}"), "robotics", &["ros"]))
        .collect();
    let ids: Vec<CandidateId> = candidates.iter().map(|c| c.id.clone()).collect();
    let (service, _, _) = build_service(candidates, panel(), &one_day());
    let service = Arc::new(service);

    let workers: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = service.clone();
            std::thread::spawn(move || {
                service
                    .update_and_schedule(&id)
                    .expect("candidate is registered")
            })
        })
        .collect();
    let outcomes: Vec<ScheduleOutcome> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker thread completes"))
        .collect();

    let booked: Vec<_> = outcomes
        .iter()
        .filter_map(ScheduleOutcome::booking)
        .collect();
    assert_eq!(booked.len(), 12);
    assert!(booked
        .iter()
        .all(|booking| booking.interviewer_id == InterviewerId::from("I1")));

    let distinct: HashSet<_> = booked.iter().map(|b| b.taken_slot()).collect();
    assert_eq!(distinct.len(), 12);
    assert_eq!(service.pending().len(), 12);
    assert_eq!(service.remaining_slots(&InterviewerId::from("I1")), 0);
}

#[test]
fn incremental_scheduling_matches_batch_pass() {
    let (batch, _, _) = default_service();
    let expected = batch.schedule_batch().booked;

    let (incremental, _, _) = default_service();
    let mut booked = Vec::new();
    for applicant in applicants() {
        if let ScheduleOutcome::Booked { booking } = incremental
            .update_and_schedule(&applicant.id)
            .expect("candidate is registered")
        {
            booked.push(booking);
        }
    }

    assert_eq!(booked, expected);
}

#[test]
fn rescheduling_a_booked_candidate_is_a_no_op() {
    let (service, _, _) = default_service();
    let id = CandidateId::from("A");

    let first = service.update_and_schedule(&id).expect("registered");
    assert_eq!(first.label(), "booked");
    let second = service.schedule_single_candidate(&id).expect("registered");
    assert_eq!(second, ScheduleOutcome::AlreadyScheduled);
    assert_eq!(service.pending().len(), 1);
}

#[test]
fn unknown_candidate_is_reported() {
    let (service, _, _) = default_service();
    match service.update_and_schedule(&CandidateId::from("ghost")) {
        Err(SchedulingError::CandidateNotFound(id)) => assert_eq!(id.0, "ghost"),
        other => panic!("expected candidate not found, got {other:?}"),
    }
}

#[test]
fn registered_candidate_is_scheduled_incrementally() {
    let (service, roster, _) = default_service();
    service.schedule_batch();

    roster
        .register(candidate("F", "robotics", &["ros", "control"]))
        .expect("new id");
    let outcome = service
        .update_and_schedule(&CandidateId::from("F"))
        .expect("registered");

    let booking = outcome.booking().expect("booked");
    assert_eq!(booking.interviewer_id, InterviewerId::from("I1"));
    assert_eq!(booking.start.format("%H:%M").to_string(), "11:00");
}

#[test]
fn persisted_bookings_are_excluded_after_restart() {
    let (first, _, store) = default_service();
    first
        .update_and_schedule(&CandidateId::from("A"))
        .expect("registered");
    first.flush_pending().expect("flushed");

    let roster = Arc::new(Roster::new(applicants(), panel()));
    let restarted = SchedulingService::new(
        roster,
        Arc::new(MemoryBookings::seeded(store.rows())),
        &CalendarConfig::default(),
    )
    .expect("readable store");

    assert!(restarted.is_scheduled(&CandidateId::from("A")));
    let outcome = restarted
        .update_and_schedule(&CandidateId::from("E"))
        .expect("registered");
    let booking = outcome.booking().expect("booked");
    assert_eq!(booking.start.format("%H:%M").to_string(), "10:30");
    assert_eq!(
        restarted
            .update_and_schedule(&CandidateId::from("A"))
            .expect("registered"),
        ScheduleOutcome::AlreadyScheduled
    );
}

#[test]
fn failed_flush_keeps_bookings_for_retry() {
    let roster = Arc::new(Roster::new(applicants(), panel()));
    let store = Arc::new(FlakyBookings::default());
    let service = SchedulingService::new(roster, store.clone(), &CalendarConfig::default())
        .expect("readable store");

    service.schedule_batch();
    match service.flush_pending() {
        Err(SchedulingError::Persistence(_)) => {}
        other => panic!("expected persistence error, got {other:?}"),
    }
    assert_eq!(service.pending().len(), 4);
    assert!(store.inner.rows().is_empty());

    store.recover();
    assert_eq!(service.flush_pending().expect("store recovered"), 4);
    assert!(service.pending().is_empty());
    assert_eq!(store.inner.rows().len(), 4);
}

#[test]
fn unreadable_store_fails_construction() {
    let roster = Arc::new(Roster::new(applicants(), panel()));
    let result = SchedulingService::new(
        roster,
        Arc::new(UnreadableBookings),
        &CalendarConfig::default(),
    );
    assert!(matches!(result, Err(SchedulingError::Persistence(_))));
}

#[test]
fn score_update_replaces_previous_field() {
    let (service, _, _) = default_service();
    let id = CandidateId::from("A");
    service.warm_scores();
    assert!(service.scores_for(&id, &InterviewerId::from("I1")).cosine > 0.0);

    let stored = service.update_scores_for_candidate(&id, "machine learning");
    assert!(stored > 0);
    assert_eq!(service.scores_for(&id, &InterviewerId::from("I1")).cosine, 0.0);
    assert!(service.scores_for(&id, &InterviewerId::from("I3")).cosine > 0.0);
}

#[test]
fn blend_model_trains_on_cached_scores() {
    let (service, _, _) = default_service();
    service.warm_scores();

    let model = service.train_blender().expect("scores are cached");
    assert!(model.samples >= 4);
    let score = service.predict(1.0, 1.0).expect("trained");
    assert!(score.is_finite());
}

#[test]
fn blend_model_requires_scores() {
    let (service, _, _) = build_service(applicants(), Vec::new(), &CalendarConfig::default());
    service.warm_scores();
    assert_eq!(
        service.train_blender(),
        Err(BlendError::EmptyInput("cosine"))
    );
}

#[test]
fn views_mark_pending_and_persisted_rows() {
    let (service, _, _) = default_service();
    service.update_and_schedule(&CandidateId::from("A")).expect("registered");
    service.flush_pending().expect("flushed");
    service.update_and_schedule(&CandidateId::from("E")).expect("registered");

    let views = service
        .bookings_for_interviewer(&InterviewerId::from("I1"))
        .expect("readable store");
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].record.candidate_id, "A");
    assert_eq!(views[0].record.time, "10:00-10:30");
    assert!(views[0].persisted);
    assert!(!views[1].persisted);
    assert!(views[0].cosine_score > 0.0);
    assert!((views[0].matching_score - 1.0).abs() < 1e-9);

    let alice = service
        .bookings_for_candidate(&CandidateId::from("A"))
        .expect("readable store");
    assert_eq!(alice.len(), 1);
}

/// Store whose next read pauses after taking its snapshot until released.
#[derive(Default)]
struct PausingReads {
    inner: MemoryBookings,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl PausingReads {
    fn pause_next_read(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.entered.lock().expect("gate mutex poisoned") = Some(entered_tx);
        *self.release.lock().expect("gate mutex poisoned") = Some(release_rx);
        (entered_rx, release_tx)
    }
}

impl BookingStore for PausingReads {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        self.inner.already_taken()
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        let snapshot = self.inner.bookings()?;
        let entered = self.entered.lock().expect("gate mutex poisoned").take();
        if let Some(entered) = entered {
            let _ = entered.send(());
            let release = self.release.lock().expect("gate mutex poisoned").take();
            if let Some(release) = release {
                let _ = release.recv_timeout(Duration::from_secs(2));
            }
        }
        Ok(snapshot)
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        self.inner.append(bookings)
    }
}

#[test]
fn views_stay_complete_while_a_flush_runs() {
    let roster = Arc::new(Roster::new(applicants(), panel()));
    let store = Arc::new(PausingReads::default());
    let service = Arc::new(
        SchedulingService::new(roster, store.clone(), &CalendarConfig::default())
            .expect("readable store"),
    );
    service
        .update_and_schedule(&CandidateId::from("A"))
        .expect("registered");

    let (entered, release) = store.pause_next_read();
    let reader = {
        let service = service.clone();
        std::thread::spawn(move || service.bookings_for_candidate(&CandidateId::from("A")))
    };
    entered.recv().expect("view read started");

    let flusher = {
        let service = service.clone();
        std::thread::spawn(move || service.flush_pending())
    };
    std::thread::sleep(Duration::from_millis(100));
    release.send(()).expect("view read still paused");

    let views = reader
        .join()
        .expect("reader thread completes")
        .expect("readable store");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].record.candidate_id, "A");

    let flushed = flusher
        .join()
        .expect("flusher thread completes")
        .expect("store writable");
    assert_eq!(flushed, 1);
    assert_eq!(store.inner.rows().len(), 1);
}
