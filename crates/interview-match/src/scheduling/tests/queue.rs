use std::sync::Arc;

use super::common::*;
use crate::scheduling::domain::{CandidateId, ScheduleOutcome};
use crate::scheduling::{
    CalendarConfig, QueueError, Roster, SchedulingError, SchedulingQueue, SchedulingService,
};

#[tokio::test]
async fn queued_candidates_are_booked_in_submission_order() {
    let (service, _, store) = default_service();
    let (queue, worker) = SchedulingQueue::spawn(Arc::new(service));

    let first = queue.enqueue(CandidateId::from("E")).expect("queue open");
    let second = queue.enqueue(CandidateId::from("A")).expect("queue open");

    let first = first.outcome().await.expect("job ran");
    let second = second.outcome().await.expect("job ran");

    let first_booking = first.outcome.booking().expect("E booked");
    let second_booking = second.outcome.booking().expect("A booked");
    assert_eq!(first_booking.start.format("%H:%M").to_string(), "10:00");
    assert_eq!(second_booking.start.format("%H:%M").to_string(), "10:30");
    assert!(first.persisted && second.persisted);
    assert_eq!(store.rows().len(), 2);

    assert_eq!(queue.shutdown(worker).await, 2);
}

#[tokio::test]
async fn unknown_candidate_surfaces_scheduling_error() {
    let (service, _, _) = default_service();
    let (queue, _worker) = SchedulingQueue::spawn(Arc::new(service));

    let ticket = queue.enqueue(CandidateId::from("ghost")).expect("queue open");
    assert_eq!(ticket.candidate_id(), &CandidateId::from("ghost"));

    match ticket.outcome().await {
        Err(QueueError::Scheduling(SchedulingError::CandidateNotFound(id))) => {
            assert_eq!(id.0, "ghost")
        }
        other => panic!("expected candidate not found, got {other:?}"),
    }
}

#[tokio::test]
async fn persistence_failure_is_reported_without_losing_the_booking() {
    let roster = Arc::new(Roster::new(applicants(), panel()));
    let store = Arc::new(FlakyBookings::default());
    let service = Arc::new(
        SchedulingService::new(roster, store.clone(), &CalendarConfig::default())
            .expect("readable store"),
    );
    let (queue, _worker) = SchedulingQueue::spawn(service.clone());

    let report = queue
        .enqueue(CandidateId::from("A"))
        .expect("queue open")
        .outcome()
        .await
        .expect("job ran");

    assert_eq!(report.outcome.label(), "booked");
    assert!(!report.persisted);
    assert_eq!(service.pending().len(), 1);

    store.recover();
    let retry = queue
        .enqueue(CandidateId::from("A"))
        .expect("queue open")
        .outcome()
        .await
        .expect("job ran");
    assert_eq!(retry.outcome, ScheduleOutcome::AlreadyScheduled);
    assert!(retry.persisted);
    assert_eq!(store.inner.rows().len(), 1);
}
