use std::sync::Arc;

use interview_match::scheduling::{
    read_schedule_csv, write_schedule_csv, BookingStore, CalendarConfig, CandidateId,
    CsvBookingLedger, InterviewerId, Roster, ScheduleOutcome, SchedulingQueue,
    SchedulingService,
};
use tempfile::tempdir;

const CANDIDATES: &str = "\
id,field,email,skills
A,robotics,a@mail.example,ros
B,signal processing,b@mail.example,dsp;filters
C,robotics,c@mail.example,control
D,quantum computing,d@mail.example,qiskit
";

const INTERVIEWERS: &str = "\
id,field,email,skills
I1,robotics,i1@panel.example,ros;control
I2,signal processing,i2@panel.example,dsp
";

fn roster() -> Arc<Roster> {
    Arc::new(
        Roster::from_csv_readers(CANDIDATES.as_bytes(), INTERVIEWERS.as_bytes())
            .expect("fixture roster parses"),
    )
}

#[test]
fn batch_run_persists_to_csv_ledger_and_survives_restart() {
    let dir = tempdir().expect("scratch dir");
    let path = dir.path().join("bookings.csv");
    let ledger = Arc::new(CsvBookingLedger::new(&path));
    let service = SchedulingService::new(roster(), ledger.clone(), &CalendarConfig::default())
        .expect("empty ledger is readable");

    let report = service.schedule_batch();
    assert_eq!(report.booked.len(), 3);
    assert_eq!(report.unscheduled.len(), 1);
    assert_eq!(service.flush_pending().expect("ledger writable"), 3);

    let persisted = ledger.bookings().expect("ledger readable");
    let times: Vec<String> = persisted
        .iter()
        .map(|booking| booking.to_record().time)
        .collect();
    assert_eq!(times, vec!["10:00-10:30", "10:00-10:30", "10:30-11:00"]);

    let restarted = SchedulingService::new(
        roster(),
        Arc::new(CsvBookingLedger::new(&path)),
        &CalendarConfig::default(),
    )
    .expect("ledger readable");
    let second = restarted.schedule_batch();
    assert!(second.booked.is_empty());
    assert_eq!(second.skipped, 3);
    assert_eq!(restarted.remaining_slots(&InterviewerId::from("I1")), 12 * 5 - 2);
}

#[test]
fn exported_schedule_reads_back() {
    let dir = tempdir().expect("scratch dir");
    let service = SchedulingService::new(
        roster(),
        Arc::new(CsvBookingLedger::new(dir.path().join("bookings.csv"))),
        &CalendarConfig::default(),
    )
    .expect("empty ledger is readable");
    let report = service.schedule_batch();

    let mut buffer = Vec::new();
    write_schedule_csv(&mut buffer, &report.booked).expect("export writes");
    let records = read_schedule_csv(buffer.as_slice()).expect("export parses");

    assert_eq!(records.len(), report.booked.len());
    assert_eq!(records[0].candidate_id, "A");
    assert_eq!(records[0].interviewer_email, "i1@panel.example");
}

#[tokio::test]
async fn registration_flow_through_queue() {
    let dir = tempdir().expect("scratch dir");
    let path = dir.path().join("bookings.csv");
    let roster = roster();
    let ledger = Arc::new(CsvBookingLedger::new(&path));
    let service = Arc::new(
        SchedulingService::new(roster.clone(), ledger.clone(), &CalendarConfig::default())
            .expect("empty ledger is readable"),
    );
    let (queue, worker) = SchedulingQueue::spawn(service.clone());

    let ticket = queue.enqueue(CandidateId::from("C")).expect("queue open");
    let report = ticket.outcome().await.expect("job ran");
    match &report.outcome {
        ScheduleOutcome::Booked { booking } => {
            assert_eq!(booking.interviewer_id, InterviewerId::from("I1"));
            assert_eq!(booking.to_record().time, "10:00-10:30");
        }
        other => panic!("expected booking, got {other:?}"),
    }
    assert!(report.persisted);

    let unmatched = queue
        .enqueue(CandidateId::from("D"))
        .expect("queue open")
        .outcome()
        .await
        .expect("job ran");
    assert_eq!(unmatched.outcome.label(), "unscheduled");

    assert_eq!(queue.shutdown(worker).await, 2);
    assert_eq!(ledger.bookings().expect("ledger readable").len(), 1);

    let views = service
        .bookings_for_candidate(&CandidateId::from("C"))
        .expect("ledger readable");
    assert_eq!(views.len(), 1);
    assert!(views[0].persisted);
}
