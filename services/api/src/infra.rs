use chrono::{NaiveDate, NaiveTime};
use interview_match::config::SchedulingConfig;
use interview_match::error::AppError;
use interview_match::scheduling::{
    Booking, BookingStore, BookingStoreError, CsvBookingLedger, Roster, SchedulingService,
    TakenSlot,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

pub(crate) type SchedulingApp = SchedulingService<Roster, BookingBackend>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Bookings kept only for the life of the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBookingStore {
    rows: Arc<Mutex<Vec<Booking>>>,
}

impl InMemoryBookingStore {
    fn rows(&self) -> Vec<Booking> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BookingStore for InMemoryBookingStore {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        Ok(self.rows().iter().map(Booking::taken_slot).collect())
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        Ok(self.rows())
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        let mut guard = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
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

/// The ledger selected at startup: a CSV file when configured, memory otherwise.
pub(crate) enum BookingBackend {
    Csv(CsvBookingLedger),
    Memory(InMemoryBookingStore),
}

impl BookingBackend {
    pub(crate) fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => {
                info!(path = %path.display(), "using CSV booking ledger");
                Self::Csv(CsvBookingLedger::new(path))
            }
            None => {
                warn!("no booking ledger configured; bookings are kept in memory");
                Self::Memory(InMemoryBookingStore::default())
            }
        }
    }

    fn store(&self) -> &dyn BookingStore {
        match self {
            BookingBackend::Csv(ledger) => ledger,
            BookingBackend::Memory(memory) => memory,
        }
    }
}

impl BookingStore for BookingBackend {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        self.store().already_taken()
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        self.store().bookings()
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        self.store().append(bookings)
    }
}

/// Loads the CSV roster when both tables are configured; otherwise starts empty.
pub(crate) fn load_roster(config: &SchedulingConfig) -> Result<Roster, AppError> {
    match (&config.candidates_csv, &config.interviewers_csv) {
        (Some(candidates), Some(interviewers)) => Ok(Roster::from_paths(candidates, interviewers)?),
        (None, Some(interviewers)) => {
            let empty_candidates = "id,field,email,skills\n".as_bytes();
            let file = std::fs::File::open(interviewers)?;
            Ok(Roster::from_csv_readers(empty_candidates, file)?)
        }
        _ => {
            warn!("no interviewer roster configured; every candidate will stay unscheduled");
            Ok(Roster::default())
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|err| format!("failed to parse '{raw}' as HH:MM ({err})"))
}
