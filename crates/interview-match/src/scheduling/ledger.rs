//! CSV booking ledger with columns
//! `interviewer_id,candidate_id,date,time,interviewer_email,candidate_email`.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use super::domain::{Booking, ScheduleRecord, TakenSlot};
use super::repository::{BookingStore, BookingStoreError};

pub fn write_schedule_csv<W: Write>(writer: W, bookings: &[Booking]) -> Result<(), csv::Error> {
    write_records(writer, bookings, true)
}

fn write_records<W: Write>(
    writer: W,
    bookings: &[Booking],
    with_header: bool,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(writer);
    for booking in bookings {
        csv_writer.serialize(booking.to_record())?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_schedule_csv<R: Read>(reader: R) -> Result<Vec<ScheduleRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<ScheduleRecord>().collect()
}

/// File-backed [`BookingStore`]. A missing file reads as an empty ledger.
#[derive(Debug)]
pub struct CsvBookingLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvBookingLedger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut bookings = Vec::new();
        for record in read_schedule_csv(file)? {
            let time = record.time.clone();
            match record.into_booking() {
                Some(booking) => bookings.push(booking),
                None => warn!(
                    time = %time,
                    path = %self.path.display(),
                    "skipping ledger row with unreadable time"
                ),
            }
        }
        Ok(bookings)
    }
}

impl BookingStore for CsvBookingLedger {
    fn already_taken(&self) -> Result<HashSet<TakenSlot>, BookingStoreError> {
        Ok(self
            .read_bookings()?
            .iter()
            .map(Booking::taken_slot)
            .collect())
    }

    fn bookings(&self) -> Result<Vec<Booking>, BookingStoreError> {
        self.read_bookings()
    }

    fn append(&self, bookings: &[Booking]) -> Result<(), BookingStoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self.already_taken()?;
        let fresh: Vec<Booking> = bookings
            .iter()
            .filter(|booking| !existing.contains(&booking.taken_slot()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write_records(file, &fresh, needs_header)?;

        debug!(
            appended = fresh.len(),
            skipped = bookings.len() - fresh.len(),
            path = %self.path.display(),
            "appended bookings to ledger"
        );
        Ok(())
    }
}
