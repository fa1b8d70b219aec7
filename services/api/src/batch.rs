use crate::infra::BookingBackend;
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use interview_match::config::{AppConfig, ConfigError};
use interview_match::error::AppError;
use interview_match::scheduling::{
    write_schedule_csv, BatchReport, CalendarConfig, Roster, SchedulingService,
};
use interview_match::telemetry;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScheduleArgs {
    /// Candidate roster CSV (id,field,email,skills)
    #[arg(long)]
    pub(crate) candidates: PathBuf,
    /// Interviewer roster CSV (id,field,email,skills)
    #[arg(long)]
    pub(crate) interviewers: PathBuf,
    /// Existing booking ledger; its slots are excluded and new bookings appended
    #[arg(long)]
    pub(crate) ledger: Option<PathBuf>,
    /// Write this run's bookings to a separate CSV export
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// First day of the scheduling window (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) window_start: Option<NaiveDate>,
    /// Number of consecutive days in the window
    #[arg(long)]
    pub(crate) window_days: Option<u32>,
    /// Start of the working day (HH:MM)
    #[arg(long, value_parser = crate::infra::parse_time)]
    pub(crate) day_start: Option<NaiveTime>,
    /// End of the working day (HH:MM)
    #[arg(long, value_parser = crate::infra::parse_time)]
    pub(crate) day_end: Option<NaiveTime>,
}

impl ScheduleArgs {
    fn calendar(&self, base: &CalendarConfig) -> CalendarConfig {
        CalendarConfig {
            window_start: self.window_start.unwrap_or(base.window_start),
            window_days: self.window_days.unwrap_or(base.window_days),
            day_start: self.day_start.unwrap_or(base.day_start),
            day_end: self.day_end.unwrap_or(base.day_end),
            ..base.clone()
        }
    }
}

pub(crate) fn run_schedule(args: ScheduleArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let calendar = args.calendar(&config.scheduling.calendar);
    calendar.validate().map_err(ConfigError::Calendar)?;

    let roster = Arc::new(Roster::from_paths(&args.candidates, &args.interviewers)?);
    let store = Arc::new(BookingBackend::from_path(args.ledger.clone()));
    let service = SchedulingService::new(roster, store, &calendar)?;

    service.warm_scores();
    let report = service.schedule_batch();
    let persisted = service.flush_pending()?;

    if let Some(path) = &args.output {
        let file = File::create(path)?;
        write_schedule_csv(file, &report.booked)?;
    }

    render_report(&report, &calendar, persisted, args.output.as_ref());
    Ok(())
}

fn render_report(
    report: &BatchReport,
    calendar: &CalendarConfig,
    persisted: usize,
    output: Option<&PathBuf>,
) {
    println!("Interview schedule");
    println!(
        "Window: {} for {} day(s), {}-{}",
        calendar.window_start,
        calendar.window_days,
        calendar.day_start.format("%H:%M"),
        calendar.day_end.format("%H:%M")
    );
    println!(
        "- {} booked | {} unscheduled | {} already scheduled",
        report.booked.len(),
        report.unscheduled.len(),
        report.skipped
    );

    if !report.booked.is_empty() {
        println!("Bookings:");
        for booking in &report.booked {
            println!(
                "  - {} with {} on {} at {}",
                booking.candidate_id,
                booking.interviewer_id,
                booking.date,
                booking.time_range()
            );
        }
    }

    if !report.unscheduled.is_empty() {
        println!("Unscheduled:");
        for entry in &report.unscheduled {
            println!("  - {}: {}", entry.candidate_id, entry.failure);
        }
    }

    println!("{} booking(s) written to the ledger", persisted);
    if let Some(path) = output {
        println!("Schedule exported to {}", path.display());
    }
}
