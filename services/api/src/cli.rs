use crate::batch::{run_schedule, ScheduleArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use interview_match::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Interview Match",
    about = "Match candidates to interviewers and book interview slots",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one batch scheduling pass over CSV rosters and print a summary
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Candidate roster CSV to seed the service with
    #[arg(long)]
    pub(crate) candidates: Option<PathBuf>,
    /// Interviewer roster CSV
    #[arg(long)]
    pub(crate) interviewers: Option<PathBuf>,
    /// Booking ledger CSV; bookings stay in memory when omitted
    #[arg(long)]
    pub(crate) ledger: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule(args) => run_schedule(args),
    }
}
