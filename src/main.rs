//! campanile -- campus portal CLI: sign-on checks, academic queries, and
//! the library seat booking scheduler.

use campanile::cli;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "campanile")]
#[command(version)]
#[command(about = "Campus portal automation: SSO, grades, timetables, and seat booking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Print extra detail
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the campus SSO and report the harvested session
    Login {
        student_id: String,
        /// Portal password (falls back to CAMPANILE_PASSWORD, then the saved profile)
        #[arg(long)]
        password: Option<String>,
    },

    /// Query grade records
    Grades {
        student_id: String,
        #[arg(long)]
        password: Option<String>,
        /// Academic year, e.g. 2024 (empty queries everything)
        #[arg(long, default_value = "")]
        year: String,
        /// Portal term code: 3 = autumn, 12 = spring (empty queries everything)
        #[arg(long, default_value = "")]
        term: String,
    },

    /// Query the weekly timetable
    Timetable {
        student_id: String,
        #[arg(long)]
        password: Option<String>,
        /// Academic year, e.g. 2024
        #[arg(long, default_value = "")]
        year: String,
        /// Portal term code: 3 = autumn, 12 = spring
        #[arg(long, default_value = "")]
        term: String,
        /// Show only meetings occurring in this week number
        #[arg(long)]
        week: Option<u32>,
    },

    /// Resolve a seat label (e.g. 04ES12C) to its catalog seat id
    Seat { label: String },

    /// One-shot booking attempt, outside the scheduler
    Book {
        student_id: String,
        /// Slot start, HH:mm (completed to today) or a full datetime
        #[arg(long)]
        start: String,
        /// Slot end, HH:mm or a full datetime
        #[arg(long)]
        end: String,
        /// Seat label override; defaults to the saved profile's seat
        #[arg(long)]
        seat: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Manage saved booking profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage recurring reservation windows
    Window {
        #[command(subcommand)]
        action: WindowAction,
    },

    /// Run the autonomous booking scheduler in the foreground
    Watch,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Save or replace a profile, resolving the seat label live
    Set {
        student_id: String,
        /// Seat label, e.g. 04ES12C
        #[arg(long)]
        seat: String,
        /// Portal password (falls back to CAMPANILE_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Show a saved profile (the password is never printed)
    Show { student_id: String },
    /// Remove a profile together with its windows
    Remove { student_id: String },
    /// Turn automatic booking on or off
    Auto {
        student_id: String,
        /// 'on' or 'off'
        state: String,
    },
}

#[derive(Subcommand)]
enum WindowAction {
    /// Add a reservation window
    Add {
        student_id: String,
        /// Slot start, HH:mm
        #[arg(long)]
        start: String,
        /// Slot end, HH:mm
        #[arg(long)]
        end: String,
        /// HH:mm instant the portal releases the slot for booking
        #[arg(long)]
        open: String,
    },
    /// List every window for a student
    List { student_id: String },
    /// Remove a window by id
    Remove { id: i64 },
    /// Activate ('on') or pause ('off') a window by id
    Toggle {
        id: i64,
        /// 'on' or 'off'
        state: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The output helpers read these; set before any command runs.
    if cli.quiet {
        std::env::set_var("CAMPANILE_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("CAMPANILE_VERBOSE", "1");
    }
    if cli.json {
        std::env::set_var("CAMPANILE_JSON", "1");
    }
    if cli.no_color {
        std::env::set_var("CAMPANILE_NO_COLOR", "1");
    }

    match cli.command {
        Commands::Login {
            student_id,
            password,
        } => cli::login_cmd::run(&student_id, password).await,
        Commands::Grades {
            student_id,
            password,
            year,
            term,
        } => cli::grades_cmd::run(&student_id, password, &year, &term).await,
        Commands::Timetable {
            student_id,
            password,
            year,
            term,
            week,
        } => cli::timetable_cmd::run(&student_id, password, &year, &term, week).await,
        Commands::Seat { label } => cli::seat_cmd::run(&label).await,
        Commands::Book {
            student_id,
            start,
            end,
            seat,
            password,
        } => cli::book_cmd::run(&student_id, password, &start, &end, seat).await,
        Commands::Profile { action } => match action {
            ProfileAction::Set {
                student_id,
                seat,
                password,
            } => cli::profile_cmd::set(&student_id, &seat, password).await,
            ProfileAction::Show { student_id } => cli::profile_cmd::show(&student_id).await,
            ProfileAction::Remove { student_id } => cli::profile_cmd::remove(&student_id).await,
            ProfileAction::Auto { student_id, state } => {
                cli::profile_cmd::auto(&student_id, &state).await
            }
        },
        Commands::Window { action } => match action {
            WindowAction::Add {
                student_id,
                start,
                end,
                open,
            } => cli::window_cmd::add(&student_id, &start, &end, &open).await,
            WindowAction::List { student_id } => cli::window_cmd::list(&student_id).await,
            WindowAction::Remove { id } => cli::window_cmd::remove(id).await,
            WindowAction::Toggle { id, state } => cli::window_cmd::toggle(id, &state).await,
        },
        Commands::Watch => cli::watch_cmd::run().await,
    }
}
