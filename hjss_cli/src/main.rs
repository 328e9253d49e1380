use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use hjss_core::report::{
    coach_monthly_report, learner_monthly_report, write_coach_report_csv,
    write_learner_report_csv,
};
use hjss_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hjss")]
#[command(about = "Hatfield Junior Swimming School lesson booking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the lesson timetable around today
    Init {
        /// Seed for reproducible coach and grade assignment
        #[arg(long, conflicts_with = "rotate")]
        seed: Option<u64>,

        /// Rotate coaches and grades in order instead of at random
        #[arg(long)]
        rotate: bool,

        /// Date to centre the timetable on (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Discard any existing school data
        #[arg(long)]
        force: bool,
    },

    /// Register a new learner
    Register {
        #[arg(long)]
        name: String,

        /// Male, Female or Other
        #[arg(long)]
        gender: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,

        /// UK mobile number, e.g. +447123456789
        #[arg(long)]
        contact: String,

        /// Current grade (1-5)
        #[arg(long)]
        grade: u8,

        /// Date the age check is made against (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List registered learners
    Learners,

    /// Show lessons, optionally filtered
    Timetable {
        #[arg(long)]
        grade: Option<u8>,

        #[arg(long)]
        coach: Option<String>,

        /// Weekday, e.g. mon or saturday
        #[arg(long)]
        day: Option<Weekday>,

        /// Only lessons with a free place
        #[arg(long)]
        available: bool,
    },

    /// Book a learner onto a lesson
    Book { learner: String, lesson: String },

    /// Move a booking to another lesson
    Change { booking: String, lesson: String },

    /// Cancel a booking
    Cancel { booking: String },

    /// Mark a booking attended
    Attend {
        booking: String,

        /// Also record a review (1-5) for the lesson
        #[arg(long, requires = "review")]
        rating: Option<u8>,

        #[arg(long, requires = "rating")]
        review: Option<String>,
    },

    /// List bookings
    Bookings {
        #[arg(long)]
        learner: Option<String>,

        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Review an attended lesson
    Review {
        booking: String,
        rating: u8,
        text: String,
    },

    /// List reviews
    Reviews {
        #[arg(long)]
        coach: Option<String>,
    },

    /// Monthly reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Remove a booking record entirely
    DeleteBooking { booking: String },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Bookings per learner
    Learners(ReportArgs),

    /// Average rating per coach
    Coaches(ReportArgs),
}

#[derive(clap::Args)]
struct ReportArgs {
    #[arg(long)]
    year: i32,

    /// Month number (1-12)
    #[arg(long)]
    month: u32,

    /// Also write the report to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Booked,
    Cancelled,
    Attended,
}

impl From<StatusArg> for BookingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Booked => BookingStatus::Booked,
            StatusArg::Cancelled => BookingStatus::Cancelled,
            StatusArg::Attended => BookingStatus::Attended,
        }
    }
}

fn main() -> Result<()> {
    hjss_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let state_path = data_dir.join("state.json");

    match cli.command {
        Commands::Init {
            seed,
            rotate,
            today,
            force,
        } => cmd_init(&state_path, &config, seed, rotate, today, force),
        Commands::Register {
            name,
            gender,
            dob,
            contact,
            grade,
            today,
        } => {
            let form = NewLearner {
                name,
                gender,
                date_of_birth: dob,
                emergency_contact: contact,
                grade,
            };
            cmd_register(&state_path, &form, today.unwrap_or_else(local_today))
        }
        Commands::Learners => cmd_learners(&state_path),
        Commands::Timetable {
            grade,
            coach,
            day,
            available,
        } => cmd_timetable(&state_path, grade, coach, day, available),
        Commands::Book { learner, lesson } => cmd_book(&state_path, &learner, &lesson),
        Commands::Change { booking, lesson } => cmd_change(&state_path, &booking, &lesson),
        Commands::Cancel { booking } => cmd_cancel(&state_path, &booking),
        Commands::Attend {
            booking,
            rating,
            review,
        } => cmd_attend(&state_path, &booking, rating.zip(review)),
        Commands::Bookings { learner, status } => {
            cmd_bookings(&state_path, learner, status.map(BookingStatus::from))
        }
        Commands::Review {
            booking,
            rating,
            text,
        } => cmd_review(&state_path, &booking, rating, &text),
        Commands::Reviews { coach } => cmd_reviews(&state_path, coach),
        Commands::Report { kind } => match kind {
            ReportKind::Learners(args) => cmd_report_learners(&state_path, &args),
            ReportKind::Coaches(args) => cmd_report_coaches(&state_path, &args),
        },
        Commands::DeleteBooking { booking } => cmd_delete_booking(&state_path, &booking),
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn cmd_init(
    state_path: &Path,
    config: &Config,
    seed: Option<u64>,
    rotate: bool,
    today: Option<NaiveDate>,
    force: bool,
) -> Result<()> {
    if !force && !SchoolState::load(state_path)?.store.lessons.is_empty() {
        return Err(Error::State(format!(
            "{} already holds a timetable; pass --force to start over",
            state_path.display()
        )));
    }

    let window = config.window_around(today.unwrap_or_else(local_today))?;
    let scheduler = Scheduler::new(config.schedule.clone())?;

    let mut state = SchoolState::default();
    let SchoolState { store, ids } = &mut state;
    let refs = if rotate {
        let mut policy = config.rotating_assignment()?;
        scheduler.generate(window, &mut policy, ids, store)?
    } else {
        let mut policy = config.random_assignment(seed)?;
        scheduler.generate(window, &mut policy, ids, store)?
    };
    state.save(state_path)?;

    println!(
        "✓ Created {} lessons from {} to {}",
        refs.len(),
        window.start(),
        window.end()
    );
    println!("  State: {}", state_path.display());
    Ok(())
}

fn cmd_register(state_path: &Path, form: &NewLearner, today: NaiveDate) -> Result<()> {
    let id = SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        register_learner(store, ids, form, today)
    })?;

    println!("✓ Registered {} as {}", form.name.trim(), id);
    Ok(())
}

fn cmd_learners(state_path: &Path) -> Result<()> {
    let state = SchoolState::load(state_path)?;

    if state.store.learners.is_empty() {
        println!("No learners registered.");
        return Ok(());
    }

    for learner in state.store.learners.all() {
        println!(
            "{:<20} {:<16} {:<7} grade {}  booked {}  attended {}  cancelled {}",
            learner.id(),
            learner.name(),
            learner.gender().to_string(),
            learner.grade(),
            learner.booked().len(),
            learner.attended().len(),
            learner.cancelled().len()
        );
    }
    Ok(())
}

fn cmd_timetable(
    state_path: &Path,
    grade: Option<u8>,
    coach: Option<String>,
    day: Option<Weekday>,
    available: bool,
) -> Result<()> {
    let state = SchoolState::load(state_path)?;
    let store = &state.store;

    let mut lessons = match grade {
        Some(grade) => store.lessons_by_grade(GradeLevel::new(grade)?),
        None => store.timetable(),
    };
    if let Some(coach) = coach {
        lessons.retain(|l| l.coach().eq_ignore_ascii_case(&coach));
    }
    if let Some(day) = day {
        lessons.retain(|l| l.weekday() == day);
    }
    if available {
        lessons.retain(|l| rules::is_lesson_available(l));
    }

    if lessons.is_empty() {
        println!("No lessons found.");
        return Ok(());
    }

    for lesson in lessons {
        println!(
            "{:<22} {} {}  {:<8} grade {}  {}/{}  {}",
            lesson.lesson_ref(),
            lesson.date().format("%a %d %b %Y"),
            lesson.time_slot(),
            lesson.coach(),
            lesson.grade(),
            lesson.occupied(),
            lesson.capacity(),
            lesson.status()
        );
    }
    Ok(())
}

fn cmd_book(state_path: &Path, learner: &str, lesson: &str) -> Result<()> {
    let booking_id = SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        Ok(BookingEngine::new(store, ids).create(learner, lesson)?)
    })?;

    println!("✓ Booked {} onto {}: {}", learner, lesson, booking_id);
    Ok(())
}

fn cmd_change(state_path: &Path, booking: &str, lesson: &str) -> Result<()> {
    SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        Ok(BookingEngine::new(store, ids).update(booking, lesson)?)
    })?;

    println!("✓ Moved {} to {}", booking, lesson);
    Ok(())
}

fn cmd_cancel(state_path: &Path, booking: &str) -> Result<()> {
    SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        Ok(BookingEngine::new(store, ids).cancel(booking)?)
    })?;

    println!("✓ Cancelled {}", booking);
    Ok(())
}

fn cmd_attend(state_path: &Path, booking: &str, review: Option<(u8, String)>) -> Result<()> {
    let outcome = SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        let outcome = BookingEngine::new(store, ids).attend(booking)?;
        if let (AttendOutcome::Attended { .. }, Some((rating, text))) = (&outcome, &review) {
            add_review(store, booking, *rating, text)?;
        }
        Ok(outcome)
    })?;

    match outcome {
        AttendOutcome::Attended {
            lesson_ref,
            promoted_to,
        } => {
            println!("✓ {} attended {}", booking, lesson_ref);
            if let Some(grade) = promoted_to {
                println!("  Promoted to grade {}!", grade);
            }
            if review.is_some() {
                println!("  Review recorded");
            }
        }
        AttendOutcome::AlreadyAttended { lesson_ref } => {
            println!("{} was already marked attended for {}", booking, lesson_ref);
        }
    }
    Ok(())
}

fn cmd_bookings(
    state_path: &Path,
    learner: Option<String>,
    status: Option<BookingStatus>,
) -> Result<()> {
    let state = SchoolState::load(state_path)?;
    let store = &state.store;

    let bookings = match (&learner, status) {
        (Some(id), _) if store.learner(id).is_none() => {
            return Err(BookingError::LearnerNotFound(id.clone()).into());
        }
        (Some(id), Some(status)) => store
            .bookings_for_learner(id)
            .into_iter()
            .filter(|b| b.status() == status)
            .collect(),
        (Some(id), None) => store.bookings_for_learner(id),
        (None, Some(status)) => store.bookings_with_status(status),
        (None, None) => store.bookings.all().collect(),
    };

    if bookings.is_empty() {
        println!("No bookings found.");
        return Ok(());
    }

    for booking in bookings {
        let slot = store
            .lesson(booking.lesson_ref())
            .map(|l| format!("{} {}", l.date(), l.time_slot()))
            .unwrap_or_default();
        println!(
            "{:<8} {:<20} {:<22} {:<24} {}",
            booking.id(),
            booking.learner_id(),
            booking.lesson_ref(),
            slot,
            booking.status()
        );
    }
    Ok(())
}

fn cmd_review(state_path: &Path, booking: &str, rating: u8, text: &str) -> Result<()> {
    SchoolState::update(state_path, |state| add_review(&mut state.store, booking, rating, text))?;

    println!("✓ Review recorded for {}", booking);
    Ok(())
}

fn cmd_reviews(state_path: &Path, coach: Option<String>) -> Result<()> {
    let state = SchoolState::load(state_path)?;
    let reviews: Vec<&Review> = match &coach {
        Some(coach) => state.store.reviews_for_coach(coach),
        None => state.store.reviews.iter().collect(),
    };

    if reviews.is_empty() {
        println!("No reviews found.");
        return Ok(());
    }

    for review in reviews {
        println!(
            "{} {:<8} {} {}/5  {}",
            review.lesson_date, review.coach, review.learner_id, review.rating, review.text
        );
    }
    Ok(())
}

fn cmd_report_learners(state_path: &Path, args: &ReportArgs) -> Result<()> {
    let state = SchoolState::load(state_path)?;
    let report = learner_monthly_report(&state.store, args.year, args.month)?;

    println!("Learner report for {:04}-{:02}", args.year, args.month);
    for entry in &report {
        println!();
        println!(
            "{} {} (grade {}): booked {}, cancelled {}, attended {}",
            entry.learner_id,
            entry.name,
            entry.grade,
            entry.count(BookingStatus::Booked),
            entry.count(BookingStatus::Cancelled),
            entry.count(BookingStatus::Attended)
        );
        for line in &entry.lessons {
            println!(
                "  {} {} {:<8} grade {}  {}",
                line.booking_id, line.date, line.coach, line.grade, line.status
            );
        }
    }

    if let Some(path) = &args.csv {
        let rows = write_learner_report_csv(path, &report)?;
        println!();
        println!("✓ Wrote {} rows to {}", rows, path.display());
    }
    Ok(())
}

fn cmd_report_coaches(state_path: &Path, args: &ReportArgs) -> Result<()> {
    let state = SchoolState::load(state_path)?;
    let report = coach_monthly_report(&state.store, args.year, args.month)?;

    println!("Coach report for {:04}-{:02}", args.year, args.month);
    if report.is_empty() {
        println!("No reviews this month.");
    }
    for entry in &report {
        println!(
            "{:<8} average {:.2} from {} reviews",
            entry.coach, entry.average_rating, entry.reviews
        );
    }

    if let Some(path) = &args.csv {
        let rows = write_coach_report_csv(path, &report)?;
        println!("✓ Wrote {} rows to {}", rows, path.display());
    }
    Ok(())
}

fn cmd_delete_booking(state_path: &Path, booking: &str) -> Result<()> {
    let removed = SchoolState::update(state_path, |state| {
        let SchoolState { store, ids } = state;
        Ok(BookingEngine::new(store, ids).delete(booking)?)
    })?;

    println!(
        "✓ Deleted {} ({} on {})",
        removed.id(),
        removed.learner_id(),
        removed.lesson_ref()
    );
    Ok(())
}
