use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{AssignmentArgs, Commands};
use config::Config;
use peershuffle::audit::{ShuffleLog, format_pairing};
use peershuffle::gradebook::{CanvasGradebook, Gradebook};
use peershuffle::input;
use peershuffle::publish::{Assignments, PublishReport, Publisher};
use peershuffle::shuffle::{self, AssignmentKind, Override, Ring, Schedule};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("peershuffle")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("peershuffle.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.unwrap_or("info")))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            info!("Using shuffle seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

fn print_schedule(schedule: &Schedule) {
    for (interviewer, entry) in schedule.iter() {
        println!("{}", format_pairing(interviewer, entry));
    }
}

fn print_ring(ring: &Ring) {
    for (i, interviewer) in ring.members().iter().enumerate() {
        println!("{} -> {}", interviewer, ring.members()[ring.interviewee_index(i)]);
    }
}

fn print_report(report: &PublishReport, noun: &str) {
    for failure in &report.failures {
        println!("{} {}", "FAILED".red(), failure);
    }
    let summary = format!("{} of {} {} posted", report.posted, report.attempted, noun);
    if report.is_complete() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}

async fn connect(config: &Config, args: &AssignmentArgs) -> Result<(CanvasGradebook, Assignments)> {
    let canvas = CanvasGradebook::new(config.canvas(args.dry_run)?).context("Failed to create gradebook client")?;
    if args.dry_run {
        println!("{}", "Dry run: no changes will be uploaded".yellow());
    }
    let assignments = Assignments {
        assessment: canvas
            .find_assignment(&args.assessment)
            .await
            .context(format!("Did not find assignment {}", args.assessment))?,
        feedback: canvas
            .find_assignment(&args.feedback)
            .await
            .context(format!("Did not find assignment {}", args.feedback))?,
    };
    Ok((canvas, assignments))
}

async fn handle_make(
    args: &AssignmentArgs,
    questions: Option<&Path>,
    students: Option<&Path>,
    seed: Option<u64>,
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    let questions = questions.unwrap_or(config.shuffle.questions_file.as_path());
    let pool = input::load_questions(questions).context("Failed to load question pool")?;

    let (canvas, assignments) = connect(config, args).await?;
    let roster = canvas.fetch_roster().await.context("Failed to fetch roster")?;

    let participants = match students {
        Some(path) => input::load_participants(path, &config.gradebook.mail_domain)
            .context("Failed to load student list")?,
        None => roster.participants(),
    };
    info!("Scheduling shuffle for {} participants", participants.len());

    let schedule = {
        let mut rng = make_rng(seed);
        shuffle::schedule(participants, &pool, &mut rng).context("Failed to schedule shuffle")?
    };
    if cli.is_verbose() {
        print_schedule(&schedule);
    }

    ShuffleLog::new(&config.shuffle.log_file)
        .append_schedule(&assignments.assessment.name, &assignments.feedback.name, &schedule)
        .context("Failed to write shuffle log")?;

    let plan = shuffle::build(&schedule);
    println!(
        "{} {} pairings for {}/{}",
        "Uploading".cyan(),
        schedule.len(),
        assignments.assessment.name,
        assignments.feedback.name
    );
    let report = Publisher::new(&canvas, &roster, &assignments)
        .publish_plan(&plan)
        .await;
    print_report(&report, "pairings");
    Ok(())
}

async fn handle_reassign(args: &AssignmentArgs, pairs: &[String], cli: &Cli, config: &Config) -> Result<()> {
    let mut overrides = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match pair.parse::<Override>() {
            Ok(o) => overrides.push(o),
            Err(e) => println!("{} {}: {}", "SKIPPED".yellow(), pair, e),
        }
    }
    if overrides.is_empty() {
        eyre::bail!("No valid reassignments specified");
    }

    let (canvas, assignments) = connect(config, args).await?;
    let roster = canvas.fetch_roster().await.context("Failed to fetch roster")?;

    let assessment_reviews = canvas
        .fetch_reviews(&assignments.assessment)
        .await
        .context("Failed to fetch assessment peer reviews")?;
    let feedback_reviews = canvas
        .fetch_reviews(&assignments.feedback)
        .await
        .context("Failed to fetch feedback peer reviews")?;
    let assessment = roster.relation_from_reviews(AssignmentKind::Assessment, &assessment_reviews);
    let feedback = roster.relation_from_reviews(AssignmentKind::Feedback, &feedback_reviews);

    let reassignment = shuffle::reassign(&overrides, &roster, &assessment, &feedback);
    for skipped in &reassignment.skipped {
        println!("{} {}: {}", "SKIPPED".yellow(), skipped.pairing, skipped.reason);
    }
    if cli.is_verbose() {
        for removal in reassignment.removals() {
            let reviewers: Vec<String> = removal.reviewers.iter().map(ToString::to_string).collect();
            println!(
                "{} {} from {} {}",
                "Replacing".cyan(),
                reviewers.join(", "),
                removal.assignment,
                removal.reviewee
            );
        }
    }

    ShuffleLog::new(&config.shuffle.log_file)
        .append_reassignment(&reassignment)
        .context("Failed to write shuffle log")?;

    let report = Publisher::new(&canvas, &roster, &assignments)
        .publish_reassignment(&reassignment)
        .await;
    print_report(&report, "reassignments");
    Ok(())
}

fn handle_preview_log(config: &Config) -> Result<()> {
    let log = ShuffleLog::new(&config.shuffle.log_file);
    match log.read_last_ring().context("Failed to read shuffle log")? {
        Some(ring) => {
            print_ring(&ring);
            Ok(())
        }
        None => eyre::bail!("No shuffle recorded in {}", log.path().display()),
    }
}

fn handle_preview(questions: Option<&Path>, students: Option<&Path>, seed: Option<u64>, config: &Config) -> Result<()> {
    let questions = questions.unwrap_or(config.shuffle.questions_file.as_path());
    let students = students.unwrap_or(config.shuffle.students_file.as_path());
    let pool = input::load_questions(questions).context("Failed to load question pool")?;
    let participants =
        input::load_participants(students, &config.gradebook.mail_domain).context("Failed to load student list")?;

    let mut rng = make_rng(seed);
    let schedule = shuffle::schedule(participants, &pool, &mut rng).context("Failed to schedule shuffle")?;
    print_schedule(&schedule);
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Make {
            assignments,
            questions,
            students,
            seed,
        } => handle_make(assignments, questions.as_deref(), students.as_deref(), *seed, cli, config).await,
        Commands::Reassign { assignments, pairs } => handle_reassign(assignments, pairs, cli, config).await,
        Commands::Preview { from_log: true, .. } => handle_preview_log(config),
        Commands::Preview {
            questions,
            students,
            seed,
            ..
        } => handle_preview(questions.as_deref(), students.as_deref(), *seed, config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
