//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - make: shuffle the roster, log the pairing and upload it
//! - reassign: override individual pairings
//! - preview: shuffle offline and print the pairing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// peershuffle - peer-interview shuffle scheduler
#[derive(Parser, Debug)]
#[command(name = "peershuffle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// The two gradebook assignments a shuffle writes to
#[derive(Args, Debug, Clone)]
pub struct AssignmentArgs {
    /// Assignment holding the interviewee assessments
    #[arg(short = 'S', long)]
    pub assessment: String,

    /// Assignment holding the interviewer feedback
    #[arg(short = 'F', long)]
    pub feedback: String,

    /// Log uploads instead of sending them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an interview shuffle among the enrolled students
    Make {
        #[command(flatten)]
        assignments: AssignmentArgs,

        /// Question list, one "<chapter>.<id>" per line
        #[arg(short = 'Q', long)]
        questions: Option<PathBuf>,

        /// Use the students in FILE instead of the current roster
        #[arg(long, value_name = "FILE")]
        students: Option<PathBuf>,

        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Assign a new interviewee to an interviewer
    Reassign {
        #[command(flatten)]
        assignments: AssignmentArgs,

        /// Overrides in interviewer:interviewee form
        #[arg(required = true, value_name = "INTERVIEWER:INTERVIEWEE")]
        pairs: Vec<String>,
    },

    /// Shuffle a student file offline and print the pairing
    Preview {
        /// Print the ring of the last logged shuffle instead of shuffling
        #[arg(long, conflicts_with_all = ["questions", "students", "seed"])]
        from_log: bool,

        /// Question list, one "<chapter>.<id>" per line
        #[arg(short = 'Q', long)]
        questions: Option<PathBuf>,

        /// Student list, one login per line
        #[arg(long, value_name = "FILE")]
        students: Option<PathBuf>,

        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,
    },
}
