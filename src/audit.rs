//! Append-only shuffle log.
//!
//! Every scheduling run appends a header followed by one line per pairing
//! in ring order, so a ring can be rebuilt by hand (or by
//! [`ShuffleLog::read_last_ring`]) after a partial upload failure.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::Participant;
use crate::error::{Result, ShuffleError};
use crate::shuffle::{Reassignment, Ring, RingEntry, Schedule};

const HEADER_PREFIX: &str = "Shuffle assignments for ";
const REASSIGN_PREFIX: &str = "reassigned ";

/// One pairing as written to the log.
pub fn format_pairing(interviewer: &Participant, entry: &RingEntry) -> String {
    format!(
        "{} -> {}  Q1: {}  Q2: {}  Q3: {}",
        interviewer, entry.interviewee, entry.questions[0], entry.questions[1], entry.questions[2]
    )
}

fn parse_pairing(line: &str) -> Option<(&str, &str)> {
    let (interviewer, rest) = line.split_once(" -> ")?;
    let interviewee = rest.split_whitespace().next()?;
    Some((interviewer.trim(), interviewee))
}

/// Shuffle log at a fixed path
#[derive(Debug, Clone)]
pub struct ShuffleLog {
    path: PathBuf,
}

impl ShuffleLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_lines(&self, lines: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Record a scheduling run.
    pub fn append_schedule(&self, assessment: &str, feedback: &str, schedule: &Schedule) -> Result<()> {
        let mut lines = Vec::with_capacity(schedule.len() + 1);
        lines.push(format!(
            "{}{}/{} ({})",
            HEADER_PREFIX,
            assessment,
            feedback,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        lines.extend(schedule.iter().map(|(interviewer, entry)| format_pairing(interviewer, entry)));
        self.append_lines(&lines)?;
        log::info!("Appended {} pairings to {}", schedule.len(), self.path.display());
        Ok(())
    }

    /// Record the overrides that survived resolution.
    pub fn append_reassignment(&self, reassignment: &Reassignment) -> Result<()> {
        let lines: Vec<String> = reassignment
            .plans
            .iter()
            .map(|plan| {
                format!(
                    "{}{} -> {}",
                    REASSIGN_PREFIX, plan.pairing.interviewer, plan.pairing.interviewee
                )
            })
            .collect();
        if lines.is_empty() {
            return Ok(());
        }
        self.append_lines(&lines)
    }

    /// Rebuild the ring of the most recent scheduling run, if any.
    pub fn read_last_ring(&self) -> Result<Option<Ring>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        let Some(start) = lines.iter().rposition(|l| l.starts_with(HEADER_PREFIX)) else {
            return Ok(None);
        };

        let mut order = Vec::new();
        let mut interviewees = Vec::new();
        for line in &lines[start + 1..] {
            if line.starts_with(HEADER_PREFIX) || line.starts_with(REASSIGN_PREFIX) {
                break;
            }
            let (interviewer, interviewee) = parse_pairing(line).ok_or_else(|| {
                ShuffleError::Validation(format!("unreadable shuffle log line: {:?}", line))
            })?;
            order.push(Participant::new(interviewer)?);
            interviewees.push(Participant::new(interviewee)?);
        }

        let ring = Ring::from_order(order)?;
        for (i, interviewee) in interviewees.iter().enumerate() {
            if &ring.members()[ring.interviewee_index(i)] != interviewee {
                return Err(ShuffleError::Validation(format!(
                    "shuffle log is not a single ring at {} -> {}",
                    ring.members()[i],
                    interviewee
                )));
            }
        }
        Ok(Some(ring))
    }
}
