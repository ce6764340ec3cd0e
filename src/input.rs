//! Line-oriented roster and question files.
//!
//! One token per line. Trailing blank lines (a file ending in a newline)
//! are dropped; a blank line anywhere else is rejected.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::domain::{Participant, Question, QuestionPool};
use crate::error::{Result, ShuffleError};

/// Split `content` into trimmed tokens, stripping trailing blank lines.
pub fn tokens(content: &str) -> Result<Vec<String>> {
    let mut lines: Vec<&str> = content.lines().map(str::trim).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if line.is_empty() {
                Err(ShuffleError::Validation(format!("blank entry on line {}", i + 1)))
            } else {
                Ok(line.to_string())
            }
        })
        .collect()
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        ShuffleError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Parse participant tokens, rejecting duplicates after normalization.
pub fn parse_participants(content: &str, mail_domain: &str) -> Result<Vec<Participant>> {
    let mut seen = HashSet::new();
    let mut participants = Vec::new();
    for token in tokens(content)? {
        let participant = Participant::from_login(&token, mail_domain)?;
        if !seen.insert(participant.clone()) {
            return Err(ShuffleError::Validation(format!("duplicate participant: {}", participant)));
        }
        participants.push(participant);
    }
    Ok(participants)
}

/// Parse question tokens into a pool. Duplicates are kept but reported.
pub fn parse_questions(content: &str) -> Result<QuestionPool> {
    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for token in tokens(content)? {
        let question = Question::parse(&token)?;
        if !seen.insert(question.id().to_string()) {
            log::warn!("Duplicate question {} in pool", question);
        }
        questions.push(question);
    }
    QuestionPool::new(questions)
}

pub fn load_participants(path: &Path, mail_domain: &str) -> Result<Vec<Participant>> {
    let participants = parse_participants(&read(path)?, mail_domain)?;
    log::info!("Loaded {} participants from {}", participants.len(), path.display());
    Ok(participants)
}

pub fn load_questions(path: &Path) -> Result<QuestionPool> {
    let pool = parse_questions(&read(path)?)?;
    log::info!(
        "Loaded {} questions across {} chapters from {}",
        pool.len(),
        pool.distinct_chapters(),
        path.display()
    );
    Ok(pool)
}
