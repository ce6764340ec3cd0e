//! Interview questions and the pool they are drawn from.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShuffleError};

/// Number of questions asked in one interview.
pub const QUESTIONS_PER_INTERVIEW: usize = 3;

/// An opaque question identifier with an embedded chapter number ("3.12" is chapter 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    id: String,
    chapter: u32,
}

impl Question {
    /// Parse a `"<chapter>.<id>"` token.
    pub fn parse(token: &str) -> Result<Self> {
        let id = token.trim();
        if id.is_empty() {
            return Err(ShuffleError::Validation("blank question identifier".to_string()));
        }
        let prefix = id.split('.').next().unwrap_or(id);
        let chapter = prefix.parse::<u32>().map_err(|_| {
            ShuffleError::Validation(format!("question {:?} does not start with a chapter number", id))
        })?;
        Ok(Self {
            id: id.to_string(),
            chapter,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A validated pool of questions large enough for one interview.
#[derive(Debug, Clone)]
pub struct QuestionPool {
    questions: Vec<Question>,
}

impl QuestionPool {
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        if questions.is_empty() {
            return Err(ShuffleError::Validation("question pool is empty".to_string()));
        }
        if questions.len() < QUESTIONS_PER_INTERVIEW {
            return Err(ShuffleError::Validation(format!(
                "question pool has {} questions, need at least {}",
                questions.len(),
                QUESTIONS_PER_INTERVIEW
            )));
        }
        let pool = Self { questions };
        if pool.distinct_chapters() < QUESTIONS_PER_INTERVIEW {
            log::warn!(
                "Question pool spans only {} chapters; interviews cannot all cover distinct chapters",
                pool.distinct_chapters()
            );
        }
        Ok(pool)
    }

    /// Parse one token per entry.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let questions = tokens
            .iter()
            .map(|t| Question::parse(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(questions)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn distinct_chapters(&self) -> usize {
        self.questions.iter().map(Question::chapter).collect::<BTreeSet<_>>().len()
    }
}
