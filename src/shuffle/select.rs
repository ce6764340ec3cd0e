//! Question selection for a single interview.
//!
//! Draws three questions from the pool, preferring three distinct chapters.
//! The first [`STRICT_ATTEMPTS`] draws require pairwise-distinct chapters; the
//! remaining draws up to [`MAX_ATTEMPTS`] only reject a triple whose chapters
//! are all identical. If nothing qualifies the last draw is used as-is.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::{QUESTIONS_PER_INTERVIEW, Question, QuestionPool};

/// Total number of draws before giving up on diversity.
pub const MAX_ATTEMPTS: usize = 32;

/// Draws that must produce three distinct chapters to be accepted.
pub const STRICT_ATTEMPTS: usize = 24;

/// How diverse an accepted triple turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diversity {
    /// Three pairwise-distinct chapters
    Distinct,
    /// At least two chapters, accepted during the relaxed phase
    Mixed,
    /// All from one chapter; every attempt was exhausted
    Degenerate,
}

/// The questions drawn for one interview.
#[derive(Debug, Clone)]
pub struct Selection {
    pub questions: [Question; QUESTIONS_PER_INTERVIEW],
    pub attempts: usize,
    pub diversity: Diversity,
}

/// Classify a triple by its chapters.
pub fn diversity_of(questions: &[Question; QUESTIONS_PER_INTERVIEW]) -> Diversity {
    let [a, b, c] = questions.each_ref().map(Question::chapter);
    if a != b && b != c && a != c {
        Diversity::Distinct
    } else if a == b && b == c {
        Diversity::Degenerate
    } else {
        Diversity::Mixed
    }
}

/// Draws question triples from a pool.
#[derive(Debug, Clone)]
pub struct QuestionSelector {
    max_attempts: usize,
    strict_attempts: usize,
}

impl Default for QuestionSelector {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            strict_attempts: STRICT_ATTEMPTS,
        }
    }
}

impl QuestionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw three questions. Never fails; degrades to the last draw.
    pub fn select<R: Rng + ?Sized>(&self, pool: &QuestionPool, rng: &mut R) -> Selection {
        let mut scratch: Vec<Question> = pool.questions().to_vec();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let (drawn, _) = scratch.partial_shuffle(rng, QUESTIONS_PER_INTERVIEW);
            let questions = [drawn[0].clone(), drawn[1].clone(), drawn[2].clone()];
            let diversity = diversity_of(&questions);

            let accepted = match diversity {
                Diversity::Distinct => true,
                Diversity::Mixed => attempts > self.strict_attempts,
                Diversity::Degenerate => false,
            };

            if accepted || attempts >= self.max_attempts {
                if !accepted {
                    log::debug!("No diverse triple after {} attempts, using last draw", attempts);
                }
                return Selection {
                    questions,
                    attempts,
                    diversity,
                };
            }
        }
    }
}
