//! Domain types for peershuffle
//!
//! - Participant: a case-normalized roster identity
//! - Question: a question identifier carrying its chapter number
//! - QuestionPool: the validated set questions are drawn from

pub mod participant;
pub mod question;

pub use participant::{Participant, UserId};
pub use question::{QUESTIONS_PER_INTERVIEW, Question, QuestionPool};
