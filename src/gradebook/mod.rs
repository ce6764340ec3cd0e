//! Gradebook collaborator
//!
//! The shuffle core never talks to the network itself; everything it needs
//! from the course site goes through the [`Gradebook`] trait:
//! - roster lookup (participant -> user id)
//! - assignment lookup by name
//! - reading, installing and removing peer-review links
//! - posting zero-point comments

pub mod canvas;
pub mod mock;
pub mod roster;

use async_trait::async_trait;

use crate::domain::UserId;
use crate::error::{Result, ShuffleError};

pub use canvas::{CanvasConfig, CanvasGradebook};
pub use mock::{Call, MockGradebook};
pub use roster::Roster;

/// An assignment on the gradebook, identified by numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRef {
    pub id: u64,
    pub name: String,
}

impl AssignmentRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// One active peer review: `reviewer` is assigned to `reviewee`'s submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPair {
    pub reviewee: UserId,
    pub reviewer: UserId,
}

/// Remote gradebook operations used by the shuffle.
#[async_trait]
pub trait Gradebook: Send + Sync {
    /// Active students in the course.
    async fn fetch_roster(&self) -> Result<Roster>;

    /// Resolve an assignment by (partial) name.
    async fn find_assignment(&self, name: &str) -> Result<AssignmentRef>;

    /// Currently assigned peer reviews on an assignment.
    async fn fetch_reviews(&self, assignment: &AssignmentRef) -> Result<Vec<ReviewPair>>;

    /// Register `reviewer` on `reviewee`'s submission.
    async fn install_review_link(&self, assignment: &AssignmentRef, reviewee: UserId, reviewer: UserId) -> Result<()>;

    /// Unregister `reviewers` from `reviewee`'s submission.
    async fn remove_review_link(&self, assignment: &AssignmentRef, reviewee: UserId, reviewers: &[UserId])
    -> Result<()>;

    /// Post a zero-point comment on a participant's submission.
    async fn post_notification(&self, assignment: &AssignmentRef, participant: UserId, comment: &str) -> Result<()>;

    /// URL of `reviewee`'s submission page.
    fn review_link(&self, assignment: &AssignmentRef, reviewee: UserId) -> String;
}

/// Choose an assignment from search results.
///
/// A single match wins; otherwise an exact name match; otherwise the name is
/// missing or ambiguous.
pub fn pick_assignment(name: &str, mut matches: Vec<AssignmentRef>) -> Result<AssignmentRef> {
    if matches.len() == 1 {
        return Ok(matches.remove(0));
    }
    if matches.is_empty() {
        return Err(ShuffleError::Gradebook(format!("{} does not match any assignments", name)));
    }
    let names: Vec<String> = matches.iter().map(|a| a.name.clone()).collect();
    match matches.into_iter().find(|a| a.name == name) {
        Some(exact) => {
            log::info!("Found exact match for '{}', but there are additional partial matches", name);
            Ok(exact)
        }
        None => Err(ShuffleError::Gradebook(format!(
            "{} is ambiguous, and matches: {}",
            name,
            names.join(", ")
        ))),
    }
}
