//! In-memory gradebook that records every call.
//!
//! Keeps a live view of peer reviews per assignment so callers can check
//! the single-reviewer invariant after a run, and can be told to fail
//! specific operations to exercise best-effort paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AssignmentRef, Gradebook, ReviewPair, Roster, pick_assignment};
use crate::domain::{Participant, UserId};
use crate::error::{Result, ShuffleError};

/// A recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Install {
        assignment: u64,
        reviewee: UserId,
        reviewer: UserId,
    },
    Remove {
        assignment: u64,
        reviewee: UserId,
        reviewers: Vec<UserId>,
    },
    Post {
        assignment: u64,
        participant: UserId,
        comment: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Install,
    Remove,
    Post,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock gradebook backed by in-memory state
#[derive(Debug, Default)]
pub struct MockGradebook {
    roster: Roster,
    assignments: Vec<AssignmentRef>,
    reviews: Mutex<HashMap<u64, Vec<ReviewPair>>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<(Op, UserId)>>,
}

impl MockGradebook {
    /// Roster of `names` with user ids 1, 2, 3, ... in order.
    pub fn with_students(names: &[&str]) -> Result<Self> {
        let mut roster = Roster::new();
        for (i, name) in names.iter().enumerate() {
            roster.insert(Participant::new(name)?, i as UserId + 1);
        }
        Ok(Self {
            roster,
            ..Self::default()
        })
    }

    pub fn with_assignment(mut self, id: u64, name: &str) -> Self {
        self.assignments.push(AssignmentRef::new(id, name));
        self
    }

    /// Seed an existing peer review.
    pub fn seed_review(&self, assignment: u64, reviewee: UserId, reviewer: UserId) {
        lock(&self.reviews)
            .entry(assignment)
            .or_default()
            .push(ReviewPair { reviewee, reviewer });
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn fail_installs_for(&self, reviewee: UserId) {
        lock(&self.failures).insert((Op::Install, reviewee));
    }

    pub fn fail_removals_for(&self, reviewee: UserId) {
        lock(&self.failures).insert((Op::Remove, reviewee));
    }

    pub fn fail_posts_for(&self, participant: UserId) {
        lock(&self.failures).insert((Op::Post, participant));
    }

    /// Every recorded mutation, in call order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Current reviewers of `reviewee`'s submission.
    pub fn reviewers_of(&self, assignment: u64, reviewee: UserId) -> Vec<UserId> {
        lock(&self.reviews)
            .get(&assignment)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|p| p.reviewee == reviewee)
                    .map(|p| p.reviewer)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Comments posted to one participant on one assignment.
    pub fn comments_for(&self, assignment: u64, participant: UserId) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                Call::Post {
                    assignment: a,
                    participant: p,
                    comment,
                } if *a == assignment && *p == participant => Some(comment.clone()),
                _ => None,
            })
            .collect()
    }

    fn check(&self, op: Op, user: UserId) -> Result<()> {
        if lock(&self.failures).contains(&(op, user)) {
            return Err(ShuffleError::Gradebook(format!("simulated {:?} failure for user {}", op, user)));
        }
        Ok(())
    }
}

#[async_trait]
impl Gradebook for MockGradebook {
    async fn fetch_roster(&self) -> Result<Roster> {
        Ok(self.roster.clone())
    }

    async fn find_assignment(&self, name: &str) -> Result<AssignmentRef> {
        let matches = self
            .assignments
            .iter()
            .filter(|a| a.name.contains(name))
            .cloned()
            .collect();
        pick_assignment(name, matches)
    }

    async fn fetch_reviews(&self, assignment: &AssignmentRef) -> Result<Vec<ReviewPair>> {
        Ok(lock(&self.reviews).get(&assignment.id).cloned().unwrap_or_default())
    }

    async fn install_review_link(&self, assignment: &AssignmentRef, reviewee: UserId, reviewer: UserId) -> Result<()> {
        self.check(Op::Install, reviewee)?;
        lock(&self.calls).push(Call::Install {
            assignment: assignment.id,
            reviewee,
            reviewer,
        });
        let mut reviews = lock(&self.reviews);
        let pairs = reviews.entry(assignment.id).or_default();
        let pair = ReviewPair { reviewee, reviewer };
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
        Ok(())
    }

    async fn remove_review_link(
        &self,
        assignment: &AssignmentRef,
        reviewee: UserId,
        reviewers: &[UserId],
    ) -> Result<()> {
        self.check(Op::Remove, reviewee)?;
        lock(&self.calls).push(Call::Remove {
            assignment: assignment.id,
            reviewee,
            reviewers: reviewers.to_vec(),
        });
        if let Some(pairs) = lock(&self.reviews).get_mut(&assignment.id) {
            pairs.retain(|p| !(p.reviewee == reviewee && reviewers.contains(&p.reviewer)));
        }
        Ok(())
    }

    async fn post_notification(&self, assignment: &AssignmentRef, participant: UserId, comment: &str) -> Result<()> {
        self.check(Op::Post, participant)?;
        lock(&self.calls).push(Call::Post {
            assignment: assignment.id,
            participant,
            comment: comment.to_string(),
        });
        Ok(())
    }

    fn review_link(&self, assignment: &AssignmentRef, reviewee: UserId) -> String {
        format!("mock://assignments/{}/submissions/{}", assignment.id, reviewee)
    }
}
