//! Course roster: the participant directory.

use std::collections::{BTreeMap, HashMap};

use super::ReviewPair;
use crate::domain::{Participant, UserId};
use crate::shuffle::{AssignmentKind, Directory, ReviewRelation};

/// Bidirectional participant <-> user id map of active students.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    by_participant: BTreeMap<Participant, UserId>,
    by_id: HashMap<UserId, Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Participant, UserId)>) -> Self {
        let mut roster = Self::new();
        for (participant, id) in entries {
            roster.insert(participant, id);
        }
        roster
    }

    pub fn insert(&mut self, participant: Participant, id: UserId) {
        if let Some(previous) = self.by_participant.insert(participant.clone(), id) {
            log::warn!("Roster entry {} re-mapped from {} to {}", participant, previous, id);
            self.by_id.remove(&previous);
        }
        self.by_id.insert(id, participant);
    }

    pub fn id_of(&self, participant: &Participant) -> Option<UserId> {
        self.by_participant.get(participant).copied()
    }

    pub fn participant_for(&self, id: UserId) -> Option<&Participant> {
        self.by_id.get(&id)
    }

    /// All participants, sorted.
    pub fn participants(&self) -> Vec<Participant> {
        self.by_participant.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_participant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_participant.is_empty()
    }

    /// Translate remote peer reviews into a relation.
    ///
    /// Reviews involving users not on the roster (e.g. dropped students) are
    /// ignored. A reviewee with several reviewers keeps the first one seen.
    pub fn relation_from_reviews(&self, assignment: AssignmentKind, reviews: &[ReviewPair]) -> ReviewRelation {
        let mut relation = ReviewRelation::new(assignment);
        for pair in reviews {
            let (Some(reviewee), Some(reviewer)) = (self.participant_for(pair.reviewee), self.participant_for(pair.reviewer))
            else {
                log::debug!("Ignoring {} review {} -> {} outside roster", assignment, pair.reviewer, pair.reviewee);
                continue;
            };
            if let Some(existing) = relation.reviewer_of(reviewee) {
                log::warn!(
                    "{} submission of {} already reviewed by {}, ignoring extra reviewer {}",
                    assignment,
                    reviewee,
                    existing,
                    reviewer
                );
                continue;
            }
            relation.install(reviewee.clone(), reviewer.clone());
        }
        relation
    }
}

impl Directory for Roster {
    fn resolve(&self, participant: &Participant) -> Option<UserId> {
        self.id_of(participant)
    }
}
