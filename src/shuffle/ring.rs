//! The interview ring.
//!
//! A ring is an owned, ordered sequence of participants. Position `i`
//! interviews position `(i + 1) mod N` and is interviewed by position
//! `(i - 1 + N) mod N`, so the interviewee relation is a single N-cycle.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use super::select::{QuestionSelector, Selection};
use crate::domain::{Participant, QUESTIONS_PER_INTERVIEW, Question, QuestionPool};
use crate::error::{Result, ShuffleError};

/// Smallest ring that forms a cycle without fixed points.
pub const MIN_PARTICIPANTS: usize = 2;

/// An ordered cycle of distinct participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    members: Vec<Participant>,
}

impl Ring {
    /// Build a ring in exactly the given order.
    pub fn from_order(members: Vec<Participant>) -> Result<Self> {
        if members.len() < MIN_PARTICIPANTS {
            return Err(ShuffleError::Validation(format!(
                "need at least {} participants for a shuffle, got {}",
                MIN_PARTICIPANTS,
                members.len()
            )));
        }
        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if !seen.insert(member) {
                return Err(ShuffleError::Validation(format!("duplicate participant: {}", member)));
            }
        }
        Ok(Self { members })
    }

    /// Build a ring from a uniformly random permutation of `participants`.
    pub fn shuffled<R: Rng + ?Sized>(mut participants: Vec<Participant>, rng: &mut R) -> Result<Self> {
        participants.shuffle(rng);
        Self::from_order(participants)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    pub fn position_of(&self, participant: &Participant) -> Option<usize> {
        self.members.iter().position(|m| m == participant)
    }

    /// Index of the participant interviewed by position `i`.
    pub fn interviewee_index(&self, i: usize) -> usize {
        (i + 1) % self.members.len()
    }

    /// Index of the participant who interviews position `i`.
    pub fn interviewer_index(&self, i: usize) -> usize {
        (i + self.members.len() - 1) % self.members.len()
    }
}

/// Everything one participant needs to know about their interviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingEntry {
    pub interviewee: Participant,
    pub my_interviewer: Participant,
    pub questions: [Question; QUESTIONS_PER_INTERVIEW],
}

/// A ring plus the entry derived for every position.
///
/// `entries[i]` belongs to `ring.members()[i]`.
#[derive(Debug, Clone)]
pub struct Schedule {
    ring: Ring,
    entries: Vec<RingEntry>,
}

impl Schedule {
    /// Derive entries for an existing ring, drawing questions per position.
    pub fn for_ring<R: Rng + ?Sized>(
        ring: Ring,
        pool: &QuestionPool,
        selector: &QuestionSelector,
        rng: &mut R,
    ) -> Self {
        let entries = (0..ring.len())
            .map(|i| {
                let Selection { questions, .. } = selector.select(pool, rng);
                RingEntry {
                    interviewee: ring.members[ring.interviewee_index(i)].clone(),
                    my_interviewer: ring.members[ring.interviewer_index(i)].clone(),
                    questions,
                }
            })
            .collect();
        Self { ring, entries }
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for one interviewer.
    pub fn get(&self, interviewer: &Participant) -> Option<&RingEntry> {
        self.ring.position_of(interviewer).map(|i| &self.entries[i])
    }

    /// `(interviewer, entry)` pairs in ring order.
    pub fn iter(&self) -> impl Iterator<Item = (&Participant, &RingEntry)> {
        self.ring.members.iter().zip(self.entries.iter())
    }
}

/// Shuffle `participants` into a ring and draw questions for every pairing.
pub fn schedule<R: Rng + ?Sized>(
    participants: Vec<Participant>,
    pool: &QuestionPool,
    rng: &mut R,
) -> Result<Schedule> {
    let ring = Ring::shuffled(participants, rng)?;
    log::info!("Shuffled {} participants into a ring", ring.len());
    Ok(Schedule::for_ring(ring, pool, &QuestionSelector::new(), rng))
}
