//! Point-wise reassignment of interview pairings.
//!
//! Each override `interviewer:interviewee` moves through
//! resolving -> removing-old-link -> installing-new-link -> notifying.
//! Planning here is pure: it patches local copies of both relations and
//! records, per submission, which reviewer the planned relation displaces.
//! Executing the plan is best-effort and happens in [`crate::publish`],
//! which removes whatever reviewers the gradebook actually holds.

use std::fmt;
use std::str::FromStr;

use super::notify::{AssignmentKind, Message, Notifications, ReviewLink};
use super::relations::ReviewRelation;
use crate::domain::{Participant, UserId};
use crate::error::{Result, ShuffleError};

/// Resolves participants against the active roster.
pub trait Directory {
    fn resolve(&self, participant: &Participant) -> Option<UserId>;
}

/// Lifecycle of a single override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    RemovingOldLink,
    InstallingNewLink,
    Notifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::RemovingOldLink => "removing-old-link",
            Stage::InstallingNewLink => "installing-new-link",
            Stage::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// An explicit `interviewer:interviewee` pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub interviewer: Participant,
    pub interviewee: Participant,
}

impl Override {
    pub fn new(interviewer: Participant, interviewee: Participant) -> Self {
        Self {
            interviewer,
            interviewee,
        }
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.interviewer, self.interviewee)
    }
}

impl FromStr for Override {
    type Err = ShuffleError;

    fn from_str(s: &str) -> Result<Self> {
        let (interviewer, interviewee) = s
            .split_once(':')
            .ok_or_else(|| ShuffleError::Validation(format!("expected interviewer:interviewee, got {:?}", s)))?;
        Ok(Self::new(Participant::new(interviewer)?, Participant::new(interviewee)?))
    }
}

/// One submission whose reviewer changes: remove `stale` (if any), then install `reviewer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChange {
    pub assignment: AssignmentKind,
    pub reviewee: Participant,
    pub stale: Option<Participant>,
    pub reviewer: Participant,
}

/// The two submission changes for one resolved override, assessment first,
/// plus the messages to post once both are in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePlan {
    pub pairing: Override,
    pub changes: [LinkChange; 2],
    pub notifications: Notifications,
}

impl OverridePlan {
    /// Participants whose notifications this override regenerates.
    pub fn touched(&self) -> [&Participant; 2] {
        [&self.pairing.interviewer, &self.pairing.interviewee]
    }
}

/// Reviewers to remove from one submission before a new one is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub assignment: AssignmentKind,
    pub reviewee: Participant,
    pub reviewers: Vec<Participant>,
}

/// An override that never got past resolution.
#[derive(Debug, Clone)]
pub struct Skipped {
    pub pairing: Override,
    pub stage: Stage,
    pub reason: String,
}

/// Patched relations plus what must be sent to the gradebook.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub assessment: ReviewRelation,
    pub feedback: ReviewRelation,
    pub plans: Vec<OverridePlan>,
    pub skipped: Vec<Skipped>,
}

impl Reassignment {
    /// Stale reviewers the plans displace, in plan order.
    pub fn removals(&self) -> Vec<Removal> {
        self.plans
            .iter()
            .flat_map(|plan| plan.changes.iter())
            .filter_map(|change| {
                change.stale.as_ref().map(|stale| Removal {
                    assignment: change.assignment,
                    reviewee: change.reviewee.clone(),
                    reviewers: vec![stale.clone()],
                })
            })
            .collect()
    }
}

fn unresolved(directory: &dyn Directory, pairing: &Override) -> Option<String> {
    if directory.resolve(&pairing.interviewer).is_none() {
        return Some(format!("interviewer {} not on roster", pairing.interviewer));
    }
    if directory.resolve(&pairing.interviewee).is_none() {
        return Some(format!("interviewee {} not on roster", pairing.interviewee));
    }
    if pairing.interviewer == pairing.interviewee {
        return Some(format!("{} cannot interview themselves", pairing.interviewer));
    }
    None
}

/// Install `reviewer` on `reviewee` and describe the change.
fn patch(relation: &mut ReviewRelation, reviewee: &Participant, reviewer: &Participant) -> LinkChange {
    let previous = relation.install(reviewee.clone(), reviewer.clone());
    LinkChange {
        assignment: relation.assignment(),
        reviewee: reviewee.clone(),
        stale: previous.filter(|old| old != reviewer),
        reviewer: reviewer.clone(),
    }
}

/// Apply overrides to copies of the current relations.
///
/// Overrides are applied in order, so a later override sees the links
/// installed by an earlier one in the same batch.
pub fn reassign(
    overrides: &[Override],
    directory: &dyn Directory,
    assessment: &ReviewRelation,
    feedback: &ReviewRelation,
) -> Reassignment {
    let mut assessment = assessment.clone();
    let mut feedback = feedback.clone();
    let mut plans = Vec::new();
    let mut skipped = Vec::new();

    for pairing in overrides {
        if let Some(reason) = unresolved(directory, pairing) {
            log::warn!("Skipping override {}: {}", pairing, reason);
            skipped.push(Skipped {
                pairing: pairing.clone(),
                stage: Stage::Resolving,
                reason,
            });
            continue;
        }

        let Override {
            interviewer,
            interviewee,
        } = pairing;

        let assessment_change = patch(&mut assessment, interviewee, interviewer);
        let feedback_change = patch(&mut feedback, interviewer, interviewee);

        let mut notifications = Notifications::new();
        let feedback_link = ReviewLink::feedback(interviewer);
        notifications.push(
            interviewee,
            AssignmentKind::Assessment,
            Message::NewInterviewer {
                interviewer: interviewer.clone(),
                feedback_link: feedback_link.clone(),
            },
        );
        notifications.push(
            interviewer,
            AssignmentKind::Assessment,
            Message::NewInterviewee {
                interviewee: interviewee.clone(),
            },
        );
        notifications.push(
            interviewee,
            AssignmentKind::Feedback,
            Message::InterviewReassigned {
                interviewer: interviewer.clone(),
                feedback_link,
            },
        );

        log::info!("Planned reassignment {}", pairing);
        plans.push(OverridePlan {
            pairing: pairing.clone(),
            changes: [assessment_change, feedback_change],
            notifications,
        });
    }

    Reassignment {
        assessment,
        feedback,
        plans,
        skipped,
    }
}
