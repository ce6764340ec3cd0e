//! Review relations projected from a schedule.
//!
//! Both relations are derived views of one ring: the assessment relation
//! maps each interviewee to their interviewer, the feedback relation maps
//! each interviewer to their interviewee.

use std::collections::BTreeMap;

use super::notify::{AssignmentKind, Message, Notifications, ReviewLink};
use super::ring::Schedule;
use crate::domain::Participant;

/// Reviewee -> reviewer for one assignment. Each reviewee has at most one reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRelation {
    assignment: AssignmentKind,
    links: BTreeMap<Participant, Participant>,
}

impl ReviewRelation {
    pub fn new(assignment: AssignmentKind) -> Self {
        Self {
            assignment,
            links: BTreeMap::new(),
        }
    }

    pub fn assignment(&self) -> AssignmentKind {
        self.assignment
    }

    /// Set the reviewer of `reviewee`, returning the reviewer it displaced.
    pub fn install(&mut self, reviewee: Participant, reviewer: Participant) -> Option<Participant> {
        self.links.insert(reviewee, reviewer)
    }

    pub fn remove(&mut self, reviewee: &Participant) -> Option<Participant> {
        self.links.remove(reviewee)
    }

    pub fn reviewer_of(&self, reviewee: &Participant) -> Option<&Participant> {
        self.links.get(reviewee)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Participant, &Participant)> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// True when every participant is a key exactly once and every key is a participant.
    pub fn is_total_over(&self, participants: &[Participant]) -> bool {
        self.links.len() == participants.len() && participants.iter().all(|p| self.links.contains_key(p))
    }
}

/// The two relations plus every participant's notifications.
#[derive(Debug, Clone)]
pub struct ReviewPlan {
    pub assessment: ReviewRelation,
    pub feedback: ReviewRelation,
    pub notifications: Notifications,
}

/// Project a schedule into review relations and notifications.
pub fn build(schedule: &Schedule) -> ReviewPlan {
    let mut assessment = ReviewRelation::new(AssignmentKind::Assessment);
    let mut feedback = ReviewRelation::new(AssignmentKind::Feedback);
    let mut notifications = Notifications::new();

    for (interviewer, entry) in schedule.iter() {
        assessment.install(entry.interviewee.clone(), interviewer.clone());
        feedback.install(interviewer.clone(), entry.interviewee.clone());

        let feedback_link = ReviewLink::feedback(&entry.my_interviewer);
        notifications.push(
            interviewer,
            AssignmentKind::Assessment,
            Message::Scheduled {
                interviewee: entry.interviewee.clone(),
                questions: entry.questions.clone(),
                interviewer: entry.my_interviewer.clone(),
                feedback_link: feedback_link.clone(),
            },
        );
        notifications.push(
            interviewer,
            AssignmentKind::Feedback,
            Message::InterviewerAnnounced {
                interviewer: entry.my_interviewer.clone(),
                feedback_link,
            },
        );
    }

    ReviewPlan {
        assessment,
        feedback,
        notifications,
    }
}
