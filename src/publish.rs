//! Upload boundary: push review relations and notifications to the gradebook.
//!
//! Calls are issued sequentially. A failure affects only the pairing (or
//! override) it occurred in; it is recorded in the [`PublishReport`] and
//! processing moves on. Nothing is rolled back. For reassignment, every
//! other reviewer the store holds is removed from a submission before the
//! new reviewer is installed on it, and a failed removal skips the install,
//! so no submission ever gains a second reviewer.

use std::collections::HashMap;
use std::fmt;

use crate::domain::{Participant, UserId};
use crate::error::{Result, ShuffleError};
use crate::gradebook::{AssignmentRef, Gradebook, ReviewPair, Roster};
use crate::shuffle::{
    AssignmentKind, LinkChange, LinkFormatter, Notifications, OverridePlan, Reassignment, ReviewLink, ReviewPlan,
    Stage,
};

/// The two external assignments a shuffle writes to.
#[derive(Debug, Clone)]
pub struct Assignments {
    pub assessment: AssignmentRef,
    pub feedback: AssignmentRef,
}

impl Assignments {
    pub fn get(&self, kind: AssignmentKind) -> &AssignmentRef {
        match kind {
            AssignmentKind::Assessment => &self.assessment,
            AssignmentKind::Feedback => &self.feedback,
        }
    }
}

/// One pairing or override that did not fully reach the gradebook.
#[derive(Debug, Clone)]
pub struct UploadFailure {
    pub participant: Participant,
    pub stage: Stage,
    pub reason: String,
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.participant, self.stage, self.reason)
    }
}

/// Outcome of a publish run.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub attempted: usize,
    pub posted: usize,
    pub failures: Vec<UploadFailure>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.attempted == self.posted
    }

    fn fail(&mut self, participant: &Participant, stage: Stage, reason: impl Into<String>) {
        let failure = UploadFailure {
            participant: participant.clone(),
            stage,
            reason: reason.into(),
        };
        log::error!("Upload failed: {}", failure);
        self.failures.push(failure);
    }
}

/// Reviewers currently on each submission, as last confirmed by the gradebook.
#[derive(Debug, Clone, Default)]
pub struct LiveReviews {
    reviewers: HashMap<(AssignmentKind, UserId), Vec<UserId>>,
}

impl LiveReviews {
    pub fn extend(&mut self, kind: AssignmentKind, reviews: &[ReviewPair]) {
        for pair in reviews {
            self.install(kind, pair.reviewee, pair.reviewer);
        }
    }

    pub fn reviewers_of(&self, kind: AssignmentKind, reviewee: UserId) -> &[UserId] {
        self.reviewers.get(&(kind, reviewee)).map(Vec::as_slice).unwrap_or(&[])
    }

    fn install(&mut self, kind: AssignmentKind, reviewee: UserId, reviewer: UserId) {
        let reviewers = self.reviewers.entry((kind, reviewee)).or_default();
        if !reviewers.contains(&reviewer) {
            reviewers.push(reviewer);
        }
    }

    fn remove(&mut self, kind: AssignmentKind, reviewee: UserId, removed: &[UserId]) {
        if let Some(reviewers) = self.reviewers.get_mut(&(kind, reviewee)) {
            reviewers.retain(|r| !removed.contains(r));
        }
    }
}

struct Links<'a> {
    gradebook: &'a dyn Gradebook,
    roster: &'a Roster,
    assignments: &'a Assignments,
}

impl LinkFormatter for Links<'_> {
    fn format_link(&self, link: &ReviewLink) -> Option<String> {
        self.roster
            .id_of(&link.owner)
            .map(|id| self.gradebook.review_link(self.assignments.get(link.assignment), id))
    }
}

/// Sequential, best-effort uploader
pub struct Publisher<'a> {
    gradebook: &'a dyn Gradebook,
    roster: &'a Roster,
    assignments: &'a Assignments,
}

impl<'a> Publisher<'a> {
    pub fn new(gradebook: &'a dyn Gradebook, roster: &'a Roster, assignments: &'a Assignments) -> Self {
        Self {
            gradebook,
            roster,
            assignments,
        }
    }

    fn links(&self) -> Links<'a> {
        Links {
            gradebook: self.gradebook,
            roster: self.roster,
            assignments: self.assignments,
        }
    }

    fn resolve(&self, participant: &Participant) -> Result<UserId> {
        self.roster
            .id_of(participant)
            .ok_or_else(|| ShuffleError::Resolution(format!("{} not on roster", participant)))
    }

    async fn notify(&self, notifications: &Notifications, participant: &Participant) -> Result<()> {
        let id = self.resolve(participant)?;
        let links = self.links();
        for notification in notifications.for_participant(participant) {
            let assignment = self.assignments.get(notification.assignment);
            let text = notification.render(&links);
            self.gradebook
                .post_notification(assignment, id, &text)
                .await
                .map_err(|e| ShuffleError::Upload(format!("{} comment for {}: {}", notification.assignment, participant, e)))?;
        }
        Ok(())
    }

    async fn install(&self, kind: AssignmentKind, reviewee: &Participant, reviewer: &Participant) -> Result<()> {
        let reviewee_id = self.resolve(reviewee)?;
        let reviewer_id = self.resolve(reviewer)?;
        self.gradebook
            .install_review_link(self.assignments.get(kind), reviewee_id, reviewer_id)
            .await
            .map_err(|e| ShuffleError::Upload(format!("{} link {} -> {}: {}", kind, reviewer, reviewee, e)))
    }

    /// Upload a freshly built plan: both review links and the notifications of each interviewer.
    pub async fn publish_plan(&self, plan: &ReviewPlan) -> PublishReport {
        let mut report = PublishReport::default();

        for (interviewer, interviewee) in plan.feedback.iter() {
            report.attempted += 1;

            if let Err(e) = self.resolve(interviewer).and(self.resolve(interviewee)) {
                report.fail(interviewer, Stage::Resolving, e.to_string());
                continue;
            }

            let Some(assessor) = plan.assessment.reviewer_of(interviewee) else {
                report.fail(interviewee, Stage::InstallingNewLink, "no assessment reviewer in plan");
                continue;
            };
            if let Err(e) = self.install(AssignmentKind::Assessment, interviewee, assessor).await {
                report.fail(interviewer, Stage::InstallingNewLink, e.to_string());
                continue;
            }
            if let Err(e) = self.install(AssignmentKind::Feedback, interviewer, interviewee).await {
                report.fail(interviewer, Stage::InstallingNewLink, e.to_string());
                continue;
            }
            if let Err(e) = self.notify(&plan.notifications, interviewer).await {
                report.fail(interviewer, Stage::Notifying, e.to_string());
                continue;
            }

            log::info!("Published {} -> {}", interviewer, interviewee);
            report.posted += 1;
        }

        report
    }

    async fn fetch_live(&self) -> Result<LiveReviews> {
        let mut live = LiveReviews::default();
        for kind in [AssignmentKind::Assessment, AssignmentKind::Feedback] {
            let reviews = self.gradebook.fetch_reviews(self.assignments.get(kind)).await?;
            live.extend(kind, &reviews);
        }
        Ok(live)
    }

    fn names(&self, ids: &[UserId]) -> String {
        ids.iter()
            .map(|id| match self.roster.participant_for(*id) {
                Some(participant) => participant.to_string(),
                None => id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Remove every other reviewer the store holds for the submission, then install the new one.
    async fn apply_change(
        &self,
        change: &LinkChange,
        live: &mut LiveReviews,
    ) -> std::result::Result<(), (Stage, ShuffleError)> {
        let kind = change.assignment;
        let assignment = self.assignments.get(kind);
        let reviewee = self.resolve(&change.reviewee).map_err(|e| (Stage::Resolving, e))?;
        let reviewer = self.resolve(&change.reviewer).map_err(|e| (Stage::Resolving, e))?;

        let stale: Vec<UserId> = live
            .reviewers_of(kind, reviewee)
            .iter()
            .copied()
            .filter(|&id| id != reviewer)
            .collect();
        if !stale.is_empty() {
            self.gradebook
                .remove_review_link(assignment, reviewee, &stale)
                .await
                .map_err(|e| {
                    let reason = format!("remove {} from {} {}: {}", self.names(&stale), kind, change.reviewee, e);
                    (Stage::RemovingOldLink, ShuffleError::Upload(reason))
                })?;
            live.remove(kind, reviewee, &stale);
        }

        if live.reviewers_of(kind, reviewee).contains(&reviewer) {
            log::debug!("{} already reviews {} {}", change.reviewer, kind, change.reviewee);
            return Ok(());
        }
        self.install(kind, &change.reviewee, &change.reviewer)
            .await
            .map_err(|e| (Stage::InstallingNewLink, e))?;
        live.install(kind, reviewee, reviewer);
        Ok(())
    }

    async fn apply_override(
        &self,
        plan: &OverridePlan,
        live: &mut LiveReviews,
    ) -> std::result::Result<(), (Stage, ShuffleError)> {
        for change in &plan.changes {
            self.apply_change(change, live).await?;
        }
        for participant in plan.touched() {
            self.notify(&plan.notifications, participant)
                .await
                .map_err(|e| (Stage::Notifying, e))?;
        }
        Ok(())
    }

    /// Upload a reassignment, one override at a time.
    ///
    /// Stale reviewers are taken from the gradebook's current reviews, tracked
    /// as calls succeed, so a failed override never misleads a later one. The
    /// first failing stage ends that override; stages already completed stay
    /// applied, and its notifications are only posted once both links are in place.
    pub async fn publish_reassignment(&self, reassignment: &Reassignment) -> PublishReport {
        let mut report = PublishReport::default();

        for skipped in &reassignment.skipped {
            report.attempted += 1;
            report.fail(&skipped.pairing.interviewer, skipped.stage, skipped.reason.clone());
        }
        if reassignment.plans.is_empty() {
            return report;
        }

        let mut live = match self.fetch_live().await {
            Ok(live) => live,
            Err(e) => {
                for plan in &reassignment.plans {
                    report.attempted += 1;
                    report.fail(
                        &plan.pairing.interviewer,
                        Stage::RemovingOldLink,
                        format!("current reviews unavailable: {}", e),
                    );
                }
                return report;
            }
        };

        for plan in &reassignment.plans {
            report.attempted += 1;
            match self.apply_override(plan, &mut live).await {
                Ok(()) => {
                    log::info!("Reassigned {}", plan.pairing);
                    report.posted += 1;
                }
                Err((stage, e)) => report.fail(&plan.pairing.interviewer, stage, e.to_string()),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuestionPool;
    use crate::gradebook::{Call, MockGradebook};
    use crate::shuffle::{Override, QuestionSelector, Ring, Schedule, build, reassign};
    use std::collections::HashSet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ASSESSMENT: u64 = 100;
    const FEEDBACK: u64 = 200;

    fn p(name: &str) -> Participant {
        Participant::new(name).unwrap()
    }

    fn assignments() -> Assignments {
        Assignments {
            assessment: AssignmentRef::new(ASSESSMENT, "Shuffle Assessment"),
            feedback: AssignmentRef::new(FEEDBACK, "Shuffle Feedback"),
        }
    }

    /// ann=1, bob=2, cam=3; ring bob -> cam -> ann.
    fn three_plan() -> ReviewPlan {
        let ring = Ring::from_order(vec![p("bob"), p("cam"), p("ann")]).unwrap();
        let pool = QuestionPool::parse(&["1.1", "2.1", "3.1"]).unwrap();
        let schedule = Schedule::for_ring(ring, &pool, &QuestionSelector::new(), &mut StdRng::seed_from_u64(1));
        build(&schedule)
    }

    /// ann=1, bob=2, cam=3, dee=4; ring bob -> cam -> ann -> dee, already published.
    async fn four_ring() -> (MockGradebook, ReviewPlan) {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam", "dee"]).unwrap();
        let ring = Ring::from_order(vec![p("bob"), p("cam"), p("ann"), p("dee")]).unwrap();
        let pool = QuestionPool::parse(&["1.1", "2.1", "3.1"]).unwrap();
        let schedule = Schedule::for_ring(ring, &pool, &QuestionSelector::new(), &mut StdRng::seed_from_u64(1));
        let plan = build(&schedule);
        let assignments = assignments();
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_plan(&plan)
            .await;
        assert!(report.is_complete());
        (mock, plan)
    }

    fn assert_single_reviewers(mock: &MockGradebook, users: u64) {
        for assignment in [ASSESSMENT, FEEDBACK] {
            for user in 1..=users {
                let reviewers = mock.reviewers_of(assignment, user);
                assert!(reviewers.len() <= 1, "user {} on {} has {:?}", user, assignment, reviewers);
            }
        }
    }

    #[tokio::test]
    async fn test_publish_plan_installs_both_relations() {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam"]).unwrap();
        let assignments = assignments();
        let publisher = Publisher::new(&mock, mock.roster(), &assignments);

        let report = publisher.publish_plan(&three_plan()).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.posted, 3);
        assert!(report.is_complete());

        // cam's assessment reviewed by bob, bob's feedback reviewed by cam.
        assert_eq!(mock.reviewers_of(ASSESSMENT, 3), vec![2]);
        assert_eq!(mock.reviewers_of(FEEDBACK, 2), vec![3]);
        for user in 1..=3 {
            assert_eq!(mock.reviewers_of(ASSESSMENT, user).len(), 1);
            assert_eq!(mock.reviewers_of(FEEDBACK, user).len(), 1);
        }

        let briefing = mock.comments_for(ASSESSMENT, 2);
        assert_eq!(briefing.len(), 1);
        assert!(briefing[0].starts_with("You will interview: cam\n"));
        assert!(briefing[0].contains("You will be interviewed by: ann"));
        assert!(briefing[0].ends_with("mock://assignments/200/submissions/1"));
        assert_eq!(mock.comments_for(FEEDBACK, 2).len(), 1);
    }

    #[tokio::test]
    async fn test_publish_plan_continues_after_failure() {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam"]).unwrap();
        mock.fail_posts_for(1);
        let assignments = assignments();
        let publisher = Publisher::new(&mock, mock.roster(), &assignments);

        let report = publisher.publish_plan(&three_plan()).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.posted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].participant, p("ann"));
        assert_eq!(report.failures[0].stage, Stage::Notifying);
    }

    #[tokio::test]
    async fn test_publish_plan_reports_unknown_participant() {
        let mock = MockGradebook::with_students(&["ann", "bob"]).unwrap();
        let assignments = assignments();
        let publisher = Publisher::new(&mock, mock.roster(), &assignments);

        let report = publisher.publish_plan(&three_plan()).await;
        assert_eq!(report.attempted, 3);
        // Every pairing touches cam either as interviewer or interviewee, except ann -> bob.
        assert_eq!(report.posted, 1);
        assert!(report.failures.iter().all(|f| f.stage == Stage::Resolving));
    }

    #[tokio::test]
    async fn test_reassignment_removes_before_install() {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam"]).unwrap();
        let assignments = assignments();
        let plan = three_plan();
        {
            let publisher = Publisher::new(&mock, mock.roster(), &assignments);
            publisher.publish_plan(&plan).await;
        }
        let before = mock.calls().len();

        let overrides: Vec<Override> = vec!["ann:cam".parse().unwrap()];
        let reassignment = reassign(&overrides, mock.roster(), &plan.assessment, &plan.feedback);
        let publisher = Publisher::new(&mock, mock.roster(), &assignments);
        let report = publisher.publish_reassignment(&reassignment).await;
        assert!(report.is_complete());

        let calls = &mock.calls()[before..];
        let remove_at = calls
            .iter()
            .position(|c| matches!(c, Call::Remove { assignment: ASSESSMENT, reviewee: 3, reviewers } if reviewers == &vec![2]))
            .unwrap();
        let install_at = calls
            .iter()
            .position(|c| matches!(c, Call::Install { assignment: ASSESSMENT, reviewee: 3, reviewer: 1 }))
            .unwrap();
        assert!(remove_at < install_at);
        assert_eq!(mock.reviewers_of(ASSESSMENT, 3), vec![1]);
        assert_eq!(mock.reviewers_of(FEEDBACK, 1), vec![3]);

        // Only cam and ann are notified.
        let notified: HashSet<UserId> = calls
            .iter()
            .filter_map(|c| match c {
                Call::Post { participant, .. } => Some(*participant),
                _ => None,
            })
            .collect();
        assert_eq!(notified, HashSet::from([1, 3]));
    }

    #[tokio::test]
    async fn test_failed_removal_skips_install() {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam"]).unwrap();
        let assignments = assignments();
        let plan = three_plan();
        Publisher::new(&mock, mock.roster(), &assignments)
            .publish_plan(&plan)
            .await;
        mock.fail_removals_for(3);

        let reassignment = reassign(
            &["ann:cam".parse().unwrap()],
            mock.roster(),
            &plan.assessment,
            &plan.feedback,
        );
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_reassignment(&reassignment)
            .await;

        assert_eq!(report.posted, 0);
        assert_eq!(report.failures[0].stage, Stage::RemovingOldLink);
        // The old link survives and no second reviewer was added.
        assert_eq!(mock.reviewers_of(ASSESSMENT, 3), vec![2]);
    }

    #[tokio::test]
    async fn test_skipped_override_is_reported() {
        let mock = MockGradebook::with_students(&["ann", "bob", "cam"]).unwrap();
        let assignments = assignments();
        let plan = three_plan();
        let reassignment = reassign(
            &["ghost:bob".parse().unwrap()],
            mock.roster(),
            &plan.assessment,
            &plan.feedback,
        );
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_reassignment(&reassignment)
            .await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.posted, 0);
        assert_eq!(report.failures[0].stage, Stage::Resolving);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reassignment_removes_every_extra_reviewer() {
        let (mock, plan) = four_ring().await;
        // dee was also put on cam's assessment by hand.
        mock.seed_review(ASSESSMENT, 3, 4);
        let before = mock.calls().len();

        let reassignment = reassign(&["ann:cam".parse().unwrap()], mock.roster(), &plan.assessment, &plan.feedback);
        let assignments = assignments();
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_reassignment(&reassignment)
            .await;

        assert!(report.is_complete());
        assert_eq!(mock.reviewers_of(ASSESSMENT, 3), vec![1]);
        assert_eq!(mock.reviewers_of(FEEDBACK, 1), vec![3]);
        let removed: HashSet<UserId> = mock.calls()[before..]
            .iter()
            .filter_map(|c| match c {
                Call::Remove {
                    assignment: ASSESSMENT,
                    reviewee: 3,
                    reviewers,
                } => Some(reviewers.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(removed, HashSet::from([2, 4]));
        assert_single_reviewers(&mock, 4);
    }

    #[tokio::test]
    async fn test_failed_override_does_not_mislead_later_override() {
        let (mock, plan) = four_ring().await;
        mock.fail_removals_for(3);

        let overrides: Vec<Override> = vec!["ann:cam".parse().unwrap(), "ann:bob".parse().unwrap()];
        let reassignment = reassign(&overrides, mock.roster(), &plan.assessment, &plan.feedback);
        let assignments = assignments();
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_reassignment(&reassignment)
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.posted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, Stage::RemovingOldLink);

        // cam keeps bob; the second override replaced dee, not the cam it planned around.
        assert_eq!(mock.reviewers_of(ASSESSMENT, 3), vec![2]);
        assert_eq!(mock.reviewers_of(ASSESSMENT, 2), vec![1]);
        assert_eq!(mock.reviewers_of(FEEDBACK, 1), vec![2]);
        assert_single_reviewers(&mock, 4);
    }

    #[tokio::test]
    async fn test_failed_override_posts_no_notifications() {
        let (mock, plan) = four_ring().await;
        mock.fail_removals_for(2);

        let overrides: Vec<Override> = vec!["ann:cam".parse().unwrap(), "ann:bob".parse().unwrap()];
        let reassignment = reassign(&overrides, mock.roster(), &plan.assessment, &plan.feedback);
        let assignments = assignments();
        let report = Publisher::new(&mock, mock.roster(), &assignments)
            .publish_reassignment(&reassignment)
            .await;

        assert_eq!(report.posted, 1);
        assert_eq!(report.failures[0].stage, Stage::RemovingOldLink);
        assert_eq!(mock.reviewers_of(ASSESSMENT, 2), vec![4]);

        let ann = mock.comments_for(ASSESSMENT, 1);
        assert_eq!(ann.last().unwrap(), "You have been re-assigned to interview: cam");
        assert!(ann.iter().all(|c| !c.contains("interview: bob")));
        // bob only has the original briefing.
        assert_eq!(mock.comments_for(ASSESSMENT, 2).len(), 1);
    }
}
