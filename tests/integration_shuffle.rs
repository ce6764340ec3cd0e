//! End-to-end shuffle tests
//!
//! Drives scheduling, logging, publishing and reassignment against the mock gradebook.

use peershuffle::audit::ShuffleLog;
use peershuffle::domain::{Participant, UserId};
use peershuffle::error::Result;
use peershuffle::gradebook::{Call, Gradebook, MockGradebook, Roster};
use peershuffle::input;
use peershuffle::publish::{Assignments, Publisher};
use peershuffle::shuffle::{self, AssignmentKind, Override, QuestionSelector, ReviewRelation, Ring, Schedule, Stage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

const ASSESSMENT: u64 = 100;
const FEEDBACK: u64 = 200;
const STUDENTS: [&str; 6] = ["ann", "bob", "cam", "dee", "eve", "fay"];

fn p(name: &str) -> Participant {
    Participant::new(name).unwrap()
}

fn mock() -> MockGradebook {
    MockGradebook::with_students(&STUDENTS)
        .unwrap()
        .with_assignment(ASSESSMENT, "Shuffle 2 Assessment")
        .with_assignment(FEEDBACK, "Shuffle 2 Feedback")
}

async fn assignments(gradebook: &dyn Gradebook) -> Result<Assignments> {
    Ok(Assignments {
        assessment: gradebook.find_assignment("Shuffle 2 Assessment").await?,
        feedback: gradebook.find_assignment("Shuffle 2 Feedback").await?,
    })
}

async fn current(
    gradebook: &dyn Gradebook,
    roster: &Roster,
    assignments: &Assignments,
    kind: AssignmentKind,
) -> Result<ReviewRelation> {
    let reviews = gradebook.fetch_reviews(assignments.get(kind)).await?;
    Ok(roster.relation_from_reviews(kind, &reviews))
}

fn pool() -> peershuffle::domain::QuestionPool {
    input::parse_questions("1.1\n1.2\n2.1\n2.4\n3.2\n4.1\n5.3\n").unwrap()
}

#[tokio::test]
async fn test_make_flow_installs_one_reviewer_everywhere() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let gradebook = mock();
    let roster = gradebook.fetch_roster().await?;
    let assignments = assignments(&gradebook).await?;

    let mut rng = StdRng::seed_from_u64(2024);
    let schedule = shuffle::schedule(roster.participants(), &pool(), &mut rng)?;

    let log = ShuffleLog::new(temp_dir.path().join("assignments.log"));
    log.append_schedule("Shuffle 2 Assessment", "Shuffle 2 Feedback", &schedule)?;

    let plan = shuffle::build(&schedule);
    let report = Publisher::new(&gradebook, &roster, &assignments)
        .publish_plan(&plan)
        .await;
    assert!(report.is_complete());
    assert_eq!(report.posted, STUDENTS.len());

    for (interviewer, entry) in schedule.iter() {
        let interviewer_id = roster.id_of(interviewer).unwrap();
        let interviewee_id = roster.id_of(&entry.interviewee).unwrap();
        assert_eq!(gradebook.reviewers_of(ASSESSMENT, interviewee_id), vec![interviewer_id]);
        assert_eq!(gradebook.reviewers_of(FEEDBACK, interviewer_id), vec![interviewee_id]);

        let briefing = gradebook.comments_for(ASSESSMENT, interviewer_id);
        assert_eq!(briefing.len(), 1);
        assert!(briefing[0].contains(&format!("You will interview: {}", entry.interviewee)));
        assert!(briefing[0].contains(&format!("You will be interviewed by: {}", entry.my_interviewer)));
        assert_eq!(gradebook.comments_for(FEEDBACK, interviewer_id).len(), 1);
    }

    // The log reproduces the ring that was uploaded.
    let ring = log.read_last_ring()?.unwrap();
    assert_eq!(&ring, schedule.ring());
    Ok(())
}

#[tokio::test]
async fn test_reassign_after_make() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let gradebook = mock();
    let roster = gradebook.fetch_roster().await?;
    let assignments = assignments(&gradebook).await?;

    // ann -> bob -> cam -> dee -> eve -> fay -> ann
    let ring = Ring::from_order(STUDENTS.iter().map(|n| p(n)).collect())?;
    let schedule = Schedule::for_ring(ring, &pool(), &QuestionSelector::new(), &mut StdRng::seed_from_u64(3));
    let publisher = Publisher::new(&gradebook, &roster, &assignments);
    assert!(publisher.publish_plan(&shuffle::build(&schedule)).await.is_complete());

    let assessment = roster.relation_from_reviews(
        AssignmentKind::Assessment,
        &gradebook.fetch_reviews(&assignments.assessment).await?,
    );
    let feedback = roster.relation_from_reviews(
        AssignmentKind::Feedback,
        &gradebook.fetch_reviews(&assignments.feedback).await?,
    );
    assert_eq!(assessment.reviewer_of(&p("cam")), Some(&p("bob")));

    let overrides: Vec<Override> = vec!["ann:cam".parse()?, "ghost:bob".parse()?];
    let reassignment = shuffle::reassign(&overrides, &roster, &assessment, &feedback);
    assert_eq!(reassignment.plans.len(), 1);
    assert_eq!(reassignment.skipped.len(), 1);
    assert_eq!(reassignment.skipped[0].stage, Stage::Resolving);

    let log = ShuffleLog::new(temp_dir.path().join("assignments.log"));
    log.append_schedule("A", "F", &schedule)?;
    log.append_reassignment(&reassignment)?;
    let logged = std::fs::read_to_string(log.path())?;
    assert!(logged.contains("reassigned ann -> cam"));

    let before = gradebook.calls().len();
    let report = publisher.publish_reassignment(&reassignment).await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.posted, 1);
    assert_eq!(report.failures.len(), 1);

    let id = |name: &str| -> UserId { roster.id_of(&p(name)).unwrap() };
    let (ann, bob, cam) = (id("ann"), id("bob"), id("cam"));

    // Stale link removed before the new one is installed, on both assignments.
    let mutations: Vec<Call> = gradebook
        .calls()
        .into_iter()
        .skip(before)
        .filter(|c| !matches!(c, Call::Post { .. }))
        .collect();
    assert_eq!(
        mutations,
        vec![
            Call::Remove {
                assignment: ASSESSMENT,
                reviewee: cam,
                reviewers: vec![bob],
            },
            Call::Install {
                assignment: ASSESSMENT,
                reviewee: cam,
                reviewer: ann,
            },
            Call::Remove {
                assignment: FEEDBACK,
                reviewee: ann,
                reviewers: vec![bob],
            },
            Call::Install {
                assignment: FEEDBACK,
                reviewee: ann,
                reviewer: cam,
            },
        ]
    );
    assert_eq!(gradebook.reviewers_of(ASSESSMENT, cam), vec![ann]);
    assert_eq!(gradebook.reviewers_of(FEEDBACK, ann), vec![cam]);

    let new_interviewer = gradebook.comments_for(ASSESSMENT, cam);
    assert!(
        new_interviewer
            .last()
            .unwrap()
            .contains("You have been assigned a new interviewer: ann")
    );
    Ok(())
}

#[tokio::test]
async fn test_every_submission_single_reviewer_after_overrides() -> Result<()> {
    let gradebook = mock();
    let roster = gradebook.fetch_roster().await?;
    let assignments = assignments(&gradebook).await?;
    let publisher = Publisher::new(&gradebook, &roster, &assignments);

    let schedule = shuffle::schedule(roster.participants(), &pool(), &mut StdRng::seed_from_u64(77))?;
    publisher.publish_plan(&shuffle::build(&schedule)).await;

    let overrides: Vec<Override> = vec!["dee:ann".parse()?, "fay:dee".parse()?, "bob:eve".parse()?];
    let reassignment = shuffle::reassign(
        &overrides,
        &roster,
        &current(&gradebook, &roster, &assignments, AssignmentKind::Assessment).await?,
        &current(&gradebook, &roster, &assignments, AssignmentKind::Feedback).await?,
    );
    assert!(publisher.publish_reassignment(&reassignment).await.is_complete());

    for assignment in [ASSESSMENT, FEEDBACK] {
        for name in STUDENTS {
            let reviewers = gradebook.reviewers_of(assignment, roster.id_of(&p(name)).unwrap());
            assert_eq!(reviewers.len(), 1, "{} has {:?} on {}", name, reviewers, assignment);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_reassign_clears_reviewers_added_outside_the_shuffle() -> Result<()> {
    let gradebook = mock();
    let roster = gradebook.fetch_roster().await?;
    let assignments = assignments(&gradebook).await?;
    let publisher = Publisher::new(&gradebook, &roster, &assignments);

    let ring = Ring::from_order(STUDENTS.iter().map(|n| p(n)).collect())?;
    let schedule = Schedule::for_ring(ring, &pool(), &QuestionSelector::new(), &mut StdRng::seed_from_u64(5));
    assert!(publisher.publish_plan(&shuffle::build(&schedule)).await.is_complete());

    let id = |name: &str| -> UserId { roster.id_of(&p(name)).unwrap() };
    // An instructor added eve by hand next to bob.
    gradebook.seed_review(ASSESSMENT, id("cam"), id("eve"));

    let overrides: Vec<Override> = vec!["ann:cam".parse()?];
    let reassignment = shuffle::reassign(
        &overrides,
        &roster,
        &current(&gradebook, &roster, &assignments, AssignmentKind::Assessment).await?,
        &current(&gradebook, &roster, &assignments, AssignmentKind::Feedback).await?,
    );
    assert!(publisher.publish_reassignment(&reassignment).await.is_complete());

    assert_eq!(gradebook.reviewers_of(ASSESSMENT, id("cam")), vec![id("ann")]);
    assert_eq!(gradebook.reviewers_of(FEEDBACK, id("ann")), vec![id("cam")]);
    for assignment in [ASSESSMENT, FEEDBACK] {
        for name in STUDENTS {
            assert_eq!(gradebook.reviewers_of(assignment, id(name)).len(), 1, "{} on {}", name, assignment);
        }
    }
    Ok(())
}
