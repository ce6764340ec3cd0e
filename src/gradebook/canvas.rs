//! Canvas LMS implementation of the gradebook collaborator.
//!
//! Talks to the Canvas REST API with a bearer token. In dry-run mode every
//! mutating call is logged instead of sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{AssignmentRef, Gradebook, ReviewPair, Roster, pick_assignment};
use crate::domain::{Participant, UserId};
use crate::error::{Result, ShuffleError};

/// Large enough that a single page holds a whole course.
const PER_PAGE: &str = "500";

/// Connection settings for one course.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub host: String,
    pub course_id: u64,
    pub token: String,
    pub mail_domain: String,
    pub timeout: Duration,
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
struct RosterUser {
    id: UserId,
    login_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignmentSummary {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PeerReview {
    user_id: Option<UserId>,
    assessor_id: Option<UserId>,
    workflow_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: u64,
}

/// Canvas REST client
pub struct CanvasGradebook {
    client: Client,
    config: CanvasConfig,
}

impl CanvasGradebook {
    pub fn new(config: CanvasConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(ShuffleError::Config("gradebook API token is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShuffleError::Gradebook(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/courses/{}/{}", self.base(), self.config.course_id, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.api_url(path))
            .bearer_auth(&self.config.token)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ShuffleError::Gradebook(format!("{} failed: {}", what, e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShuffleError::Gradebook(format!("{}: HTTP {}: {}", what, status, body)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)], what: &str) -> Result<T> {
        let builder = self.request(Method::GET, path).query(query);
        self.send(builder, what)
            .await?
            .json()
            .await
            .map_err(|e| ShuffleError::Gradebook(format!("{}: unparseable response: {}", what, e)))
    }

    async fn submission_id(&self, assignment: &AssignmentRef, user: UserId) -> Result<u64> {
        let path = format!("assignments/{}/submissions/{}", assignment.id, user);
        let submission: Submission = self
            .get_json(&path, &[], &format!("fetch submission of user {}", user))
            .await?;
        Ok(submission.id)
    }

    fn roster_from_users(&self, users: Vec<RosterUser>) -> Roster {
        let mut roster = Roster::new();
        for user in users {
            let Some(login) = user.login_id else {
                log::warn!("Roster user {} has no login, skipping", user.id);
                continue;
            };
            match Participant::from_login(&login, &self.config.mail_domain) {
                Ok(participant) => roster.insert(participant, user.id),
                Err(e) => log::warn!("Skipping roster login {:?}: {}", login, e),
            }
        }
        roster
    }

    fn simulate(&self, action: &str) -> bool {
        if self.config.dry_run {
            log::info!("dry run: {}", action);
        }
        self.config.dry_run
    }
}

fn assigned_reviews(reviews: Vec<PeerReview>) -> Vec<ReviewPair> {
    reviews
        .into_iter()
        .filter(|r| r.workflow_state.as_deref() == Some("assigned"))
        .filter_map(|r| {
            Some(ReviewPair {
                reviewee: r.user_id?,
                reviewer: r.assessor_id?,
            })
        })
        .collect()
}

#[async_trait]
impl Gradebook for CanvasGradebook {
    async fn fetch_roster(&self) -> Result<Roster> {
        log::debug!("Fetching current roster");
        let users: Vec<RosterUser> = self
            .get_json(
                "users",
                &[
                    ("enrollment_state[]", "active"),
                    ("enrollment_type[]", "student"),
                    ("per_page", PER_PAGE),
                ],
                "fetch roster",
            )
            .await?;
        let roster = self.roster_from_users(users);
        log::info!("Roster has {} active students", roster.len());
        Ok(roster)
    }

    async fn find_assignment(&self, name: &str) -> Result<AssignmentRef> {
        log::debug!("Finding assignment ID by name: {}", name);
        let found: Vec<AssignmentSummary> = self
            .get_json(
                "assignments",
                &[("search_term", name), ("per_page", PER_PAGE)],
                "fetch assignments",
            )
            .await?;
        let matches = found
            .into_iter()
            .map(|a| AssignmentRef::new(a.id, a.name))
            .collect();
        pick_assignment(name, matches)
    }

    async fn fetch_reviews(&self, assignment: &AssignmentRef) -> Result<Vec<ReviewPair>> {
        let path = format!("assignments/{}/peer_reviews", assignment.id);
        let reviews: Vec<PeerReview> = self
            .get_json(&path, &[("per_page", PER_PAGE)], "fetch peer reviews")
            .await?;
        Ok(assigned_reviews(reviews))
    }

    async fn install_review_link(&self, assignment: &AssignmentRef, reviewee: UserId, reviewer: UserId) -> Result<()> {
        if self.simulate(&format!("assign {} to review {} on {}", reviewer, reviewee, assignment.name)) {
            return Ok(());
        }
        let submission = self.submission_id(assignment, reviewee).await?;
        let path = format!("assignments/{}/submissions/{}/peer_reviews", assignment.id, submission);
        let builder = self
            .request(Method::POST, &path)
            .form(&[("user_id", reviewer.to_string())]);
        self.send(builder, "install peer review").await?;
        Ok(())
    }

    async fn remove_review_link(
        &self,
        assignment: &AssignmentRef,
        reviewee: UserId,
        reviewers: &[UserId],
    ) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        if self.simulate(&format!("remove {:?} as reviewers of {} on {}", reviewers, reviewee, assignment.name)) {
            return Ok(());
        }
        let submission = self.submission_id(assignment, reviewee).await?;
        let path = format!("assignments/{}/submissions/{}/peer_reviews", assignment.id, submission);
        for reviewer in reviewers {
            let builder = self
                .request(Method::DELETE, &path)
                .form(&[("user_id", reviewer.to_string())]);
            self.send(builder, "remove peer review").await?;
        }
        Ok(())
    }

    async fn post_notification(&self, assignment: &AssignmentRef, participant: UserId, comment: &str) -> Result<()> {
        if self.simulate(&format!("comment for {} on {}: {:?}", participant, assignment.name, comment)) {
            return Ok(());
        }
        let path = format!("assignments/{}/submissions/{}", assignment.id, participant);
        let builder = self
            .request(Method::PUT, &path)
            .form(&[("comment[text_comment]", comment)]);
        self.send(builder, "post comment").await?;
        Ok(())
    }

    fn review_link(&self, assignment: &AssignmentRef, reviewee: UserId) -> String {
        format!(
            "{}/courses/{}/assignments/{}/submissions/{}",
            self.base(),
            self.config.course_id,
            assignment.id,
            reviewee
        )
    }
}

impl std::fmt::Debug for CanvasGradebook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasGradebook")
            .field("host", &self.config.host)
            .field("course_id", &self.config.course_id)
            .field("dry_run", &self.config.dry_run)
            .finish()
    }
}
