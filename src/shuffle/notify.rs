//! Human-readable notifications posted as zero-point comments.
//!
//! Messages are kept structured until upload time so links can be rendered
//! against the gradebook's user ids.

use std::fmt;

use crate::domain::{Participant, QUESTIONS_PER_INTERVIEW, Question};

/// Which of the two external assignments a relation or comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssignmentKind {
    /// Interviewee write-up, reviewed by the interviewer
    Assessment,
    /// Interviewer write-up, reviewed by the interviewee
    Feedback,
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentKind::Assessment => write!(f, "assessment"),
            AssignmentKind::Feedback => write!(f, "feedback"),
        }
    }
}

/// A pointer to one participant's submission on one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLink {
    pub assignment: AssignmentKind,
    pub owner: Participant,
}

impl ReviewLink {
    pub fn feedback(owner: &Participant) -> Self {
        Self {
            assignment: AssignmentKind::Feedback,
            owner: owner.clone(),
        }
    }
}

/// Renders review links to URLs. Returns `None` when the owner cannot be resolved.
pub trait LinkFormatter {
    fn format_link(&self, link: &ReviewLink) -> Option<String>;
}

/// One paragraph of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Full briefing sent to every participant on initial scheduling
    Scheduled {
        interviewee: Participant,
        questions: [Question; QUESTIONS_PER_INTERVIEW],
        interviewer: Participant,
        feedback_link: ReviewLink,
    },
    /// Short pointer to the interviewer's feedback submission
    InterviewerAnnounced {
        interviewer: Participant,
        feedback_link: ReviewLink,
    },
    /// Reassignment: this participant has a new interviewer
    NewInterviewer {
        interviewer: Participant,
        feedback_link: ReviewLink,
    },
    /// Reassignment: this participant interviews someone new
    NewInterviewee { interviewee: Participant },
    /// Reassignment notice on the feedback assignment
    InterviewReassigned {
        interviewer: Participant,
        feedback_link: ReviewLink,
    },
}

fn link_text(links: &dyn LinkFormatter, link: &ReviewLink) -> String {
    links
        .format_link(link)
        .unwrap_or_else(|| "(unavailable)".to_string())
}

impl Message {
    pub fn render(&self, links: &dyn LinkFormatter) -> String {
        match self {
            Message::Scheduled {
                interviewee,
                questions,
                interviewer,
                feedback_link,
            } => format!(
                "You will interview: {}\nThe questions to ask: {}  {}  {}\nYou will be interviewed by: {}\n\nThe feedback peer review link is: {}",
                interviewee,
                questions[0],
                questions[1],
                questions[2],
                interviewer,
                link_text(links, feedback_link)
            ),
            Message::InterviewerAnnounced {
                interviewer,
                feedback_link,
            } => format!(
                "You will be interviewed by: {}\nThe feedback link is: {}\n",
                interviewer,
                link_text(links, feedback_link)
            ),
            Message::NewInterviewer {
                interviewer,
                feedback_link,
            } => format!(
                "You have been assigned a new interviewer: {}\nThe feedback peer review link is: {}\n",
                interviewer,
                link_text(links, feedback_link)
            ),
            Message::NewInterviewee { interviewee } => {
                format!("You have been re-assigned to interview: {}", interviewee)
            }
            Message::InterviewReassigned {
                interviewer,
                feedback_link,
            } => format!(
                "Your interview has been re-assigned.\nYour new interviewer is: {}\nThe feedback link is: {}\n",
                interviewer,
                link_text(links, feedback_link)
            ),
        }
    }
}

/// All messages for one participant on one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: Participant,
    pub assignment: AssignmentKind,
    pub messages: Vec<Message>,
}

impl Notification {
    pub fn render(&self, links: &dyn LinkFormatter) -> String {
        self.messages
            .iter()
            .map(|m| m.render(links))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Notifications keyed by `(recipient, assignment)`, in first-touched order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    items: Vec<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, merging with any earlier message for the same recipient and assignment.
    pub fn push(&mut self, recipient: &Participant, assignment: AssignmentKind, message: Message) {
        match self
            .items
            .iter_mut()
            .find(|n| &n.recipient == recipient && n.assignment == assignment)
        {
            Some(existing) => existing.messages.push(message),
            None => self.items.push(Notification {
                recipient: recipient.clone(),
                assignment,
                messages: vec![message],
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    /// Notifications addressed to one participant.
    pub fn for_participant<'a>(&'a self, participant: &'a Participant) -> impl Iterator<Item = &'a Notification> {
        self.items.iter().filter(move |n| &n.recipient == participant)
    }

    pub fn get(&self, recipient: &Participant, assignment: AssignmentKind) -> Option<&Notification> {
        self.items
            .iter()
            .find(|n| &n.recipient == recipient && n.assignment == assignment)
    }

    /// Distinct recipients in first-touched order.
    pub fn recipients(&self) -> Vec<&Participant> {
        let mut out: Vec<&Participant> = Vec::new();
        for n in &self.items {
            if !out.contains(&&n.recipient) {
                out.push(&n.recipient);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLinks;

    impl LinkFormatter for FakeLinks {
        fn format_link(&self, link: &ReviewLink) -> Option<String> {
            if link.owner.as_str() == "ghost" {
                None
            } else {
                Some(format!("https://lms/{}/{}", link.assignment, link.owner))
            }
        }
    }

    fn p(name: &str) -> Participant {
        Participant::new(name).unwrap()
    }

    fn q(id: &str) -> Question {
        Question::parse(id).unwrap()
    }

    #[test]
    fn test_scheduled_render() {
        let message = Message::Scheduled {
            interviewee: p("cam"),
            questions: [q("1.1"), q("2.3"), q("4.2")],
            interviewer: p("ann"),
            feedback_link: ReviewLink::feedback(&p("ann")),
        };
        assert_eq!(
            message.render(&FakeLinks),
            "You will interview: cam\nThe questions to ask: 1.1  2.3  4.2\nYou will be interviewed by: ann\n\nThe feedback peer review link is: https://lms/feedback/ann"
        );
    }

    #[test]
    fn test_unresolvable_link() {
        let message = Message::InterviewerAnnounced {
            interviewer: p("ghost"),
            feedback_link: ReviewLink::feedback(&p("ghost")),
        };
        assert!(message.render(&FakeLinks).contains("(unavailable)"));
    }

    #[test]
    fn test_push_merges_same_recipient_and_assignment() {
        let mut notifications = Notifications::new();
        notifications.push(&p("bob"), AssignmentKind::Assessment, Message::NewInterviewee { interviewee: p("cam") });
        notifications.push(
            &p("bob"),
            AssignmentKind::Assessment,
            Message::NewInterviewer {
                interviewer: p("ann"),
                feedback_link: ReviewLink::feedback(&p("ann")),
            },
        );
        notifications.push(&p("bob"), AssignmentKind::Feedback, Message::NewInterviewee { interviewee: p("cam") });

        assert_eq!(notifications.len(), 2);
        let merged = notifications.get(&p("bob"), AssignmentKind::Assessment).unwrap();
        assert_eq!(merged.messages.len(), 2);
        let text = merged.render(&FakeLinks);
        assert!(text.starts_with("You have been re-assigned to interview: cam\nYou have been assigned a new interviewer: ann"));
        assert_eq!(notifications.recipients(), vec![&p("bob")]);
    }

    #[test]
    fn test_assignment_kind_display() {
        assert_eq!(AssignmentKind::Assessment.to_string(), "assessment");
        assert_eq!(AssignmentKind::Feedback.to_string(), "feedback");
    }
}
