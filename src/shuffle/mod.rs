//! Peer-interview shuffle scheduling
//!
//! - select: three-question draw with a two-tier chapter diversity policy
//! - ring: random cyclic pairing of participants
//! - relations: assessment/feedback review relations projected from the ring
//! - notify: per-participant notification payloads
//! - reassign: point-wise override of individual pairings

pub mod notify;
pub mod reassign;
pub mod relations;
pub mod ring;
pub mod select;

pub use notify::{AssignmentKind, LinkFormatter, Message, Notification, Notifications, ReviewLink};
pub use reassign::{Directory, LinkChange, Override, OverridePlan, Reassignment, Removal, Skipped, Stage, reassign};
pub use relations::{ReviewPlan, ReviewRelation, build};
pub use ring::{MIN_PARTICIPANTS, Ring, RingEntry, Schedule, schedule};
pub use select::{Diversity, MAX_ATTEMPTS, QuestionSelector, STRICT_ATTEMPTS, Selection};
