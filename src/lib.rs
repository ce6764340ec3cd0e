//! Peershuffle - peer-interview shuffle scheduler
//!
//! Peershuffle arranges a class into a single interview ring, draws a
//! chapter-diverse question set for every interview, and mirrors the ring
//! into a gradebook as two peer-review relations with notification comments.

pub mod audit;
pub mod domain;
pub mod error;
pub mod gradebook;
pub mod input;
pub mod publish;
pub mod shuffle;

pub use error::{Result, ShuffleError};
