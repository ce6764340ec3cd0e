//! Participant identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShuffleError};

/// Numeric user id assigned by the gradebook service.
pub type UserId = u64;

/// A case-normalized participant identifier.
///
/// Two participants are equal when their normalized forms are equal, so
/// `"Ann"` and `" ann "` name the same person.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Participant(String);

impl Participant {
    /// Normalize a raw identifier (trim + lowercase).
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ShuffleError::Validation("blank participant identifier".to_string()));
        }
        if normalized.chars().any(char::is_whitespace) || normalized.contains(':') {
            return Err(ShuffleError::Validation(format!(
                "participant identifier contains whitespace or ':': {:?}",
                raw
            )));
        }
        Ok(Self(normalized))
    }

    /// Normalize a roster login, stripping the institutional mail suffix if present.
    pub fn from_login(login: &str, mail_domain: &str) -> Result<Self> {
        let lowered = login.trim().to_lowercase();
        let domain = mail_domain.trim().to_lowercase();
        let short = if !domain.is_empty() {
            lowered.strip_suffix(domain.as_str()).unwrap_or(&lowered)
        } else {
            &lowered
        };
        Self::new(short)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Participant {
    type Error = ShuffleError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Participant> for String {
    fn from(value: Participant) -> Self {
        value.0
    }
}
