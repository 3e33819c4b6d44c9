use serde::{Deserialize, Serialize};

use crate::{Level, authorize};

/// A verified principal: who is calling, and at what level (if any)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The email-like identifier of the principal
    pub email: String,
    /// The level name granted to the principal. It is kept as a raw string
    /// so that unknown names survive verification and fail authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl Identity {
    /// An identity holding `level`
    pub fn new(email: impl Into<String>, level: Level) -> Self {
        Self {
            email: email.into(),
            level: Some(level.as_str().to_owned()),
        }
    }

    /// Whether this identity satisfies `required`. An identity without a
    /// level is never authorized.
    pub fn is_authorized(&self, required: Level) -> bool {
        match &self.level {
            Some(held) => authorize(held, required.as_str()),
            None => false,
        }
    }
}
