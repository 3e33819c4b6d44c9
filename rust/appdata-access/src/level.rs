use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Ordinal assigned to level names that are not recognized. It is lower than
/// every real level, so an unknown level never satisfies a requirement.
pub const UNKNOWN_ORDINAL: i8 = -1;

/// An ordered authorization tier: `readonly < readwrite < admin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// May read
    ReadOnly,
    /// May read and modify their own data
    ReadWrite,
    /// May do anything, including managing the users registry
    Admin,
}

impl Level {
    /// The position of this level in the ordering
    pub fn ordinal(&self) -> i8 {
        match self {
            Level::ReadOnly => 0,
            Level::ReadWrite => 1,
            Level::Admin => 2,
        }
    }

    /// The canonical lowercase name of this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::ReadOnly => "readonly",
            Level::ReadWrite => "readwrite",
            Level::Admin => "admin",
        }
    }

    /// Whether holding this level satisfies `required`
    pub fn satisfies(&self, required: Level) -> bool {
        self.ordinal() >= required.ordinal()
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "readonly" => Ok(Level::ReadOnly),
            "readwrite" => Ok(Level::ReadWrite),
            "admin" => Ok(Level::Admin),
            other => Err(format!("Unknown level '{other}'")),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a level name to its ordinal; unknown names map to [UNKNOWN_ORDINAL]
pub fn ordinal(name: &str) -> i8 {
    name.parse::<Level>()
        .map(|level| level.ordinal())
        .unwrap_or(UNKNOWN_ORDINAL)
}

/// Decides whether a held level (by name) satisfies a required level (by
/// name). An unknown held level never satisfies anything, even an unknown
/// requirement.
pub fn authorize(held: &str, required: &str) -> bool {
    let held = ordinal(held);
    held > UNKNOWN_ORDINAL && held >= ordinal(required)
}
