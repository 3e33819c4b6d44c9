use std::{fmt::Display, str::FromStr};

use crate::AppDataError;

/// The request verbs this service handles. Pre-flight requests never reach
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read
    Get,
    /// Append, merge or create
    Post,
    /// Overwrite
    Put,
    /// Remove
    Delete,
}

impl Method {
    /// The upper-case verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the method may change stored state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl FromStr for Method {
    type Err = AppDataError;

    fn from_str(verb: &str) -> Result<Self, Self::Err> {
        match verb {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(AppDataError::InvalidMethod(other.to_owned())),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
