use appdata_access::{AppDataAccessError, Level};
use appdata_storage::AppDataStorageError;
use thiserror::Error;

use crate::Method;

/// The coarse classification of an [AppDataError], which is all the
/// boundary layer needs to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request is malformed for the resource it addresses
    BadRequest,
    /// No verifiable identity accompanied the request
    Unauthenticated,
    /// The identity's level is insufficient for the route
    Forbidden,
    /// The addressed item or collection does not exist
    NotFound,
    /// A creation was addressed at an item that already has an id
    Conflict,
    /// A method that needs an addressed item was issued against a collection
    MethodNotAllowed,
    /// The document store failed
    Store,
    /// The issue tracker answered with a non-success status
    Upstream,
    /// The service is not configured to satisfy the request
    Configuration,
}

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppDataError {
    /// The request path has no segments
    #[error("Empty request path")]
    EmptyPath,

    /// The route was recognized but a required segment is absent
    #[error("Missing {0} segment in request path")]
    MissingSegment(&'static str),

    /// The first segment of the path names no known route
    #[error("No route for '{0}'")]
    UnknownRoute(String),

    /// The method verb is not one this service handles
    #[error("Unsupported method '{0}'")]
    InvalidMethod(String),

    /// An application id that names another entity of the group
    #[error("Application id '{0}' is reserved")]
    ReservedName(String),

    /// A collection item id is not a positive integer
    #[error("Invalid item id '{0}'")]
    InvalidItemId(String),

    /// The request body is absent or has the wrong shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The users registry was addressed for removal but does not exist
    #[error("The users registry does not exist")]
    MissingRegistry,

    /// The credential could not be verified
    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[from] AppDataAccessError),

    /// The identity does not hold the level the route requires
    #[error("Level {required} is required")]
    Forbidden {
        /// The level the route requires
        required: Level,
    },

    /// The addressed entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A creation was addressed at an existing id
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The method needs an item-addressed key
    #[error("{method} is not allowed on {resource}")]
    MethodNotAllowed {
        /// The method that was issued
        method: Method,
        /// The resource it was issued against
        resource: String,
    },

    /// The document store failed
    #[error("Store error: {0}")]
    Store(#[from] AppDataStorageError),

    /// The issue tracker answered with a non-success status, or could not be
    /// reached at all (reported as 502)
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        /// The status to propagate
        status: u16,
        /// What went wrong
        message: String,
    },

    /// The service is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppDataError {
    /// Classifies this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppDataError::EmptyPath
            | AppDataError::MissingSegment(_)
            | AppDataError::UnknownRoute(_)
            | AppDataError::InvalidMethod(_)
            | AppDataError::ReservedName(_)
            | AppDataError::InvalidItemId(_)
            | AppDataError::InvalidBody(_)
            | AppDataError::MissingRegistry => ErrorKind::BadRequest,
            AppDataError::Store(
                AppDataStorageError::PartialKey(_) | AppDataStorageError::InvalidKey(_),
            ) => ErrorKind::BadRequest,
            AppDataError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AppDataError::Forbidden { .. } => ErrorKind::Forbidden,
            AppDataError::NotFound(_) => ErrorKind::NotFound,
            AppDataError::Conflict(_) => ErrorKind::Conflict,
            AppDataError::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
            AppDataError::Store(_) => ErrorKind::Store,
            AppDataError::Upstream { .. } => ErrorKind::Upstream,
            AppDataError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The HTTP status the boundary layer should answer with. Failed
    /// authentication and authorization look exactly like a missing
    /// resource.
    pub fn status(&self) -> u16 {
        if let AppDataError::Upstream { status, .. } = self {
            return *status;
        }

        match self.kind() {
            ErrorKind::BadRequest | ErrorKind::Store => 400,
            ErrorKind::Unauthenticated | ErrorKind::Forbidden | ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Upstream => 502,
            ErrorKind::Configuration => 500,
        }
    }
}
