#![warn(missing_docs)]

//! Authorization for AppData: the ordered [Level]s a principal may hold, the
//! verified [Identity] a request carries, and the [TokenVerifier] that turns
//! an `Authorization: Bearer <jwt>` header into one.
//!
//! ```rust
//! use appdata_access::{Identity, Level, authorize};
//!
//! assert!(authorize("admin", "readwrite"));
//! assert!(!authorize("readonly", "admin"));
//!
//! let identity = Identity::new("alice@example.com", Level::ReadOnly);
//! assert!(identity.is_authorized(Level::ReadOnly));
//! assert!(!identity.is_authorized(Level::ReadWrite));
//! ```

mod error;
pub use error::*;

mod level;
pub use level::*;

mod identity;
pub use identity::*;

mod token;
pub use token::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
