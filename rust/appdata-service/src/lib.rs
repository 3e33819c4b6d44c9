#![warn(missing_docs)]

//! The AppData resource layer: an authorization-gated accessor over the
//! [appdata_storage] document store.
//!
//! Requests name a resource by path:
//!
//! - `user/<property>`: a property on the caller's own user entity
//! - `user/<collection>[/<id>]`: a sub-collection the caller owns
//! - `data/<app>`: the shared payload of an application
//! - `users`: the registry of users
//! - `gitinfo/<organization>`: a pass-through to the issue tracker
//!
//! [AppData] parses the path into a [Route], checks the caller's level and
//! dispatches. Every failure is an [AppDataError] whose
//! [status](AppDataError::status) tells the transport layer how to answer.

mod error;
pub use error::*;

mod config;
pub use config::*;

mod method;
pub use method::*;

mod request;
pub use request::*;

mod route;
pub use route::*;

mod property;
pub use property::*;

mod registry;
pub use registry::*;

mod collection;
pub use collection::*;

mod proxy;
pub use proxy::*;

mod app;
pub use app::*;

mod cli;
pub use cli::*;
