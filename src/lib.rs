//! Inventory back-office client.
//!
//! The core is a paged query cache ([`cache::QueryClient`] and the hooks in
//! [`query`]) in front of thin entity services for the backoffice API, plus a
//! token store and the session projected from it.

pub mod backoffice;
pub mod cache;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod session;

pub use backoffice::Backoffice;
pub use cache::{CacheKey, Policy, PolicyTable, QueryClient};
pub use config::Config;
pub use error::{QueryError, ServiceError};
pub use query::{Page, PageRequest, PageState, PageView, PagedQuery, Query, QueryView};
