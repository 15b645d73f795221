//! Persistence and pagination core for the Our Places listing catalog.
//! This crate is the single source of truth for storage invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, LoggingError};
pub use model::counter::{Counter, COUNTER_KIND};
pub use model::listing::{
    BusinessAttributes, Listing, ListingId, ResultResponse, SelfCheckInMethod, LISTING_KIND,
};
pub use repo::counter_repo::{CounterStore, SqliteCounterRepository, COUNTER_MAX_ATTEMPTS};
pub use repo::error::{RepoError, RepoErrorKind, RepoResult};
pub use repo::listing_repo::{
    ListingPage, ListingRepository, SqliteListingRepository, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

/// Minimal health-check API for adapter wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
