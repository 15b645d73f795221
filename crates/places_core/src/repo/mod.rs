//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for listings and counters.
//! - Isolate SQLite query details from adapters.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`ListingNotFound`,
//!   `CounterNotFound`) in addition to DB transport errors.
//! - Repositories only accept connections migrated to the latest schema.

pub mod counter_repo;
pub mod cursor;
pub mod error;
pub mod key_allocator;
pub mod listing_repo;
mod schema;
