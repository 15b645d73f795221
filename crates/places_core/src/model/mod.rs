//! Domain model for the listing catalog.
//!
//! # Responsibility
//! - Define the listing record and its embedded amenity/check-in records.
//! - Define the named counter tracked per entity kind.
//!
//! # Invariants
//! - A listing id is assigned by the store exactly once and never reused.
//! - Counters only ever move upward.

pub mod counter;
pub mod listing;
