//! Named counter model.
//!
//! # Invariants
//! - `count` never decreases; deletions of the counted kind leave it untouched.

use serde::{Deserialize, Serialize};

/// Entity kind under which counters are keyed.
pub const COUNTER_KIND: &str = "Counter";

/// Running total of successful creations for one entity kind.
///
/// This is "total ever created", not "currently stored".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub count: i64,
}
