//! Listing domain model.
//!
//! # Responsibility
//! - Define the canonical listing record exchanged with callers.
//! - Keep the external camelCase wire naming in one place.
//!
//! # Invariants
//! - `id` is `0` until the store assigns one on create.
//! - `id` is never part of the stored body; reads fill it from the row key.

use serde::{Deserialize, Serialize};

/// Store-assigned listing identifier.
pub type ListingId = i64;

/// Entity kind under which listings are keyed and counted.
pub const LISTING_KIND: &str = "Listing";

/// Boolean amenity flags for business-type listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessAttributes {
    pub has_essentials: bool,
    pub has_shampoo: bool,
    pub has_wifi: bool,
    pub has_hangers: bool,
    pub has_iron: bool,
    pub has_hair_dryer: bool,
    pub has_laptop_workspace: bool,
    pub has_smoke_detector: bool,
    pub has_co_detector: bool,
    pub is_no_smoking: bool,
    pub is_no_pets: bool,
}

/// How guests check themselves in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfCheckInMethod {
    pub name: String,
    pub description: String,
}

/// A property listing.
///
/// No field is validated by the store; shape is the only contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    /// Populated from the storage key. Ignored on create.
    pub id: ListingId,
    pub name: String,
    pub description: String,
    pub property_type: String,
    pub room_type: String,
    pub num_guests: u32,
    pub num_bedrooms: u32,
    pub num_beds: u32,
    pub is_active: bool,
    pub num_stars: i8,
    pub business_attributes: BusinessAttributes,
    /// Serialized under the plural name external clients already use.
    #[serde(rename = "selfCheckInMethods")]
    pub self_check_in_method: SelfCheckInMethod,
}

impl Listing {
    /// Creates an unsaved listing with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a copy carrying the given store-assigned id.
    pub fn with_id(mut self, id: ListingId) -> Self {
        self.id = id;
        self
    }

    /// Returns whether the store has assigned an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

/// Acknowledgement envelope for destructive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub is_successful: bool,
}
