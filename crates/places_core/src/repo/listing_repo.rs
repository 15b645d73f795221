//! Listing repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/delete over the `listings` table.
//! - Provide cursor-paged scans in ascending id order.
//! - Bump the `Listing` counter after each committed create.
//!
//! # Invariants
//! - Id allocation and row insert commit in one transaction: a failed or
//!   abandoned create leaves neither an id nor a row behind.
//! - `id` is read back from the row key, never from a stored body field.
//! - A failed counter increment never unwinds a committed listing.
//! - List never reports scan or cursor errors to the caller; it returns the
//!   rows it managed to read and logs the rest. A row whose body fails to
//!   decode is skipped by the next cursor.

use super::counter_repo::{CounterStore, SqliteCounterRepository};
use super::cursor::{PageCursor, ScanShape};
use super::error::{RepoError, RepoResult};
use super::key_allocator::allocate_id;
use super::schema::ensure_connection_ready;
use crate::model::listing::{
    BusinessAttributes, Listing, ListingId, SelfCheckInMethod, LISTING_KIND,
};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::time::Instant;

/// Page size used when the caller passes `0`.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest page a single list call returns.
pub const MAX_PAGE_SIZE: usize = 1000;

const LISTING_SCAN: ScanShape = ScanShape {
    kind: LISTING_KIND,
    order: "id_asc",
};

const LISTING_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "property_type",
    "room_type",
    "num_guests",
    "num_bedrooms",
    "num_beds",
    "is_active",
    "num_stars",
    "has_essentials",
    "has_shampoo",
    "has_wifi",
    "has_hangers",
    "has_iron",
    "has_hair_dryer",
    "has_laptop_workspace",
    "has_smoke_detector",
    "has_co_detector",
    "is_no_smoking",
    "is_no_pets",
    "self_check_in_name",
    "self_check_in_description",
];

const LISTING_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    property_type,
    room_type,
    num_guests,
    num_bedrooms,
    num_beds,
    is_active,
    num_stars,
    has_essentials,
    has_shampoo,
    has_wifi,
    has_hangers,
    has_iron,
    has_hair_dryer,
    has_laptop_workspace,
    has_smoke_detector,
    has_co_detector,
    is_no_smoking,
    is_no_pets,
    self_check_in_name,
    self_check_in_description
FROM listings";

/// One page of a listing scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    /// Token for the following page; empty when there are no further pages.
    pub next: String,
}

impl ListingPage {
    /// Returns whether `next` should be fed into another list call.
    pub fn has_more(&self) -> bool {
        !self.next.is_empty()
    }
}

/// Repository interface for listing persistence.
pub trait ListingRepository {
    /// Persists a new listing and returns its store-assigned id.
    ///
    /// `listing.id` is ignored.
    fn create_listing(&self, listing: &Listing) -> RepoResult<ListingId>;
    /// Loads one listing; `ListingNotFound` when absent.
    fn get_listing(&self, id: ListingId) -> RepoResult<Listing>;
    /// Removes one listing; `ListingNotFound` when absent.
    fn delete_listing(&self, id: ListingId) -> RepoResult<()>;
    /// Returns up to `page_size` listings after the position in `cursor`.
    ///
    /// An empty or undecodable `cursor` starts from the first listing. A page
    /// may be short without an error when the scan hit a storage fault.
    fn list_listings(&self, page_size: usize, cursor: &str) -> RepoResult<ListingPage>;
}

/// SQLite-backed listing repository.
pub struct SqliteListingRepository<'conn, C = SqliteCounterRepository<'conn>> {
    conn: &'conn Connection,
    counters: C,
}

impl<'conn> SqliteListingRepository<'conn> {
    /// Creates repository from migrated connection, counting into the same
    /// database.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let counters = SqliteCounterRepository::try_new(conn)?;
        Self::with_counter_store(conn, counters)
    }
}

impl<'conn, C: CounterStore> SqliteListingRepository<'conn, C> {
    /// Creates repository from migrated connection and an explicit counter
    /// store.
    pub fn with_counter_store(conn: &'conn Connection, counters: C) -> RepoResult<Self> {
        ensure_connection_ready(conn, "listings", LISTING_COLUMNS)?;
        Ok(Self { conn, counters })
    }

    /// Returns the number of listings ever created, `0` before the first one.
    ///
    /// Deletes do not lower this value.
    pub fn count_listings(&self) -> RepoResult<i64> {
        match self.counters.get(LISTING_KIND) {
            Ok(count) => Ok(count),
            Err(RepoError::CounterNotFound(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }
}

impl<C: CounterStore> ListingRepository for SqliteListingRepository<'_, C> {
    fn create_listing(&self, listing: &Listing) -> RepoResult<ListingId> {
        let started_at = Instant::now();

        let id = match insert_listing(self.conn, listing) {
            Ok(id) => id,
            Err(err) => {
                error!(
                    "event=listing_create module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        if let Err(err) = self.counters.increment(LISTING_KIND) {
            warn!(
                "event=listing_create module=repo status=partial id={} error_code=counter_increment_failed error={}",
                id, err
            );
        }

        info!(
            "event=listing_create module=repo status=ok id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(id)
    }

    fn get_listing(&self, id: ListingId) -> RepoResult<Listing> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LISTING_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_listing_row(row);
        }

        debug!("event=listing_get module=repo status=not_found id={id}");
        Err(RepoError::ListingNotFound(id))
    }

    fn delete_listing(&self, id: ListingId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let key: Option<ListingId> = tx
            .query_row("SELECT id FROM listings WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(key) = key else {
            debug!("event=listing_delete module=repo status=not_found id={id}");
            return Err(RepoError::ListingNotFound(id));
        };

        tx.execute("DELETE FROM listings WHERE id = ?1;", [key])?;
        tx.commit()?;

        info!("event=listing_delete module=repo status=ok id={key}");
        Ok(())
    }

    fn list_listings(&self, page_size: usize, cursor: &str) -> RepoResult<ListingPage> {
        let started_at = Instant::now();
        let page_size = normalize_page_size(page_size);
        let after_key = resume_position(cursor);
        // One extra row tells a full final page apart from a page with more
        // rows behind it.
        let fetch_limit = i64::try_from(page_size + 1).unwrap_or(i64::MAX);

        let mut stmt = match after_key {
            Some(_) => self.conn.prepare(&format!(
                "{LISTING_SELECT_SQL} WHERE id > ?1 ORDER BY id ASC LIMIT ?2;"
            ))?,
            None => self
                .conn
                .prepare(&format!("{LISTING_SELECT_SQL} ORDER BY id ASC LIMIT ?1;"))?,
        };
        let mut rows = match after_key {
            Some(after_key) => stmt.query(params![after_key, fetch_limit])?,
            None => stmt.query([fetch_limit])?,
        };

        let mut listings = Vec::with_capacity(page_size.min(DEFAULT_PAGE_SIZE));
        let mut exhausted = false;
        let mut scan_error = None;
        let mut skipped_key = None;
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    exhausted = true;
                    break;
                }
                Err(err) => {
                    scan_error = Some(RepoError::from(err));
                    break;
                }
            };
            if listings.len() == page_size {
                break;
            }
            match parse_listing_row(row) {
                Ok(listing) => listings.push(listing),
                Err(err) => {
                    // Bad body, readable key: the next page starts past it.
                    skipped_key = row.get::<_, ListingId>("id").ok();
                    scan_error = Some(err);
                    break;
                }
            }
        }

        let next = match (&scan_error, skipped_key, listings.last()) {
            (None, _, _) if exhausted => String::new(),
            (_, Some(key), _) => PageCursor::after(LISTING_SCAN, key).encode(),
            (_, None, Some(last)) => PageCursor::after(LISTING_SCAN, last.id).encode(),
            (_, None, None) => String::new(),
        };

        if let Some(err) = scan_error {
            error!(
                "event=listing_list module=repo status=partial returned={} page_size={} skipped_id={} duration_ms={} error={}",
                listings.len(),
                page_size,
                skipped_key.map_or_else(|| "none".to_string(), |key| key.to_string()),
                started_at.elapsed().as_millis(),
                err
            );
        } else {
            debug!(
                "event=listing_list module=repo status=ok returned={} page_size={} exhausted={} duration_ms={}",
                listings.len(),
                page_size,
                exhausted,
                started_at.elapsed().as_millis()
            );
        }

        Ok(ListingPage { listings, next })
    }
}

fn insert_listing(conn: &Connection, listing: &Listing) -> RepoResult<ListingId> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let id = allocate_id(&tx, LISTING_KIND)?;
    let amenities = &listing.business_attributes;
    let check_in = &listing.self_check_in_method;

    tx.execute(
        "INSERT INTO listings (
            id,
            name,
            description,
            property_type,
            room_type,
            num_guests,
            num_bedrooms,
            num_beds,
            is_active,
            num_stars,
            has_essentials,
            has_shampoo,
            has_wifi,
            has_hangers,
            has_iron,
            has_hair_dryer,
            has_laptop_workspace,
            has_smoke_detector,
            has_co_detector,
            is_no_smoking,
            is_no_pets,
            self_check_in_name,
            self_check_in_description
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
        );",
        params![
            id,
            listing.name.as_str(),
            listing.description.as_str(),
            listing.property_type.as_str(),
            listing.room_type.as_str(),
            listing.num_guests,
            listing.num_bedrooms,
            listing.num_beds,
            bool_to_int(listing.is_active),
            listing.num_stars,
            bool_to_int(amenities.has_essentials),
            bool_to_int(amenities.has_shampoo),
            bool_to_int(amenities.has_wifi),
            bool_to_int(amenities.has_hangers),
            bool_to_int(amenities.has_iron),
            bool_to_int(amenities.has_hair_dryer),
            bool_to_int(amenities.has_laptop_workspace),
            bool_to_int(amenities.has_smoke_detector),
            bool_to_int(amenities.has_co_detector),
            bool_to_int(amenities.is_no_smoking),
            bool_to_int(amenities.is_no_pets),
            check_in.name.as_str(),
            check_in.description.as_str(),
        ],
    )?;
    tx.commit()?;

    Ok(id)
}

fn normalize_page_size(page_size: usize) -> usize {
    match page_size {
        0 => DEFAULT_PAGE_SIZE,
        size => size.min(MAX_PAGE_SIZE),
    }
}

/// Decodes `cursor`, falling back to the start of the scan.
fn resume_position(cursor: &str) -> Option<ListingId> {
    if cursor.trim().is_empty() {
        return None;
    }

    match PageCursor::decode(cursor, LISTING_SCAN) {
        Ok(cursor) => Some(cursor.after_key()),
        Err(err) => {
            warn!("event=listing_list module=repo status=cursor_reset error={err}");
            None
        }
    }
}

fn parse_listing_row(row: &Row<'_>) -> RepoResult<Listing> {
    let business_attributes = BusinessAttributes {
        has_essentials: parse_flag(row, "has_essentials")?,
        has_shampoo: parse_flag(row, "has_shampoo")?,
        has_wifi: parse_flag(row, "has_wifi")?,
        has_hangers: parse_flag(row, "has_hangers")?,
        has_iron: parse_flag(row, "has_iron")?,
        has_hair_dryer: parse_flag(row, "has_hair_dryer")?,
        has_laptop_workspace: parse_flag(row, "has_laptop_workspace")?,
        has_smoke_detector: parse_flag(row, "has_smoke_detector")?,
        has_co_detector: parse_flag(row, "has_co_detector")?,
        is_no_smoking: parse_flag(row, "is_no_smoking")?,
        is_no_pets: parse_flag(row, "is_no_pets")?,
    };

    Ok(Listing {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        property_type: row.get("property_type")?,
        room_type: row.get("room_type")?,
        num_guests: parse_integer(row, "num_guests")?,
        num_bedrooms: parse_integer(row, "num_bedrooms")?,
        num_beds: parse_integer(row, "num_beds")?,
        is_active: parse_flag(row, "is_active")?,
        num_stars: parse_integer(row, "num_stars")?,
        business_attributes,
        self_check_in_method: SelfCheckInMethod {
            name: row.get("self_check_in_name")?,
            description: row.get("self_check_in_description")?,
        },
    })
}

fn parse_flag(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in listings.{column}"
        ))),
    }
}

fn parse_integer<T: TryFrom<i64>>(row: &Row<'_>, column: &'static str) -> RepoResult<T> {
    let value: i64 = row.get(column)?;
    T::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("out-of-range value `{value}` in listings.{column}"))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_page_size, resume_position, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

    #[test]
    fn page_size_zero_uses_default_and_large_values_are_capped() {
        assert_eq!(normalize_page_size(0), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(7), 7);
        assert_eq!(normalize_page_size(MAX_PAGE_SIZE + 1), MAX_PAGE_SIZE);
    }

    #[test]
    fn unusable_cursor_restarts_scan() {
        assert_eq!(resume_position(""), None);
        assert_eq!(resume_position("   "), None);
        assert_eq!(resume_position("definitely-not-a-cursor"), None);
    }
}
