use places_core::db::open_db_in_memory;
use places_core::{Listing, ListingId, ListingRepository, SqliteListingRepository, DEFAULT_PAGE_SIZE};
use rusqlite::Connection;
use std::collections::HashSet;

fn seed(repo: &impl ListingRepository, count: usize) -> Vec<ListingId> {
    (0..count)
        .map(|index| {
            repo.create_listing(&Listing::new(format!("listing-{index}")))
                .unwrap()
        })
        .collect()
}

fn drain_pages(repo: &impl ListingRepository, page_size: usize) -> (Vec<ListingId>, usize) {
    let mut seen = Vec::new();
    let mut cursor = String::new();
    let mut calls = 0;
    loop {
        let page = repo.list_listings(page_size, &cursor).unwrap();
        calls += 1;
        assert!(page.listings.len() <= page_size);
        seen.extend(page.listings.iter().map(|listing| listing.id));
        if !page.has_more() {
            return (seen, calls);
        }
        cursor = page.next;
        assert!(calls < 100, "pagination did not terminate");
    }
}

#[test]
fn empty_store_returns_empty_page_without_cursor() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();

    let page = repo.list_listings(10, "").unwrap();
    assert!(page.listings.is_empty());
    assert_eq!(page.next, "");
}

#[test]
fn three_listings_split_over_two_pages() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 3);

    let first = repo.list_listings(2, "").unwrap();
    assert_eq!(first.listings.len(), 2);
    assert!(!first.next.is_empty());

    let second = repo.list_listings(2, &first.next).unwrap();
    assert_eq!(second.listings.len(), 1);
    assert_eq!(second.next, "");

    let listed: Vec<_> = first
        .listings
        .iter()
        .chain(second.listings.iter())
        .map(|listing| listing.id)
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn paging_visits_every_listing_once_at_page_size_edges() {
    let page_size = 3;
    for count in [0, 1, page_size, page_size + 1, 2 * page_size + 1] {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteListingRepository::try_new(&conn).unwrap();
        let ids = seed(&repo, count);

        let (seen, _) = drain_pages(&repo, page_size);

        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len(), "duplicate ids for count={count}");
        assert_eq!(seen, ids, "wrong listings for count={count}");
    }
}

#[test]
fn full_final_page_does_not_hand_out_a_cursor() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    seed(&repo, 4);

    let (seen, calls) = drain_pages(&repo, 2);
    assert_eq!(seen.len(), 4);
    assert_eq!(calls, 2);
}

#[test]
fn listed_records_carry_ids_from_storage_keys() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 2);

    let page = repo.list_listings(10, "").unwrap();
    for (listing, id) in page.listings.iter().zip(ids) {
        assert_eq!(listing.id, id);
        assert_eq!(repo.get_listing(id).unwrap(), *listing);
    }
}

#[test]
fn garbage_cursor_restarts_from_beginning() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    seed(&repo, 3);

    let fresh = repo.list_listings(2, "").unwrap();
    for garbage in ["not a cursor", "%%%", "eyJ2Ijo5fQ", "   "] {
        let page = repo.list_listings(2, garbage).unwrap();
        assert_eq!(page, fresh, "cursor {garbage:?} should restart the scan");
    }
}

#[test]
fn cursor_stays_valid_when_rows_are_deleted_between_pages() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 5);

    let first = repo.list_listings(2, "").unwrap();
    repo.delete_listing(ids[1]).unwrap();
    repo.delete_listing(ids[2]).unwrap();

    let second = repo.list_listings(2, &first.next).unwrap();
    let listed: Vec<_> = second.listings.iter().map(|listing| listing.id).collect();
    assert_eq!(listed, vec![ids[3], ids[4]]);
    assert_eq!(second.next, "");
}

#[test]
fn zero_page_size_uses_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    seed(&repo, DEFAULT_PAGE_SIZE + 1);

    let page = repo.list_listings(0, "").unwrap();
    assert_eq!(page.listings.len(), DEFAULT_PAGE_SIZE);
    assert!(page.has_more());
}

#[test]
fn corrupt_row_truncates_page_without_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 5);
    corrupt_flag(&conn, ids[2]);

    let page = repo.list_listings(10, "").unwrap();
    let listed: Vec<_> = page.listings.iter().map(|listing| listing.id).collect();
    assert_eq!(listed, vec![ids[0], ids[1]]);
    assert!(page.has_more());

    let after = repo.list_listings(10, &page.next).unwrap();
    let listed: Vec<_> = after.listings.iter().map(|listing| listing.id).collect();
    assert_eq!(listed, vec![ids[3], ids[4]]);
    assert_eq!(after.next, "");
}

#[test]
fn paging_skips_only_the_corrupt_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 5);
    corrupt_flag(&conn, ids[2]);

    let (seen, _) = drain_pages(&repo, 2);
    assert_eq!(seen, vec![ids[0], ids[1], ids[3], ids[4]]);
}

#[test]
fn corrupt_first_row_still_hands_out_a_cursor() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 3);
    corrupt_flag(&conn, ids[0]);

    let page = repo.list_listings(10, "").unwrap();
    assert!(page.listings.is_empty());
    assert!(page.has_more());

    let after = repo.list_listings(10, &page.next).unwrap();
    let listed: Vec<_> = after.listings.iter().map(|listing| listing.id).collect();
    assert_eq!(listed, vec![ids[1], ids[2]]);
}

#[test]
fn corrupt_row_still_fails_point_lookup() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteListingRepository::try_new(&conn).unwrap();
    let ids = seed(&repo, 1);
    corrupt_flag(&conn, ids[0]);

    let err = repo.get_listing(ids[0]).unwrap_err();
    assert_eq!(err.kind(), places_core::RepoErrorKind::InvalidData);
}

fn corrupt_flag(conn: &Connection, id: ListingId) {
    conn.execute("UPDATE listings SET is_active = 7 WHERE id = ?1;", [id])
        .unwrap();
}
