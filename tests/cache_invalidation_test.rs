//! Cached searches must reflect reservation state after every committed
//! write, even though the TTL has not elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use ulid::Ulid;

use innkeep::model::{Booking, Hotel, Room, RoomType, StayRange};
use innkeep::search::{RoomFilter, SearchService};
use innkeep::{
    InvalidationScope, MemoryBackend, MemoryStore, ReservationManager, ReservationScope as _,
    ReservationStore, SearchCache,
};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

struct World {
    store: Arc<MemoryStore>,
    cache: Arc<SearchCache>,
    manager: ReservationManager,
    search: SearchService,
    hotel_id: Ulid,
    room_id: Ulid,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new(Duration::from_secs(5)));
    let cache = Arc::new(SearchCache::new(
        Arc::new(MemoryBackend::new()),
        Duration::from_secs(900),
    ));
    let manager = ReservationManager::new(store.clone(), cache.clone());
    let search = SearchService::new(store.clone(), cache.clone());

    let hotel = Hotel::new("Grand Miami Resort", "Miami", "1 Ocean Dr");
    let hotel_id = hotel.id;
    store.add_hotel(hotel).unwrap();
    let room = Room::new(hotel_id, "101", RoomType::Double, 15_000, 2);
    let room_id = room.id;
    store.add_room(room).unwrap();

    World {
        store,
        cache,
        manager,
        search,
        hotel_id,
        room_id,
    }
}

fn august_filter(hotel_id: Ulid) -> RoomFilter {
    RoomFilter {
        hotel_id: Some(hotel_id),
        stay: Some(StayRange::new(d("2025-08-10"), d("2025-08-14"))),
        ..RoomFilter::default()
    }
}

#[tokio::test]
async fn booked_out_room_disappears_before_ttl() {
    let w = world();
    let filter = august_filter(w.hotel_id);

    // The last free room shows up, and the result is now cached.
    let before = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].id, w.room_id);

    // Booking it invalidates the cached search.
    w.manager
        .create_booking(
            w.room_id,
            d("2025-08-11"),
            d("2025-08-13"),
            "Guest",
            "guest@example.com",
        )
        .await
        .unwrap();

    let after = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert!(after.is_empty(), "stale cache served a booked-out room");
}

#[tokio::test]
async fn cancellation_restores_room_in_search() {
    let w = world();
    let filter = august_filter(w.hotel_id);

    let booking = w
        .manager
        .create_booking(
            w.room_id,
            d("2025-08-11"),
            d("2025-08-13"),
            "Guest",
            "guest@example.com",
        )
        .await
        .unwrap();
    assert!(
        w.search
            .search_available_rooms(&filter, None)
            .await
            .unwrap()
            .is_empty()
    );

    w.manager.cancel_booking(booking.id).await.unwrap();

    let restored = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].id, w.room_id);
}

#[tokio::test]
async fn hotel_wide_search_is_invalidated_too() {
    let w = world();
    // No hotel filter: the result depends on every candidate room.
    let filter = RoomFilter {
        stay: Some(StayRange::new(d("2025-08-10"), d("2025-08-14"))),
        ..RoomFilter::default()
    };

    let before = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert_eq!(before.len(), 1);

    w.manager
        .create_booking(
            w.room_id,
            d("2025-08-10"),
            d("2025-08-14"),
            "Guest",
            "guest@example.com",
        )
        .await
        .unwrap();

    let after = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn search_is_served_from_cache_until_invalidated() {
    let w = world();
    let filter = august_filter(w.hotel_id);

    let before = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert_eq!(before.len(), 1);

    // Write through the store directly, bypassing the manager and its
    // invalidation hook: the cached result is now stale by design — the
    // cache really is memoizing, not recomputing.
    let mut scope = w.store.lock_and_list_active(w.room_id).await.unwrap();
    scope
        .insert(Booking {
            id: Ulid::new(),
            room_id: w.room_id,
            guest_name: "Backdoor".into(),
            guest_email: "backdoor@example.com".into(),
            stay: StayRange::new(d("2025-08-10"), d("2025-08-14")),
            booked_at: chrono::Utc::now(),
            cancelled: false,
        })
        .await
        .unwrap();
    drop(scope);

    let stale = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert_eq!(stale.len(), 1, "expected the memoized result");

    // A full flush recovers.
    w.cache.invalidate(InvalidationScope::All).await;
    let fresh = w.search.search_available_rooms(&filter, None).await.unwrap();
    assert!(fresh.is_empty());
}
