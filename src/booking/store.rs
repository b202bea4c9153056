use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::limits::{MAX_BOOKINGS_PER_ROOM, MAX_HOTEL_NAME_LEN, MAX_ROOM_NUMBER_LEN};
use crate::model::{Booking, Hotel, Room, RoomReservations};

use super::BookingError;

pub type SharedRoomReservations = Arc<RwLock<RoomReservations>>;

/// Exclusive scope over one room's reservation set. While a scope is alive,
/// no other create or cancel on the same room can proceed. Dropping the
/// scope releases the room.
#[async_trait]
pub trait ReservationScope: Send {
    fn room_id(&self) -> Ulid;

    /// Snapshot of active bookings, in check-in order.
    fn active(&self) -> Vec<Booking>;

    /// Commit a booking. Only reachable while holding the scope.
    async fn insert(&mut self, booking: Booking) -> Result<Booking, BookingError>;
}

/// Boundary to the transactional record store. Exclusivity lives here, not
/// in the callers: any implementation must make `lock_and_list_active`
/// serialize create/cancel per room (row lock, serializable transaction, or
/// CAS loop all satisfy the contract).
///
/// Infrastructure failure (store unreachable, lock timeout) surfaces as
/// `StoreUnavailable` — never as "no conflict".
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Acquire the room's exclusive scope. Unknown room → `NotFound`
    /// (the scope is never acquired); bounded wait → `StoreUnavailable`.
    async fn lock_and_list_active(
        &self,
        room_id: Ulid,
    ) -> Result<Box<dyn ReservationScope>, BookingError>;

    /// Flip the soft-delete flag under the room's scope. Idempotent:
    /// cancelling an already-cancelled booking is a no-op success.
    /// Returns the booking's room id.
    async fn mark_cancelled(&self, booking_id: Ulid) -> Result<Ulid, BookingError>;

    // Plain reads — no locking needed; Hotel/Room metadata is read-only
    // to this core.

    fn get_hotel(&self, id: Ulid) -> Option<Hotel>;
    fn get_room(&self, id: Ulid) -> Option<Room>;
    fn hotels(&self) -> Vec<Hotel>;
    fn rooms(&self) -> Vec<Room>;
    fn rooms_of_hotel(&self, hotel_id: Ulid) -> Vec<Room>;

    /// Shared-read snapshot of a room's active bookings.
    async fn active_bookings(&self, room_id: Ulid) -> Result<Vec<Booking>, BookingError>;

    async fn find_booking(&self, booking_id: Ulid) -> Result<Option<Booking>, BookingError>;
}

/// In-memory reference store. Per-room write locks stand in for the row
/// locks a SQL store would take; the observable mutual-exclusion contract
/// is the same.
pub struct MemoryStore {
    hotels: DashMap<Ulid, Hotel>,
    rooms: DashMap<Ulid, Room>,
    /// Hotel → rooms index for O(1) room listing.
    hotel_rooms: DashMap<Ulid, Vec<Ulid>>,
    reservations: DashMap<Ulid, SharedRoomReservations>,
    /// Reverse lookup: booking id → room id.
    booking_rooms: Arc<DashMap<Ulid, Ulid>>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            hotels: DashMap::new(),
            rooms: DashMap::new(),
            hotel_rooms: DashMap::new(),
            reservations: DashMap::new(),
            booking_rooms: Arc::new(DashMap::new()),
            lock_timeout,
        }
    }

    // ── Admin surface ────────────────────────────────────────
    // Hotel management is an external workflow; these inherent methods are
    // how adapters (and tests) seed records. They are not on the trait.

    pub fn add_hotel(&self, hotel: Hotel) -> Result<(), BookingError> {
        if hotel.name.len() > MAX_HOTEL_NAME_LEN || hotel.city.len() > MAX_HOTEL_NAME_LEN {
            return Err(BookingError::Validation("hotel name or city too long"));
        }
        if self.hotels.contains_key(&hotel.id) {
            return Err(BookingError::AlreadyExists(hotel.id));
        }
        self.hotel_rooms.entry(hotel.id).or_default();
        self.hotels.insert(hotel.id, hotel);
        Ok(())
    }

    /// Room numbers are unique within a hotel; a clash reports the id of
    /// the room already holding the number.
    pub fn add_room(&self, room: Room) -> Result<(), BookingError> {
        if room.room_number.is_empty() || room.room_number.len() > MAX_ROOM_NUMBER_LEN {
            return Err(BookingError::Validation("bad room number"));
        }
        if !self.hotels.contains_key(&room.hotel_id) {
            return Err(BookingError::NotFound(room.hotel_id));
        }
        if self.rooms.contains_key(&room.id) {
            return Err(BookingError::AlreadyExists(room.id));
        }
        if let Some(existing) = self
            .rooms_of_hotel(room.hotel_id)
            .iter()
            .find(|r| r.room_number == room.room_number)
        {
            return Err(BookingError::AlreadyExists(existing.id));
        }

        self.reservations
            .insert(room.id, Arc::new(RwLock::new(RoomReservations::new(room.id))));
        self.hotel_rooms
            .entry(room.hotel_id)
            .or_default()
            .push(room.id);
        self.rooms.insert(room.id, room);
        Ok(())
    }

    fn reservations_for(&self, room_id: Ulid) -> Result<SharedRoomReservations, BookingError> {
        self.reservations
            .get(&room_id)
            .map(|e| e.value().clone())
            .ok_or(BookingError::NotFound(room_id))
    }

    async fn lock_room(
        &self,
        room_id: Ulid,
    ) -> Result<OwnedRwLockWriteGuard<RoomReservations>, BookingError> {
        let rr = self.reservations_for(room_id)?;
        let start = std::time::Instant::now();
        let guard = tokio::time::timeout(self.lock_timeout, rr.write_owned())
            .await
            .map_err(|_| {
                metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                BookingError::StoreUnavailable(format!("lock timeout on room {room_id}"))
            })?;
        metrics::histogram!(crate::observability::LOCK_WAIT_SECONDS)
            .record(start.elapsed().as_secs_f64());
        Ok(guard)
    }
}

struct MemoryScope {
    guard: OwnedRwLockWriteGuard<RoomReservations>,
    booking_rooms: Arc<DashMap<Ulid, Ulid>>,
}

#[async_trait]
impl ReservationScope for MemoryScope {
    fn room_id(&self) -> Ulid {
        self.guard.room_id
    }

    fn active(&self) -> Vec<Booking> {
        self.guard.active().cloned().collect()
    }

    async fn insert(&mut self, booking: Booking) -> Result<Booking, BookingError> {
        if self.guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(BookingError::Validation("too many bookings for room"));
        }
        self.booking_rooms.insert(booking.id, self.guard.room_id);
        self.guard.insert(booking.clone());
        Ok(booking)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn lock_and_list_active(
        &self,
        room_id: Ulid,
    ) -> Result<Box<dyn ReservationScope>, BookingError> {
        let guard = self.lock_room(room_id).await?;
        Ok(Box::new(MemoryScope {
            guard,
            booking_rooms: self.booking_rooms.clone(),
        }))
    }

    async fn mark_cancelled(&self, booking_id: Ulid) -> Result<Ulid, BookingError> {
        let room_id = self
            .booking_rooms
            .get(&booking_id)
            .map(|e| *e.value())
            .ok_or(BookingError::NotFound(booking_id))?;
        let mut guard = self.lock_room(room_id).await?;
        match guard.get_mut(booking_id) {
            Some(b) => b.cancelled = true,
            // Index said the booking exists; a missing record here means the
            // index and the reservation set disagree.
            None => return Err(BookingError::NotFound(booking_id)),
        }
        Ok(room_id)
    }

    fn get_hotel(&self, id: Ulid) -> Option<Hotel> {
        self.hotels.get(&id).map(|e| e.value().clone())
    }

    fn get_room(&self, id: Ulid) -> Option<Room> {
        self.rooms.get(&id).map(|e| e.value().clone())
    }

    fn hotels(&self) -> Vec<Hotel> {
        self.hotels.iter().map(|e| e.value().clone()).collect()
    }

    fn rooms(&self) -> Vec<Room> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    fn rooms_of_hotel(&self, hotel_id: Ulid) -> Vec<Room> {
        let ids = match self.hotel_rooms.get(&hotel_id) {
            Some(e) => e.value().clone(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.get_room(*id)).collect()
    }

    async fn active_bookings(&self, room_id: Ulid) -> Result<Vec<Booking>, BookingError> {
        let rr = self.reservations_for(room_id)?;
        let guard = rr.read().await;
        Ok(guard.active().cloned().collect())
    }

    async fn find_booking(&self, booking_id: Ulid) -> Result<Option<Booking>, BookingError> {
        let room_id = match self.booking_rooms.get(&booking_id) {
            Some(e) => *e.value(),
            None => return Ok(None),
        };
        let rr = self.reservations_for(room_id)?;
        let guard = rr.read().await;
        Ok(guard.get(booking_id).cloned())
    }
}
