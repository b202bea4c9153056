mod error;
pub mod store;
pub(crate) mod validate;

pub use error::BookingError;
pub use store::{MemoryStore, ReservationScope, ReservationStore};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use ulid::Ulid;

use crate::cache::{InvalidationScope, SearchCache};
use crate::model::Booking;

use self::validate::{validate_guest, validate_stay};

/// Orchestrates booking creation and cancellation under the per-room
/// exclusivity guarantee.
///
/// The protocol: acquire the room's exclusive scope, test the requested
/// stay against every active booking, commit or reject. Because the scope
/// serializes writers, exactly one of any set of racing requests for
/// overlapping ranges observes zero overlaps and inserts; the rest observe
/// the committed booking and get `Conflict`.
pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
    cache: Arc<SearchCache>,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>, cache: Arc<SearchCache>) -> Self {
        Self { store, cache }
    }

    pub async fn create_booking(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guest_name: &str,
        guest_email: &str,
    ) -> Result<Booking, BookingError> {
        let stay = validate_stay(check_in, check_out)?;
        validate_guest(guest_name, guest_email)?;

        let mut scope = self.store.lock_and_list_active(room_id).await?;
        for existing in scope.active() {
            if existing.stay.overlaps(&stay) {
                metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                debug!(room = %room_id, existing = %existing.id, "booking conflict");
                return Err(BookingError::Conflict(existing.id));
            }
        }

        let booking = Booking {
            id: Ulid::new(),
            room_id,
            guest_name: guest_name.trim().to_string(),
            guest_email: guest_email.to_string(),
            stay,
            booked_at: Utc::now(),
            cancelled: false,
        };
        let committed = scope.insert(booking).await?;
        drop(scope);

        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(booking = %committed.id, room = %room_id, "booking created");
        self.invalidate_for_room(room_id).await;
        Ok(committed)
    }

    /// Marks the booking cancelled; the range becomes bookable again.
    /// Repeat cancellation of the same id is a no-op success.
    pub async fn cancel_booking(&self, booking_id: Ulid) -> Result<(), BookingError> {
        let room_id = self.store.mark_cancelled(booking_id).await?;
        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        info!(booking = %booking_id, room = %room_id, "booking cancelled");
        self.invalidate_for_room(room_id).await;
        Ok(())
    }

    pub async fn get_booking(&self, booking_id: Ulid) -> Result<Booking, BookingError> {
        self.store
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound(booking_id))
    }

    /// Drop cached search results that could reflect this room's
    /// availability. Best-effort: the write already committed, so a cache
    /// backend failure degrades reads rather than failing the request.
    async fn invalidate_for_room(&self, room_id: Ulid) {
        self.cache.invalidate(InvalidationScope::Room(room_id)).await;
        if let Some(room) = self.store.get_room(room_id) {
            self.cache
                .invalidate(InvalidationScope::Hotel(room.hotel_id))
                .await;
        }
    }
}
