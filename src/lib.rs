//! innkeep: hotel reservation core.
//!
//! Two guarantees live here: no two active bookings for the same room ever
//! overlap in time, even under concurrent requests (per-room exclusive
//! scopes in the store layer), and cached search results never outlive a
//! write that could change them (tag-based invalidation keyed by room and
//! hotel ids).

pub mod booking;
pub mod cache;
pub mod config;
pub mod limits;
pub mod model;
pub mod observability;
pub mod search;
pub mod sweeper;

pub use booking::{
    BookingError, MemoryStore, ReservationManager, ReservationScope, ReservationStore,
};
pub use cache::{CacheBackend, InvalidationScope, MemoryBackend, SearchCache};
pub use config::Config;
pub use search::{HotelFilter, RoomFilter, SearchService};
