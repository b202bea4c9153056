use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open date range `[check_in, check_out)`.
///
/// Date-granular: a checkout on day D and a check-in on day D do not
/// overlap, so back-to-back stays are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "check_in must precede check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// The sole temporal contract: `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Single,
    Double,
    Suite,
}

impl RoomType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SINGLE" => Some(Self::Single),
            "DOUBLE" => Some(Self::Double),
            "SUITE" => Some(Self::Suite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Ulid,
    pub name: String,
    pub city: String,
    pub address: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Hotel {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            city: city.into(),
            address: address.into(),
            description: None,
            created_at: Utc::now(),
        }
    }
}

/// A room record. Created by hotel-management workflows; read-only to the
/// reservation core. `is_available` is an administrative flag, independent
/// of bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub hotel_id: Ulid,
    /// Unique within the hotel.
    pub room_number: String,
    pub room_type: RoomType,
    pub price_cents: i64,
    pub capacity: u8,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        hotel_id: Ulid,
        room_number: impl Into<String>,
        room_type: RoomType,
        price_cents: i64,
        capacity: u8,
    ) -> Self {
        Self {
            id: Ulid::new(),
            hotel_id,
            room_number: room_number.into(),
            room_type,
            price_cents,
            capacity,
            is_available: true,
            created_at: Utc::now(),
        }
    }
}

/// A reservation. Cancellation is a soft delete: cancelled bookings are
/// retained for audit and permanently excluded from overlap checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest_name: String,
    pub guest_email: String,
    pub stay: StayRange,
    pub booked_at: DateTime<Utc>,
    pub cancelled: bool,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

/// All bookings for one room, sorted by `stay.check_in`. The active subset
/// is the unit over which exclusivity is enforced.
#[derive(Debug, Clone)]
pub struct RoomReservations {
    pub room_id: Ulid,
    pub bookings: Vec<Booking>,
}

impl RoomReservations {
    pub fn new(room_id: Ulid) -> Self {
        Self {
            room_id,
            bookings: Vec::new(),
        }
    }

    /// Insert maintaining sort order by check-in date.
    pub fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.stay.check_in, |b| b.stay.check_in)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn get(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Non-cancelled bookings in check-in order.
    pub fn active(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(|b| b.is_active())
    }

    /// Active bookings whose stay overlaps the query range.
    /// Binary search skips bookings starting at or after `query.check_out`.
    pub fn active_overlapping(&self, query: &StayRange) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.stay.check_in < query.check_out);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.is_active() && b.stay.check_out > query.check_in)
    }
}

/// Projection returned by hotel search, matching the fields the search
/// actually selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelSummary {
    pub id: Ulid,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub room_number: String,
    pub room_type: RoomType,
    pub price_cents: i64,
    pub capacity: u8,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            hotel_id: room.hotel_id,
            room_number: room.room_number.clone(),
            room_type: room.room_type,
            price_cents: room.price_cents,
            capacity: room.capacity,
        }
    }
}
