//! Hard bounds on inputs. Anything past these is rejected up front.

/// Longest accepted guest name.
pub const MAX_GUEST_NAME_LEN: usize = 100;

/// Longest accepted guest email (RFC 5321 octet limit).
pub const MAX_GUEST_EMAIL_LEN: usize = 254;

/// Longest accepted stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 366;

/// Bookings are only accepted for years inside this window.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2100;

/// Cap on total bookings (active + cancelled) retained per room.
pub const MAX_BOOKINGS_PER_ROOM: usize = 100_000;

/// Longest accepted room number.
pub const MAX_ROOM_NUMBER_LEN: usize = 10;

/// Longest accepted hotel name / city.
pub const MAX_HOTEL_NAME_LEN: usize = 100;

/// Search pagination cap.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Cap on parameters accepted by the cache key codec.
pub const MAX_CACHE_KEY_PARAMS: usize = 32;
