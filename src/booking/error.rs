use ulid::Ulid;

/// Outcomes of reservation operations that are not plain success.
///
/// `Conflict` is an expected result of the protocol (the guest picked dates
/// someone else holds), distinct from `StoreUnavailable`, which is an
/// infrastructure failure the caller may retry with backoff.
#[derive(Debug)]
pub enum BookingError {
    Validation(&'static str),
    NotFound(Ulid),
    Conflict(Ulid),
    AlreadyExists(Ulid),
    StoreUnavailable(String),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(msg) => write!(f, "invalid request: {msg}"),
            BookingError::NotFound(id) => write!(f, "not found: {id}"),
            BookingError::Conflict(id) => write!(f, "conflicts with booking: {id}"),
            BookingError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            BookingError::StoreUnavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
