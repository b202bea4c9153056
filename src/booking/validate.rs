use chrono::{Datelike, NaiveDate};

use crate::limits::*;
use crate::model::StayRange;

use super::BookingError;

/// Validate the requested stay. `check_out <= check_in` is always rejected;
/// so are stays outside the supported date window or past the length cap.
pub(crate) fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<StayRange, BookingError> {
    if check_out <= check_in {
        return Err(BookingError::Validation(
            "check-out date must be after check-in date",
        ));
    }
    if check_in.year() < MIN_VALID_YEAR || check_out.year() > MAX_VALID_YEAR {
        return Err(BookingError::Validation("date out of supported range"));
    }
    let stay = StayRange::new(check_in, check_out);
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(BookingError::Validation("stay too long"));
    }
    Ok(stay)
}

pub(crate) fn validate_guest(name: &str, email: &str) -> Result<(), BookingError> {
    if name.trim().is_empty() {
        return Err(BookingError::Validation("guest name is required"));
    }
    if name.len() > MAX_GUEST_NAME_LEN {
        return Err(BookingError::Validation("guest name too long"));
    }
    if email.len() > MAX_GUEST_EMAIL_LEN {
        return Err(BookingError::Validation("guest email too long"));
    }
    if !is_well_formed_email(email) {
        return Err(BookingError::Validation("guest email is malformed"));
    }
    Ok(())
}

/// Minimal shape check: one `@`, nonempty local part, dotted domain, no
/// whitespace. Full address validation belongs to the inbound adapter.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}
