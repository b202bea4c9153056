use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use ulid::Ulid;

use crate::booking::{BookingError, ReservationStore, validate::validate_stay};
use crate::cache::{Computed, SearchCache};
use crate::limits::MAX_SEARCH_LIMIT;
use crate::model::{HotelSummary, RoomSummary, RoomType, StayRange};

#[derive(Debug, Clone)]
pub struct HotelFilter {
    pub city: Option<String>,
    pub name: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for HotelFilter {
    fn default() -> Self {
        Self {
            city: None,
            name: None,
            limit: MAX_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub hotel_id: Option<Ulid>,
    pub room_type: Option<RoomType>,
    pub stay: Option<StayRange>,
}

/// Read-heavy search over hotels and rooms, memoized through the
/// `SearchCache`. Writes never go through here; the reservation manager
/// invalidates the relevant tags after every commit.
pub struct SearchService {
    store: Arc<dyn ReservationStore>,
    cache: Arc<SearchCache>,
}

impl SearchService {
    pub fn new(store: Arc<dyn ReservationStore>, cache: Arc<SearchCache>) -> Self {
        Self { store, cache }
    }

    /// Case-insensitive substring search over hotel name and city,
    /// paginated, projected to the summary fields.
    pub async fn search_hotels(
        &self,
        filter: &HotelFilter,
        ttl: Option<Duration>,
    ) -> Result<Vec<HotelSummary>, BookingError> {
        let limit = filter.limit.min(MAX_SEARCH_LIMIT);
        let params = [
            ("city", opt_str(&filter.city)),
            ("name", opt_str(&filter.name)),
            ("limit", json!(limit)),
            ("offset", json!(filter.offset)),
        ];
        let store = self.store.clone();
        let filter = filter.clone();
        self.cache
            .get_or_compute("search_hotels", &params, ttl, move || async move {
                let mut hotels = store.hotels();
                if let Some(city) = &filter.city {
                    hotels.retain(|h| contains_ci(&h.city, city));
                }
                if let Some(name) = &filter.name {
                    hotels.retain(|h| contains_ci(&h.name, name));
                }
                hotels.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

                let page: Vec<HotelSummary> = hotels
                    .into_iter()
                    .skip(filter.offset)
                    .take(limit)
                    .map(|h| HotelSummary {
                        id: h.id,
                        name: h.name,
                        city: h.city,
                    })
                    .collect();
                let tags = page.iter().map(|h| h.id).collect();
                Ok(Computed { value: page, tags })
            })
            .await
    }

    /// Rooms open for booking: administratively available, matching the
    /// optional hotel/type filters, and — when a stay is given — free of
    /// overlapping active bookings for that range.
    pub async fn search_available_rooms(
        &self,
        filter: &RoomFilter,
        ttl: Option<Duration>,
    ) -> Result<Vec<RoomSummary>, BookingError> {
        if let Some(stay) = &filter.stay {
            validate_stay(stay.check_in, stay.check_out)?;
        }
        let params = [
            ("hotel_id", opt_display(&filter.hotel_id)),
            (
                "room_type",
                filter
                    .room_type
                    .map(|t| json!(t))
                    .unwrap_or(Value::Null),
            ),
            ("check_in", opt_display(&filter.stay.map(|s| s.check_in))),
            ("check_out", opt_display(&filter.stay.map(|s| s.check_out))),
        ];
        let store = self.store.clone();
        let filter = filter.clone();
        self.cache
            .get_or_compute("search_available_rooms", &params, ttl, move || async move {
                let mut candidates = match filter.hotel_id {
                    Some(hotel_id) => store.rooms_of_hotel(hotel_id),
                    None => store.rooms(),
                };
                candidates.retain(|r| r.is_available);
                if let Some(room_type) = filter.room_type {
                    candidates.retain(|r| r.room_type == room_type);
                }

                // Tag with every candidate, not just the rooms returned: a
                // booking that knocks a room out of this result must still
                // hit one of the entry's tags.
                let mut tags: Vec<Ulid> = Vec::with_capacity(candidates.len() * 2);
                for room in &candidates {
                    tags.push(room.id);
                    if !tags.contains(&room.hotel_id) {
                        tags.push(room.hotel_id);
                    }
                }

                let mut free = Vec::with_capacity(candidates.len());
                for room in candidates {
                    if let Some(stay) = &filter.stay {
                        let active = store.active_bookings(room.id).await?;
                        if active.iter().any(|b| b.stay.overlaps(stay)) {
                            continue;
                        }
                    }
                    free.push(RoomSummary::from(&room));
                }
                free.sort_by(|a, b| {
                    a.hotel_id
                        .cmp(&b.hotel_id)
                        .then(a.room_number.cmp(&b.room_number))
                });
                Ok(Computed { value: free, tags })
            })
            .await
    }

    /// Generic inbound surface: dispatch a named search with JSON params.
    /// Dates are `YYYY-MM-DD`, ids are Ulid strings, room types are the
    /// stored `"SINGLE"`-style forms.
    pub async fn search(
        &self,
        operation: &str,
        params: &Map<String, Value>,
        ttl: Option<Duration>,
    ) -> Result<Value, BookingError> {
        match operation {
            "search_hotels" => {
                let filter = hotel_filter_from_params(params)?;
                let hotels = self.search_hotels(&filter, ttl).await?;
                serde_json::to_value(hotels)
                    .map_err(|_| BookingError::Validation("result not serializable"))
            }
            "search_available_rooms" => {
                let filter = room_filter_from_params(params)?;
                let rooms = self.search_available_rooms(&filter, ttl).await?;
                serde_json::to_value(rooms)
                    .map_err(|_| BookingError::Validation("result not serializable"))
            }
            _ => Err(BookingError::Validation("unknown search operation")),
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn opt_str(v: &Option<String>) -> Value {
    v.as_ref().map(|s| json!(s)).unwrap_or(Value::Null)
}

fn opt_display<T: std::fmt::Display>(v: &Option<T>) -> Value {
    v.as_ref().map(|x| json!(x.to_string())).unwrap_or(Value::Null)
}

fn param_str<'a>(
    params: &'a Map<String, Value>,
    name: &str,
    err: &'static str,
) -> Result<Option<&'a str>, BookingError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or(BookingError::Validation(err)),
    }
}

fn hotel_filter_from_params(params: &Map<String, Value>) -> Result<HotelFilter, BookingError> {
    let mut filter = HotelFilter {
        city: param_str(params, "city", "city must be a string")?.map(str::to_string),
        name: param_str(params, "name", "name must be a string")?.map(str::to_string),
        ..HotelFilter::default()
    };
    if let Some(v) = params.get("limit")
        && !v.is_null()
    {
        let limit = v
            .as_u64()
            .ok_or(BookingError::Validation("limit must be a non-negative integer"))?;
        filter.limit = (limit as usize).min(MAX_SEARCH_LIMIT);
    }
    if let Some(v) = params.get("offset")
        && !v.is_null()
    {
        let offset = v
            .as_u64()
            .ok_or(BookingError::Validation("offset must be a non-negative integer"))?;
        filter.offset = offset as usize;
    }
    Ok(filter)
}

fn room_filter_from_params(params: &Map<String, Value>) -> Result<RoomFilter, BookingError> {
    let hotel_id = param_str(params, "hotel_id", "hotel_id must be a string")?
        .map(|s| {
            Ulid::from_string(s).map_err(|_| BookingError::Validation("hotel_id is not a valid id"))
        })
        .transpose()?;
    let room_type = param_str(params, "room_type", "room_type must be a string")?
        .map(|s| {
            RoomType::parse(s).ok_or(BookingError::Validation("unknown room type"))
        })
        .transpose()?;

    let check_in: Option<chrono::NaiveDate> =
        param_str(params, "check_in", "check_in must be a YYYY-MM-DD string")?
            .map(|s| {
                s.parse()
                    .map_err(|_| BookingError::Validation("check_in is not a valid date"))
            })
            .transpose()?;
    let check_out: Option<chrono::NaiveDate> =
        param_str(params, "check_out", "check_out must be a YYYY-MM-DD string")?
            .map(|s| {
                s.parse()
                    .map_err(|_| BookingError::Validation("check_out is not a valid date"))
            })
            .transpose()?;
    let stay = match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => Some(validate_stay(check_in, check_out)?),
        (None, None) => None,
        _ => {
            return Err(BookingError::Validation(
                "check_in and check_out must be given together",
            ));
        }
    };

    Ok(RoomFilter {
        hotel_id,
        room_type,
        stay,
    })
}
