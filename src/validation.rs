// Booking validator.
// Runs every check a booking request must pass before anything is written:
// required fields, referenced hotel/room, date range, guest count and room capacity.

use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult, FieldError};
use crate::model::{Hotel, HotelId, HotelStatus, PaymentMethod, Room, RoomId};
use crate::store::BookingStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Raw create-booking input as received from the transport
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BookingRequest {
    pub hotel_id: Option<HotelId>,
    pub room_id: Option<RoomId>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    // Signed so that negative counts reach the range check
    pub guests: Option<i64>,
    pub room_type: Option<String>,
    pub special_requests: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFields {
    pub hotel_id: HotelId,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub hotel: Hotel,
    pub room: Room,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub room_type: String,
    pub special_requests: Option<String>,
    pub payment_method: PaymentMethod,
}

pub fn require_fields(request: &BookingRequest) -> BookingResult<RequiredFields> {
    let mut errors = Vec::new();
    if request.hotel_id.is_none() {
        errors.push(FieldError::required("hotel_id"));
    }
    if request.room_id.is_none() {
        errors.push(FieldError::required("room_id"));
    }
    if request.check_in.is_none() {
        errors.push(FieldError::required("check_in"));
    }
    if request.check_out.is_none() {
        errors.push(FieldError::required("check_out"));
    }
    if request.guests.is_none() {
        errors.push(FieldError::required("guests"));
    }

    match (
        request.hotel_id,
        request.room_id,
        request.check_in,
        request.check_out,
        request.guests,
    ) {
        (Some(hotel_id), Some(room_id), Some(check_in), Some(check_out), Some(guests)) => Ok(RequiredFields {
            hotel_id,
            room_id,
            check_in,
            check_out,
            guests,
        }),
        _ => Err(BookingError::invalid_fields(errors)),
    }
}

// Both records must exist and the room must belong to the hotel
pub fn check_references(hotel: Option<Hotel>, room: Option<Room>) -> BookingResult<(Hotel, Room)> {
    match (hotel, room) {
        (Some(hotel), Some(room)) if room.hotel_id == hotel.id => Ok((hotel, room)),
        _ => Err(BookingError::hotel_or_room_not_found()),
    }
}

pub fn check_date_range(check_in: NaiveDate, check_out: NaiveDate) -> BookingResult<()> {
    if check_out <= check_in {
        return Err(BookingError::invalid_input("Invalid date range"));
    }
    Ok(())
}

pub fn check_guests(guests: i64, min: u32, max: u32) -> BookingResult<u32> {
    if guests < i64::from(min) || guests > i64::from(max) {
        return Err(BookingError::invalid_input(format!(
            "Guests must be between {} and {}",
            min, max
        )));
    }
    // In range, so it fits
    Ok(guests as u32)
}

pub fn check_capacity(guests: u32, room: &Room) -> BookingResult<()> {
    if guests > room.capacity {
        return Err(BookingError::invalid_input(format!(
            "Room can accommodate at most {} guests",
            room.capacity
        )));
    }
    Ok(())
}

pub fn check_bookable(hotel: &Hotel, room: &Room) -> BookingResult<()> {
    if hotel.status != HotelStatus::Active {
        return Err(BookingError::invalid_input("Hotel is not accepting bookings"));
    }
    if !room.is_available {
        return Err(BookingError::invalid_input("Room is not available"));
    }
    Ok(())
}

pub async fn validate<S>(store: &S, request: &BookingRequest, config: &BookingConfig) -> BookingResult<ValidatedBooking>
where
    S: BookingStore + ?Sized,
{
    let fields = require_fields(request)?;

    let hotel = store.find_hotel_by_id(fields.hotel_id).await?;
    let room = store.find_room_by_id(fields.room_id).await?;
    let (hotel, room) = check_references(hotel, room)?;

    check_date_range(fields.check_in, fields.check_out)?;
    let guests = check_guests(fields.guests, config.min_guests, config.max_guests)?;
    check_capacity(guests, &room)?;
    check_bookable(&hotel, &room)?;

    let room_type = request
        .room_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&room.room_type)
        .to_string();
    let special_requests = request
        .special_requests
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    tracing::debug!(
        hotel_id = %hotel.id,
        room_id = %room.id,
        check_in = %fields.check_in,
        check_out = %fields.check_out,
        guests,
        "booking request validated"
    );

    Ok(ValidatedBooking {
        hotel,
        room,
        check_in: fields.check_in,
        check_out: fields.check_out,
        guests,
        room_type,
        special_requests,
        payment_method: request.payment_method.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::InMemoryStore;
    use crate::model::UserId;
    use crate::money::Money;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (id, owner) in [(1, 20), (2, 21)] {
            store.insert_hotel(Hotel {
                id: HotelId(id),
                owner_id: UserId(owner),
                name: format!("Hotel {}", id),
                status: HotelStatus::Active,
            });
        }
        store.insert_room(Room {
            id: RoomId(10),
            hotel_id: HotelId(1),
            room_type: "Standard".to_string(),
            price: Money::from_cents(10000),
            capacity: 2,
            total_rooms: 5,
            is_available: true,
        });
        store
    }

    fn request() -> BookingRequest {
        BookingRequest {
            hotel_id: Some(HotelId(1)),
            room_id: Some(RoomId(10)),
            check_in: Some(date("2024-12-25")),
            check_out: Some(date("2024-12-27")),
            guests: Some(2),
            room_type: None,
            special_requests: Some("  Late check-in ".to_string()),
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_valid_request() {
        let validated = validate(&store(), &request(), &BookingConfig::default())
            .await
            .unwrap();

        assert_eq!(validated.guests, 2);
        assert_eq!(validated.room_type, "Standard");
        assert_eq!(validated.special_requests.as_deref(), Some("Late check-in"));
        assert_eq!(validated.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_all_missing_fields_are_reported() {
        let partial = BookingRequest {
            hotel_id: Some(HotelId(1)),
            ..Default::default()
        };
        match require_fields(&partial).unwrap_err() {
            BookingError::InvalidInput { errors, .. } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["room_id", "check_in", "check_out", "guests"]);
            }
            other => panic!("Expected invalid input, got {:?}", other),
        }
    }

    #[test_case(Some(99), Some(10); "unknown hotel")]
    #[test_case(Some(1), Some(99); "unknown room")]
    #[test_case(Some(2), Some(10); "room of another hotel")]
    fn test_reference_failures(hotel_id: Option<u64>, room_id: Option<u64>) {
        let mut req = request();
        req.hotel_id = hotel_id.map(HotelId);
        req.room_id = room_id.map(RoomId);

        let err = tokio_test::block_on(validate(&store(), &req, &BookingConfig::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Hotel or room not found");
    }

    #[test]
    fn test_check_out_before_check_in() {
        let mut req = request();
        req.check_in = Some(date("2024-12-27"));
        req.check_out = Some(date("2024-12-25"));

        let err = tokio_test::block_on(validate(&store(), &req, &BookingConfig::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Invalid date range");
    }

    #[test_case(0, false)]
    #[test_case(-3, false)]
    #[test_case(1, true)]
    #[test_case(10, true)]
    #[test_case(11, false)]
    fn test_guest_bounds(guests: i64, ok: bool) {
        assert_eq!(check_guests(guests, 1, 10).is_ok(), ok);
    }

    #[test_case(1, true; "below capacity")]
    #[test_case(2, true; "at capacity")]
    #[test_case(3, false; "one over capacity")]
    #[test_case(10, false; "within global bounds but over capacity")]
    fn test_room_capacity(guests: i64, ok: bool) {
        let mut req = request();
        req.guests = Some(guests);

        let result = tokio_test::block_on(validate(&store(), &req, &BookingConfig::default()));
        match result {
            Ok(validated) => {
                assert!(ok);
                assert_eq!(i64::from(validated.guests), guests);
            }
            Err(err) => {
                assert!(!ok);
                assert_eq!(err.kind(), ErrorKind::InvalidInput);
                assert_eq!(err.to_string(), "Room can accommodate at most 2 guests");
            }
        }
    }

    #[test]
    fn test_unavailable_room_and_inactive_hotel() {
        let store = store();
        store.insert_room(Room {
            id: RoomId(11),
            hotel_id: HotelId(1),
            room_type: "Suite".to_string(),
            price: Money::from_cents(30000),
            capacity: 4,
            total_rooms: 1,
            is_available: false,
        });
        let mut req = request();
        req.room_id = Some(RoomId(11));
        let err = tokio_test::block_on(validate(&store, &req, &BookingConfig::default())).unwrap_err();
        assert_eq!(err.to_string(), "Room is not available");

        store.insert_hotel(Hotel {
            id: HotelId(1),
            owner_id: UserId(20),
            name: "Hotel 1".to_string(),
            status: HotelStatus::Inactive,
        });
        let err = tokio_test::block_on(validate(&store, &request(), &BookingConfig::default())).unwrap_err();
        assert_eq!(err.to_string(), "Hotel is not accepting bookings");
    }

    #[test]
    fn test_explicit_room_type_and_method_are_kept() {
        let mut req = request();
        req.room_type = Some("Standard King".to_string());
        req.payment_method = Some(PaymentMethod::Esewa);

        let validated = tokio_test::block_on(validate(&store(), &req, &BookingConfig::default())).unwrap();
        assert_eq!(validated.room_type, "Standard King");
        assert_eq!(validated.payment_method, PaymentMethod::Esewa);
    }
}
