// Persistence collaborator consumed by the booking core.
// Implementations must run `create_booking` as a single transaction: reference
// existence, reference uniqueness and room inventory are checked together
// with the insert.

use crate::model::{
    Booking, BookingFilter, BookingId, BookingReference, BookingStatus, Hotel, HotelId,
    NewBooking, Payment, PaymentStatus, Room, RoomId, UserId,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Referenced hotel {0} does not exist")]
    MissingHotel(HotelId),

    #[error("Referenced room {0} does not exist for this hotel")]
    MissingRoom(RoomId),

    #[error("Duplicate booking reference: {0}")]
    DuplicateReference(BookingReference),

    #[error("Duplicate payment reference: {0}")]
    DuplicatePaymentReference(String),

    #[error("No rooms left for room {0} in the requested dates")]
    InventoryExhausted(RoomId),

    #[error("Booking {0} does not exist")]
    MissingBooking(BookingId),

    #[error("Booking {id} is {current}, not the expected status")]
    StatusChanged { id: BookingId, current: BookingStatus },

    #[error("Payment for booking {id} is {current}, not the expected status")]
    PaymentStatusChanged { id: BookingId, current: PaymentStatus },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn find_hotel_by_id(&self, id: HotelId) -> StoreResult<Option<Hotel>>;

    // Room together with its hotel reference
    async fn find_room_by_id(&self, id: RoomId) -> StoreResult<Option<Room>>;

    // Inserts the booking row and its pending payment placeholder atomically
    async fn create_booking(&self, record: NewBooking) -> StoreResult<Booking>;

    async fn find_booking_by_id(&self, id: BookingId) -> StoreResult<Option<Booking>>;

    // Writes `next` only while the stored status still equals `expected`,
    // otherwise fails with `StatusChanged`
    async fn update_booking_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> StoreResult<Booking>;

    // Same guard as above; updates the booking and its payment record together
    async fn update_payment_status(
        &self,
        id: BookingId,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> StoreResult<Booking>;

    async fn find_payment_by_booking(&self, id: BookingId) -> StoreResult<Option<Payment>>;

    // Newest first
    async fn list_bookings_by_user(&self, user_id: UserId, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    async fn list_bookings_by_hotel_owner(
        &self,
        owner_id: UserId,
        filter: &BookingFilter,
    ) -> StoreResult<Vec<Booking>>;

    async fn list_all_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;
}
