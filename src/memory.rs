// In-memory implementation of the booking store.
// The catalog (hotels, rooms) lives in concurrent maps; the booking and
// payment tables share one lock which acts as the transaction scope.

use crate::model::{
    Booking, BookingFilter, BookingId, BookingReference, BookingStatus, Hotel, HotelId,
    NewBooking, Payment, PaymentStatus, Room, RoomId, UserId,
};
use crate::store::{BookingStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct StoreStats {
    pub bookings_created: AtomicUsize,
    pub payments_created: AtomicUsize,
    pub status_updates: AtomicUsize,
    pub rejected_writes: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStatsReport {
    pub bookings_created: usize,
    pub payments_created: usize,
    pub status_updates: usize,
    pub rejected_writes: usize,
}

// Hotels and rooms used to seed the store
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&content)?)
    }
}

#[derive(Debug, Default)]
struct BookingTables {
    last_id: u64,
    bookings: BTreeMap<BookingId, Booking>,
    references: HashSet<BookingReference>,
    payments: HashMap<BookingId, Payment>,
    payment_references: HashSet<String>,
}

impl BookingTables {
    fn rooms_taken(&self, record: &NewBooking) -> usize {
        self.bookings
            .values()
            .filter(|b| b.room_id == record.room_id && b.status.holds_room())
            .filter(|b| b.overlaps(record.check_in, record.check_out))
            .count()
    }
}

pub struct InMemoryStore {
    hotels: DashMap<HotelId, Hotel>,
    rooms: DashMap<RoomId, Room>,
    tables: Mutex<BookingTables>,
    stats: StoreStats,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            hotels: DashMap::new(),
            rooms: DashMap::new(),
            tables: Mutex::new(BookingTables::default()),
            stats: StoreStats::default(),
        }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        for hotel in catalog.hotels {
            store.insert_hotel(hotel);
        }
        for room in catalog.rooms {
            store.insert_room(room);
        }
        store
    }

    pub fn insert_hotel(&self, hotel: Hotel) {
        self.hotels.insert(hotel.id, hotel);
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    // Takes the table lock so removal cannot interleave with a booking insert
    pub fn remove_room(&self, id: RoomId) -> Option<Room> {
        let _tables = self.tables.lock();
        self.rooms.remove(&id).map(|(_, room)| room)
    }

    pub fn remove_hotel(&self, id: HotelId) -> Option<Hotel> {
        let _tables = self.tables.lock();
        self.rooms.retain(|_, room| room.hotel_id != id);
        self.hotels.remove(&id).map(|(_, hotel)| hotel)
    }

    pub fn booking_count(&self) -> usize {
        self.tables.lock().bookings.len()
    }

    pub fn stats(&self) -> StoreStatsReport {
        StoreStatsReport {
            bookings_created: self.stats.bookings_created.load(Ordering::SeqCst),
            payments_created: self.stats.payments_created.load(Ordering::SeqCst),
            status_updates: self.stats.status_updates.load(Ordering::SeqCst),
            rejected_writes: self.stats.rejected_writes.load(Ordering::SeqCst),
        }
    }

    fn reject<T>(&self, err: StoreError) -> StoreResult<T> {
        self.stats.rejected_writes.fetch_add(1, Ordering::SeqCst);
        Err(err)
    }

    fn owned_hotels(&self, owner_id: UserId) -> HashSet<HotelId> {
        self.hotels
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| *entry.key())
            .collect()
    }

    fn collect<F>(&self, filter: &BookingFilter, scope: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let tables = self.tables.lock();
        // BTreeMap keys grow with insertion, so reverse order is newest first
        tables
            .bookings
            .values()
            .rev()
            .filter(|b| scope(b) && filter.matches(b))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn find_hotel_by_id(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        Ok(self.hotels.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_room_by_id(&self, id: RoomId) -> StoreResult<Option<Room>> {
        Ok(self.rooms.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_booking(&self, record: NewBooking) -> StoreResult<Booking> {
        let mut tables = self.tables.lock();

        // Foreign keys
        if !self.hotels.contains_key(&record.hotel_id) {
            return self.reject(StoreError::MissingHotel(record.hotel_id));
        }
        let total_rooms = match self.rooms.get(&record.room_id) {
            Some(room) if room.hotel_id == record.hotel_id => room.total_rooms,
            _ => return self.reject(StoreError::MissingRoom(record.room_id)),
        };

        // Unique constraints
        if tables.references.contains(&record.booking_id) {
            return self.reject(StoreError::DuplicateReference(record.booking_id));
        }
        if tables.payment_references.contains(&record.payment_id) {
            return self.reject(StoreError::DuplicatePaymentReference(record.payment_id));
        }

        if tables.rooms_taken(&record) >= total_rooms as usize {
            return self.reject(StoreError::InventoryExhausted(record.room_id));
        }

        tables.last_id += 1;
        let id = BookingId(tables.last_id);
        let now = Utc::now();

        let booking = Booking {
            id,
            booking_id: record.booking_id,
            check_in: record.check_in,
            check_out: record.check_out,
            guests: record.guests,
            nights: record.nights,
            room_type: record.room_type,
            special_requests: record.special_requests,
            subtotal: record.subtotal,
            tax: record.tax,
            total: record.total,
            payment_method: record.payment_method,
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Upcoming,
            user_id: record.user_id,
            hotel_id: record.hotel_id,
            room_id: record.room_id,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: record.payment_id,
            booking_id: id,
            user_id: record.user_id,
            hotelier_id: record.hotelier_id,
            amount: booking.total,
            admin_commission: record.admin_commission,
            hotelier_amount: record.hotelier_amount,
            method: booking.payment_method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            created_at: now,
        };

        tables.references.insert(booking.booking_id.clone());
        tables.payment_references.insert(payment.id.clone());
        tables.payments.insert(id, payment);
        tables.bookings.insert(id, booking.clone());

        self.stats.bookings_created.fetch_add(1, Ordering::SeqCst);
        self.stats.payments_created.fetch_add(1, Ordering::SeqCst);

        Ok(booking)
    }

    async fn find_booking_by_id(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.tables.lock().bookings.get(&id).cloned())
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> StoreResult<Booking> {
        let mut tables = self.tables.lock();
        let booking = match tables.bookings.get_mut(&id) {
            Some(booking) => booking,
            None => return self.reject(StoreError::MissingBooking(id)),
        };
        if booking.status != expected {
            let current = booking.status;
            return self.reject(StoreError::StatusChanged { id, current });
        }

        booking.status = next;
        booking.updated_at = Utc::now();
        self.stats.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(booking.clone())
    }

    async fn update_payment_status(
        &self,
        id: BookingId,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> StoreResult<Booking> {
        let mut tables = self.tables.lock();
        let updated = match tables.bookings.get_mut(&id) {
            Some(booking) if booking.payment_status != expected => {
                let current = booking.payment_status;
                return self.reject(StoreError::PaymentStatusChanged { id, current });
            }
            Some(booking) => {
                booking.payment_status = next;
                booking.updated_at = Utc::now();
                booking.clone()
            }
            None => return self.reject(StoreError::MissingBooking(id)),
        };
        if let Some(payment) = tables.payments.get_mut(&id) {
            payment.status = next;
        }

        self.stats.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }

    async fn find_payment_by_booking(&self, id: BookingId) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().payments.get(&id).cloned())
    }

    async fn list_bookings_by_user(&self, user_id: UserId, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        Ok(self.collect(filter, |b| b.user_id == user_id))
    }

    async fn list_bookings_by_hotel_owner(
        &self,
        owner_id: UserId,
        filter: &BookingFilter,
    ) -> StoreResult<Vec<Booking>> {
        let hotels = self.owned_hotels(owner_id);
        Ok(self.collect(filter, |b| hotels.contains(&b.hotel_id)))
    }

    async fn list_all_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        Ok(self.collect(filter, |_| true))
    }
}

// Sample catalog shipped with the repository
pub const SAMPLE_CATALOG_PATH: &str = "samples/catalog.json";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HotelStatus, PaymentMethod};
    use crate::money::Money;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seeded_store(total_rooms: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_hotel(Hotel {
            id: HotelId(1),
            owner_id: UserId(20),
            name: "Test Hotel".to_string(),
            status: HotelStatus::Active,
        });
        store.insert_room(Room {
            id: RoomId(10),
            hotel_id: HotelId(1),
            room_type: "Standard".to_string(),
            price: Money::from_cents(10000),
            capacity: 2,
            total_rooms,
            is_available: true,
        });
        store
    }

    fn record(reference: &str, check_in: &str, check_out: &str) -> NewBooking {
        NewBooking {
            booking_id: BookingReference::new(reference),
            check_in: date(check_in),
            check_out: date(check_out),
            guests: 2,
            nights: 2,
            room_type: "Standard".to_string(),
            special_requests: None,
            subtotal: Money::from_cents(20000),
            tax: Money::from_cents(2600),
            total: Money::from_cents(22600),
            payment_method: PaymentMethod::Cash,
            user_id: UserId(5),
            hotel_id: HotelId(1),
            room_id: RoomId(10),
            hotelier_id: UserId(20),
            admin_commission: Money::from_cents(2260),
            hotelier_amount: Money::from_cents(20340),
            payment_id: format!("PAY-{}", reference),
        }
    }

    #[test]
    fn test_create_writes_booking_and_payment() {
        let store = seeded_store(5);
        let booking = tokio_test::block_on(store.create_booking(record(
            "HB000000001AAA",
            "2024-12-25",
            "2024-12-27",
        )))
        .unwrap();

        assert_eq!(booking.status, BookingStatus::Upcoming);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);

        let payment = tokio_test::block_on(store.find_payment_by_booking(booking.id))
            .unwrap()
            .unwrap();
        assert_eq!(payment.amount, booking.total);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.user_id, UserId(5));
        assert_eq!(payment.hotelier_id, UserId(20));
        assert_eq!(payment.admin_commission, Money::from_cents(2260));
        assert_eq!(payment.hotelier_amount, Money::from_cents(20340));

        let stats = store.stats();
        assert_eq!(stats.bookings_created, 1);
        assert_eq!(stats.payments_created, 1);
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_rejected() {
        let store = seeded_store(5);
        store
            .create_booking(record("HB000000001AAA", "2024-12-25", "2024-12-27"))
            .await
            .unwrap();

        let mut duplicate = record("HB000000001AAA", "2025-01-10", "2025-01-12");
        duplicate.payment_id = "PAY-other".to_string();
        let err = store.create_booking(duplicate).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateReference(_)));
        assert_eq!(store.booking_count(), 1);
        assert_eq!(store.stats().rejected_writes, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let store = seeded_store(5);

        let mut wrong_hotel = record("HB1", "2024-12-25", "2024-12-27");
        wrong_hotel.hotel_id = HotelId(99);
        assert_eq!(
            store.create_booking(wrong_hotel).await.unwrap_err(),
            StoreError::MissingHotel(HotelId(99))
        );

        store.remove_room(RoomId(10));
        assert_eq!(
            store
                .create_booking(record("HB2", "2024-12-25", "2024-12-27"))
                .await
                .unwrap_err(),
            StoreError::MissingRoom(RoomId(10))
        );
        assert_eq!(store.booking_count(), 0);
    }

    #[tokio::test]
    async fn test_inventory_counts_only_overlapping_active_bookings() {
        let store = seeded_store(1);
        let first = store
            .create_booking(record("HB1", "2024-12-25", "2024-12-27"))
            .await
            .unwrap();

        // Overlapping stay on the only room
        let err = store
            .create_booking(record("HB2", "2024-12-26", "2024-12-28"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::InventoryExhausted(RoomId(10)));

        // Back-to-back stay is fine
        store
            .create_booking(record("HB3", "2024-12-27", "2024-12-29"))
            .await
            .unwrap();

        // Cancelling frees the room
        store
            .update_booking_status(first.id, BookingStatus::Upcoming, BookingStatus::Cancelled)
            .await
            .unwrap();
        store
            .create_booking(record("HB4", "2024-12-24", "2024-12-26"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_newest_first() {
        let store = seeded_store(5);
        store.insert_hotel(Hotel {
            id: HotelId(2),
            owner_id: UserId(21),
            name: "Other Hotel".to_string(),
            status: HotelStatus::Active,
        });
        store.insert_room(Room {
            id: RoomId(11),
            hotel_id: HotelId(2),
            room_type: "Suite".to_string(),
            price: Money::from_cents(25000),
            capacity: 4,
            total_rooms: 2,
            is_available: true,
        });

        let first = store
            .create_booking(record("HB1", "2024-12-25", "2024-12-27"))
            .await
            .unwrap();
        let second = store
            .create_booking(record("HB2", "2025-01-05", "2025-01-07"))
            .await
            .unwrap();
        let mut elsewhere = record("HB3", "2025-01-05", "2025-01-07");
        elsewhere.hotel_id = HotelId(2);
        elsewhere.room_id = RoomId(11);
        elsewhere.user_id = UserId(6);
        store.create_booking(elsewhere).await.unwrap();

        let mine = store
            .list_bookings_by_user(UserId(5), &BookingFilter::default())
            .await
            .unwrap();
        assert_eq!(
            mine.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let owned = store
            .list_bookings_by_hotel_owner(UserId(20), &BookingFilter::default())
            .await
            .unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|b| b.hotel_id == HotelId(1)));

        store
            .update_booking_status(first.id, BookingStatus::Upcoming, BookingStatus::Cancelled)
            .await
            .unwrap();
        let upcoming = store
            .list_all_bookings(&BookingFilter::with_status(BookingStatus::Upcoming))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 2);
        assert!(upcoming.iter().all(|b| b.status == BookingStatus::Upcoming));
    }

    #[tokio::test]
    async fn test_payment_status_follows_booking() {
        let store = seeded_store(5);
        let booking = store
            .create_booking(record("HB1", "2024-12-25", "2024-12-27"))
            .await
            .unwrap();

        let updated = store
            .update_payment_status(booking.id, PaymentStatus::Pending, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);

        let payment = store.find_payment_by_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);

        let missing = store
            .update_payment_status(BookingId(404), PaymentStatus::Pending, PaymentStatus::Paid)
            .await
            .unwrap_err();
        assert_eq!(missing, StoreError::MissingBooking(BookingId(404)));
    }

    #[tokio::test]
    async fn test_status_writes_are_conditional() {
        let store = seeded_store(5);
        let booking = store
            .create_booking(record("HB1", "2024-12-25", "2024-12-27"))
            .await
            .unwrap();
        store
            .update_booking_status(booking.id, BookingStatus::Upcoming, BookingStatus::Cancelled)
            .await
            .unwrap();

        // A writer still holding the upcoming snapshot must not revive it
        let err = store
            .update_booking_status(booking.id, BookingStatus::Upcoming, BookingStatus::CheckedIn)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::StatusChanged {
                id: booking.id,
                current: BookingStatus::Cancelled,
            }
        );

        store
            .update_payment_status(booking.id, PaymentStatus::Pending, PaymentStatus::Paid)
            .await
            .unwrap();
        let err = store
            .update_payment_status(booking.id, PaymentStatus::Pending, PaymentStatus::Failed)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::PaymentStatusChanged {
                id: booking.id,
                current: PaymentStatus::Paid,
            }
        );

        let stored = store.find_booking_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(store.stats().status_updates, 2);
        assert_eq!(store.stats().rejected_writes, 2);
    }

    #[test]
    fn test_load_sample_catalog() {
        let catalog = Catalog::load(SAMPLE_CATALOG_PATH);
        assert!(
            catalog.is_ok(),
            "Failed to load sample catalog: {:?}",
            catalog.err()
        );

        let catalog = catalog.unwrap();
        assert!(!catalog.hotels.is_empty());
        for room in &catalog.rooms {
            assert!(
                catalog.hotels.iter().any(|h| h.id == room.hotel_id),
                "Room {} references an unknown hotel",
                room.id
            );
        }

        let store = InMemoryStore::from_catalog(catalog);
        assert_eq!(store.booking_count(), 0);
    }
}
