// Booking lifecycle manager.
// Entry point for the routing layer: every operation takes the authenticated
// caller and returns a booking record or a typed error.

use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::lifecycle::{booking_transition, payment_transition, Transition};
use crate::model::{Booking, BookingFilter, BookingId, BookingStatus, NewBooking, Payment, PaymentStatus};
use crate::policy::{self, Caller};
use crate::pricing;
use crate::reference::{ReferenceGenerator, TimestampReferenceGenerator};
use crate::store::{BookingStore, StoreError};
use crate::validation::{self, BookingRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// A reference collision is retried this many times before surfacing
const REFERENCE_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Page {
    // 1-based
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
}

impl Page {
    pub fn apply(&self, bookings: Vec<Booking>) -> BookingPage {
        let limit = self.limit.max(1);
        let page = self.page.max(1);
        let total = bookings.len();
        let total_pages = ((total as u64 + u64::from(limit) - 1) / u64::from(limit)) as u32;
        let skip = (page as usize - 1).saturating_mul(limit as usize);

        BookingPage {
            bookings: bookings.into_iter().skip(skip).take(limit as usize).collect(),
            total,
            page,
            total_pages,
        }
    }
}

pub struct BookingService<S: BookingStore> {
    store: Arc<S>,
    references: Arc<dyn ReferenceGenerator>,
    config: BookingConfig,
}

impl<S: BookingStore> Clone for BookingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            references: Arc::clone(&self.references),
            config: self.config.clone(),
        }
    }
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: Arc<S>, config: BookingConfig) -> Self {
        let references = TimestampReferenceGenerator::new(config.reference_prefix.clone());
        Self {
            store,
            references: Arc::new(references),
            config,
        }
    }

    pub fn with_reference_generator(mut self, generator: impl ReferenceGenerator) -> Self {
        self.references = Arc::new(generator);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub async fn create_booking(&self, caller: &Caller, request: BookingRequest) -> BookingResult<Booking> {
        let validated = match validation::validate(self.store.as_ref(), &request, &self.config).await {
            Ok(validated) => validated,
            Err(err) => {
                warn!(user_id = %caller.user_id, kind = err.kind().as_str(), error = %err, "booking request rejected");
                return Err(err);
            }
        };

        let quote = pricing::quote(
            validated.check_in,
            validated.check_out,
            validated.room.price,
            self.config.tax_rate,
        )?;
        let payout = pricing::split_payout(quote.total, self.config.commission_rate)?;

        let mut attempt = 0;
        loop {
            let record = NewBooking {
                booking_id: self.references.booking_reference(),
                check_in: validated.check_in,
                check_out: validated.check_out,
                guests: validated.guests,
                nights: quote.nights,
                room_type: validated.room_type.clone(),
                special_requests: validated.special_requests.clone(),
                subtotal: quote.subtotal,
                tax: quote.tax,
                total: quote.total,
                payment_method: validated.payment_method,
                user_id: caller.user_id,
                hotel_id: validated.hotel.id,
                room_id: validated.room.id,
                hotelier_id: validated.hotel.owner_id,
                admin_commission: payout.admin_commission,
                hotelier_amount: payout.hotelier_amount,
                payment_id: self.references.payment_reference(),
            };

            match self.store.create_booking(record).await {
                Ok(booking) => {
                    info!(
                        booking_id = %booking.booking_id,
                        user_id = %booking.user_id,
                        hotel_id = %booking.hotel_id,
                        room_id = %booking.room_id,
                        nights = booking.nights,
                        total = %booking.total,
                        "booking created"
                    );
                    return Ok(booking);
                }
                Err(StoreError::DuplicateReference(reference)) if attempt < REFERENCE_RETRIES => {
                    warn!(booking_id = %reference, "booking reference collision, regenerating");
                    attempt += 1;
                }
                Err(StoreError::DuplicatePaymentReference(reference)) if attempt < REFERENCE_RETRIES => {
                    warn!(payment_id = %reference, "payment reference collision, regenerating");
                    attempt += 1;
                }
                Err(err) => {
                    warn!(user_id = %caller.user_id, error = %err, "booking write rejected");
                    return Err(map_store_error(err));
                }
            }
        }
    }

    // Bookings made by the caller
    pub async fn list_bookings(&self, caller: &Caller, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        let bookings = self
            .store
            .list_bookings_by_user(caller.user_id, filter)
            .await
            .map_err(map_store_error)?;
        debug!(user_id = %caller.user_id, count = bookings.len(), "listed bookings");
        Ok(bookings)
    }

    // Bookings for the hotels the caller runs; admins see everything
    pub async fn list_hotel_bookings(&self, caller: &Caller, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        if !policy::can_list_hotel_bookings(caller) {
            warn!(user_id = %caller.user_id, "hotel booking listing denied");
            return Err(BookingError::forbidden());
        }

        let bookings = if caller.is_admin() {
            self.store.list_all_bookings(filter).await
        } else {
            self.store.list_bookings_by_hotel_owner(caller.user_id, filter).await
        }
        .map_err(map_store_error)?;

        debug!(user_id = %caller.user_id, count = bookings.len(), "listed hotel bookings");
        Ok(bookings)
    }

    pub async fn get_booking(&self, caller: &Caller, id: BookingId) -> BookingResult<Booking> {
        let booking = self.find(id).await?;

        if !(caller.is_admin() || policy::owns_booking(caller, &booking)) {
            let hotel = self
                .store
                .find_hotel_by_id(booking.hotel_id)
                .await
                .map_err(map_store_error)?;
            if !policy::can_view_booking(caller, &booking, hotel.as_ref()) {
                warn!(user_id = %caller.user_id, booking = %id, "booking read denied");
                return Err(BookingError::Authorization(
                    "Not authorized to access this booking".to_string(),
                ));
            }
        }

        Ok(booking)
    }

    pub async fn get_payment(&self, caller: &Caller, id: BookingId) -> BookingResult<Payment> {
        let booking = self.get_booking(caller, id).await?;
        self.store
            .find_payment_by_booking(booking.id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| BookingError::not_found("Payment not found"))
    }

    // Re-cancelling a cancelled booking succeeds without writing
    pub async fn cancel_booking(&self, caller: &Caller, id: BookingId) -> BookingResult<Booking> {
        let booking = self.find(id).await?;

        if !policy::can_cancel_booking(caller, &booking) {
            warn!(user_id = %caller.user_id, booking = %id, "cancellation denied");
            return Err(BookingError::Authorization(
                "Not authorized to cancel this booking".to_string(),
            ));
        }

        self.apply_status(caller, booking, BookingStatus::Cancelled).await
    }

    pub async fn check_in_booking(&self, caller: &Caller, id: BookingId) -> BookingResult<Booking> {
        let booking = self.find_managed(caller, id).await?;
        self.apply_status(caller, booking, BookingStatus::CheckedIn).await
    }

    pub async fn complete_booking(&self, caller: &Caller, id: BookingId) -> BookingResult<Booking> {
        let booking = self.find_managed(caller, id).await?;
        self.apply_status(caller, booking, BookingStatus::Completed).await
    }

    pub async fn update_payment_status(
        &self,
        caller: &Caller,
        id: BookingId,
        target: PaymentStatus,
    ) -> BookingResult<Booking> {
        let mut booking = self.find_managed(caller, id).await?;

        // Statuses only move forward, so a lost race settles after a few rounds
        loop {
            let next = payment_transition(booking.payment_status, target)?;
            match self.store.update_payment_status(id, booking.payment_status, next).await {
                Ok(updated) => {
                    info!(
                        booking_id = %updated.booking_id,
                        user_id = %caller.user_id,
                        payment_status = %updated.payment_status,
                        "payment status updated"
                    );
                    return Ok(updated);
                }
                Err(StoreError::PaymentStatusChanged { current, .. }) => {
                    debug!(booking = %id, %current, "payment status changed concurrently, re-checking");
                    booking = self.find(id).await?;
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }
    }

    // Runs the transition against the stored status and writes it conditionally.
    // Losing a race re-reads the booking and re-checks the transition.
    async fn apply_status(&self, caller: &Caller, mut booking: Booking, target: BookingStatus) -> BookingResult<Booking> {
        loop {
            let next = match booking_transition(booking.status, target)? {
                Transition::Unchanged => {
                    debug!(booking_id = %booking.booking_id, status = %booking.status, "status already reached");
                    return Ok(booking);
                }
                Transition::Apply(next) => next,
            };

            match self.store.update_booking_status(booking.id, booking.status, next).await {
                Ok(updated) => {
                    info!(
                        booking_id = %updated.booking_id,
                        user_id = %caller.user_id,
                        status = %updated.status,
                        "booking status updated"
                    );
                    return Ok(updated);
                }
                Err(StoreError::StatusChanged { id, current }) => {
                    debug!(booking = %id, %current, "booking status changed concurrently, re-checking");
                    booking = self.find(id).await?;
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }
    }

    async fn find(&self, id: BookingId) -> BookingResult<Booking> {
        self.store
            .find_booking_by_id(id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(BookingError::booking_not_found)
    }

    async fn find_managed(&self, caller: &Caller, id: BookingId) -> BookingResult<Booking> {
        let booking = self.find(id).await?;
        let hotel = self
            .store
            .find_hotel_by_id(booking.hotel_id)
            .await
            .map_err(map_store_error)?;

        if !policy::can_manage_booking(caller, &booking, hotel.as_ref()) {
            warn!(user_id = %caller.user_id, booking = %id, "booking management denied");
            return Err(BookingError::forbidden());
        }
        Ok(booking)
    }
}

fn map_store_error(err: StoreError) -> BookingError {
    match err {
        StoreError::MissingHotel(_) | StoreError::MissingRoom(_) => BookingError::hotel_or_room_not_found(),
        StoreError::MissingBooking(_) => BookingError::booking_not_found(),
        StoreError::DuplicateReference(_) | StoreError::DuplicatePaymentReference(_) => {
            BookingError::conflict("Could not allocate a unique booking reference")
        }
        StoreError::InventoryExhausted(_) => {
            BookingError::conflict("No rooms available for the selected dates")
        }
        StoreError::StatusChanged { .. } | StoreError::PaymentStatusChanged { .. } => {
            BookingError::conflict("Booking was modified concurrently")
        }
        other @ StoreError::Unavailable(_) => BookingError::Storage(other),
    }
}
