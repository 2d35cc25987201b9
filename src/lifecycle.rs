// Booking and payment state machines.
//
//   upcoming -> checked-in -> completed
//   upcoming | checked-in -> cancelled
//
// completed and cancelled are terminal.

use crate::error::BookingError;
use crate::model::{BookingStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    // Target differs from current and is reachable
    Apply(BookingStatus),
    // Target equals current and repeating it is harmless
    Unchanged,
}

pub fn booking_transition(current: BookingStatus, target: BookingStatus) -> Result<Transition, BookingError> {
    use BookingStatus::*;

    match (current, target) {
        (Cancelled, Cancelled) => Ok(Transition::Unchanged),
        (Upcoming, CheckedIn) | (CheckedIn, Completed) | (Upcoming, Cancelled) | (CheckedIn, Cancelled) => {
            Ok(Transition::Apply(target))
        }
        (Completed, Cancelled) => Err(BookingError::conflict(
            "Completed bookings cannot be cancelled",
        )),
        _ => Err(BookingError::conflict(format!(
            "Cannot move booking from {} to {}",
            current, target
        ))),
    }
}

//   pending -> paid | failed
//   failed  -> paid
//   paid    -> refunded
pub fn payment_transition(current: PaymentStatus, target: PaymentStatus) -> Result<PaymentStatus, BookingError> {
    use PaymentStatus::*;

    match (current, target) {
        (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Paid, Refunded) => Ok(target),
        _ => Err(BookingError::conflict(format!(
            "Cannot move payment from {} to {}",
            current, target
        ))),
    }
}
