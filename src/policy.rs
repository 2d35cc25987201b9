// Authorization policy for booking operations.
// Each rule is a pure predicate over the caller and the resource.

use crate::model::{Booking, Hotel, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Hotelier,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

// Authenticated identity, resolved by the transport before reaching the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    #[serde(default)]
    pub role: Role,
}

impl Caller {
    pub fn user(id: u64) -> Self {
        Self {
            user_id: UserId(id),
            role: Role::User,
        }
    }

    pub fn hotelier(id: u64) -> Self {
        Self {
            user_id: UserId(id),
            role: Role::Hotelier,
        }
    }

    pub fn admin(id: u64) -> Self {
        Self {
            user_id: UserId(id),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn owns_booking(caller: &Caller, booking: &Booking) -> bool {
    caller.user_id == booking.user_id
}

pub fn owns_hotel(caller: &Caller, hotel: &Hotel) -> bool {
    caller.role == Role::Hotelier && caller.user_id == hotel.owner_id
}

// Guest, the hotelier running the hotel, or an admin.
// `hotel` is None when the hotel record is gone.
pub fn can_view_booking(caller: &Caller, booking: &Booking, hotel: Option<&Hotel>) -> bool {
    caller.is_admin()
        || owns_booking(caller, booking)
        || hotel.map_or(false, |h| h.id == booking.hotel_id && owns_hotel(caller, h))
}

pub fn can_cancel_booking(caller: &Caller, booking: &Booking) -> bool {
    caller.is_admin() || owns_booking(caller, booking)
}

// Check-in, completion and payment updates
pub fn can_manage_booking(caller: &Caller, booking: &Booking, hotel: Option<&Hotel>) -> bool {
    caller.is_admin() || hotel.map_or(false, |h| h.id == booking.hotel_id && owns_hotel(caller, h))
}

pub fn can_list_hotel_bookings(caller: &Caller) -> bool {
    matches!(caller.role, Role::Hotelier | Role::Admin)
}
