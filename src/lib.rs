// Booking core for the Heaven Stay hotel platform

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod money;
pub mod policy;
pub mod pricing;
pub mod reference;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod validation;

// Re-export key types for convenience
pub use config::{BookingConfig, ConfigError};
pub use error::{BookingError, BookingResult, ErrorKind, ErrorResponse, FieldError};
pub use memory::{Catalog, InMemoryStore, StoreStatsReport};
pub use model::{
    Booking, BookingFilter, BookingId, BookingReference, BookingStatus, Hotel, HotelId,
    HotelStatus, Payment, PaymentMethod, PaymentStatus, Room, RoomId, UserId,
};
pub use money::Money;
pub use policy::{Caller, Role};
pub use pricing::{PayoutSplit, PriceQuote, Rate};
pub use reference::{ReferenceGenerator, TimestampReferenceGenerator};
pub use service::{BookingPage, BookingService, Page};
pub use store::{BookingStore, StoreError};
pub use validation::BookingRequest;
