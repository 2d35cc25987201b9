// Error taxonomy for the booking core.
// Every failure carries a stable machine-readable kind and a human-readable message.

use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Authorization,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{} is required", field),
        }
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BookingError::InvalidInput {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn invalid_fields(errors: Vec<FieldError>) -> Self {
        BookingError::InvalidInput {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BookingError::NotFound(message.into())
    }

    pub fn booking_not_found() -> Self {
        BookingError::NotFound("Booking not found".to_string())
    }

    pub fn hotel_or_room_not_found() -> Self {
        BookingError::NotFound("Hotel or room not found".to_string())
    }

    pub fn forbidden() -> Self {
        BookingError::Authorization("Access denied. Insufficient permissions.".to_string())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BookingError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        BookingError::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidInput { .. } => ErrorKind::InvalidInput,
            BookingError::NotFound(_) => ErrorKind::NotFound,
            BookingError::Authorization(_) => ErrorKind::Authorization,
            BookingError::Conflict(_) => ErrorKind::Conflict,
            BookingError::Storage(_) | BookingError::Internal(_) => ErrorKind::Internal,
        }
    }

    // Status code the routing layer should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        if self.kind() == ErrorKind::Internal {
            tracing::error!(error = ?self, "Internal booking error");
        }

        let errors = match self {
            BookingError::InvalidInput { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };

        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(BookingError::invalid_input("Invalid date range"), "invalid_input", 400; "invalid input")]
    #[test_case(BookingError::hotel_or_room_not_found(), "not_found", 404; "not found")]
    #[test_case(BookingError::forbidden(), "authorization", 403; "authorization")]
    #[test_case(BookingError::conflict("Booking reference collision"), "conflict", 409; "conflict")]
    #[test_case(BookingError::Storage(StoreError::Unavailable("lock poisoned".into())), "internal", 500; "storage")]
    #[test_case(BookingError::internal("response encoding failed"), "internal", 500; "internal")]
    fn test_kind_and_status(err: BookingError, kind: &str, status: u16) {
        assert_eq!(err.kind().as_str(), kind);
        assert_eq!(err.status_code(), status);
    }

    #[test]
    fn test_response_lists_field_errors() {
        let err = BookingError::invalid_fields(vec![
            FieldError::required("room_id"),
            FieldError::required("check_in"),
        ]);
        let body = serde_json::to_value(err.to_response()).unwrap();

        assert_eq!(body["kind"], "invalid_input");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][0]["field"], "room_id");
    }

    #[test]
    fn test_response_omits_empty_errors() {
        let body = serde_json::to_value(BookingError::booking_not_found().to_response()).unwrap();
        assert_eq!(body["message"], "Booking not found");
        assert!(body.get("errors").is_none());
    }
}
