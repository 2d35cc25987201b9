// Line-oriented driver for the booking core.
// Reads one JSON command per stdin line and answers with one JSON line.
//
//   {"command":"create","caller":{"user_id":5},"booking":{"hotel_id":1,...}}
//   {"command":"cancel","caller":{"user_id":5},"id":1}

use anyhow::Context;
use heavenstay_booking::{
    telemetry, BookingConfig, BookingError, BookingFilter, BookingId, BookingRequest,
    BookingService, BookingStore, Caller, Catalog, ErrorResponse, InMemoryStore, Page,
    PaymentStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Command {
    Create {
        caller: Caller,
        booking: BookingRequest,
    },
    List {
        caller: Caller,
        #[serde(default)]
        filter: BookingFilter,
        page: Option<Page>,
    },
    HotelList {
        caller: Caller,
        #[serde(default)]
        filter: BookingFilter,
        page: Option<Page>,
    },
    Get {
        caller: Caller,
        id: BookingId,
    },
    Cancel {
        caller: Caller,
        id: BookingId,
    },
    CheckIn {
        caller: Caller,
        id: BookingId,
    },
    Complete {
        caller: Caller,
        id: BookingId,
    },
    Payment {
        caller: Caller,
        id: BookingId,
        status: PaymentStatus,
    },
    PaymentInfo {
        caller: Caller,
        id: BookingId,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Ok {
        ok: bool,
        data: Value,
    },
    Err {
        ok: bool,
        status: u16,
        error: ErrorResponse,
    },
}

impl Response {
    fn success(data: Value) -> Self {
        Response::Ok { ok: true, data }
    }

    fn failure(err: &BookingError) -> Self {
        Response::Err {
            ok: false,
            status: err.status_code(),
            error: err.to_response(),
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, BookingError> {
    serde_json::to_value(value)
        .map_err(|e| BookingError::internal(format!("Unserializable response: {}", e)))
}

async fn dispatch<S: BookingStore>(service: &BookingService<S>, command: Command) -> Result<Value, BookingError> {
    match command {
        Command::Create { caller, booking } => to_value(&service.create_booking(&caller, booking).await?),
        Command::List { caller, filter, page } => {
            let bookings = service.list_bookings(&caller, &filter).await?;
            to_value(&page.unwrap_or_default().apply(bookings))
        }
        Command::HotelList { caller, filter, page } => {
            let bookings = service.list_hotel_bookings(&caller, &filter).await?;
            to_value(&page.unwrap_or_default().apply(bookings))
        }
        Command::Get { caller, id } => to_value(&service.get_booking(&caller, id).await?),
        Command::Cancel { caller, id } => to_value(&service.cancel_booking(&caller, id).await?),
        Command::CheckIn { caller, id } => to_value(&service.check_in_booking(&caller, id).await?),
        Command::Complete { caller, id } => to_value(&service.complete_booking(&caller, id).await?),
        Command::Payment { caller, id, status } => {
            to_value(&service.update_payment_status(&caller, id, status).await?)
        }
        Command::PaymentInfo { caller, id } => to_value(&service.get_payment(&caller, id).await?),
    }
}

async fn handle_line<S: BookingStore>(service: &BookingService<S>, line: &str) -> Response {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "malformed command");
            return Response::failure(&BookingError::invalid_input(format!("Malformed command: {}", e)));
        }
    };

    match dispatch(service, command).await {
        Ok(data) => Response::success(data),
        Err(err) => Response::failure(&err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;

    let config = BookingConfig::from_env()?;
    info!(
        tax_rate = %config.tax_rate,
        commission_rate = %config.commission_rate,
        reference_prefix = %config.reference_prefix,
        catalog = %config.catalog_path.display(),
        "Configuration loaded"
    );

    let catalog = Catalog::load(&config.catalog_path)
        .with_context(|| format!("loading catalog from {}", config.catalog_path.display()))?;
    info!(
        hotels = catalog.hotels.len(),
        rooms = catalog.rooms.len(),
        "Catalog loaded"
    );

    let store = Arc::new(InMemoryStore::from_catalog(catalog));
    let service = BookingService::new(Arc::clone(&store), config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&service, &line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    let stats = store.stats();
    info!(
        bookings_created = stats.bookings_created,
        status_updates = stats.status_updates,
        rejected_writes = stats.rejected_writes,
        "Input closed, shutting down"
    );

    Ok(())
}
