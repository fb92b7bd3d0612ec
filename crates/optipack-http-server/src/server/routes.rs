use crate::server::response;
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use optipack::PacketSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    with_middleware(
        Router::new()
            .route("/api/v1/packet/size", get(list_sizes).put(put_sizes))
            .route("/api/v1/packet/calculate", get(calculate))
            .route("/api/v1/health", get(health))
            .with_state(state),
    )
}

/// Panic recovery sits outermost so a panicking handler (or layer) still
/// answers with the service's 500 envelope instead of a torn connection.
fn with_middleware(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };
    tracing::error!(detail, "handler panicked");
    response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

#[derive(Debug, Serialize)]
struct SizesData {
    packet_sizes: Vec<PacketSize>,
}

async fn list_sizes(State(state): State<AppState>) -> Response {
    response::success(SizesData {
        packet_sizes: state.catalog().snapshot().sizes().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
struct PutSizesRequest {
    sizes: Vec<PacketSize>,
}

async fn put_sizes(State(state): State<AppState>, Json(request): Json<PutSizesRequest>) -> Response {
    match state.catalog().replace(request.sizes) {
        Ok(()) => {
            tracing::info!("packet sizes replaced");
            response::message("Packet sizes have been put successfully")
        }
        Err(error) => {
            tracing::warn!(%error, "rejected packet size update");
            response::error(StatusCode::BAD_REQUEST, error)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculateParams {
    #[serde(default)]
    items: String,
}

/// The size-to-count map sits directly at `optimal_packets`, with the
/// derived figures as siblings.
#[derive(Debug, Serialize)]
struct CalculateData<'a> {
    optimal_packets: &'a BTreeMap<PacketSize, u64>,
    total_capacity: u64,
    packet_count: u64,
    overshoot: u64,
}

/// `items` arrives as a string so out-of-range and garbage values get the
/// service's own error message instead of a generic extractor rejection.
async fn calculate(
    State(state): State<AppState>,
    Query(params): Query<CalculateParams>,
) -> Response {
    let Ok(items) = params.items.trim().parse::<u64>() else {
        tracing::warn!(items = %params.items, "rejected non-numeric items");
        return response::error(StatusCode::BAD_REQUEST, "items should be positive integer");
    };

    match state.calculate(items) {
        Ok(allocation) => response::success(CalculateData {
            optimal_packets: allocation.packets(),
            total_capacity: allocation.total_capacity(),
            packet_count: allocation.packet_count(),
            overshoot: allocation.overshoot(),
        }),
        Err(error) => {
            tracing::warn!(%error, items, "calculation failed");
            response::error(response::calculation_status(&error), error)
        }
    }
}

async fn health() -> Response {
    response::message("All services are up and running")
}
