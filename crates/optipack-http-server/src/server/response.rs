use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The JSON envelope every endpoint answers with. Empty fields are omitted,
/// so successes carry `data` (and sometimes `msg`) while failures carry
/// only `err`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            data: Some(data),
            err: None,
            msg: None,
        }),
    )
        .into_response()
}

pub fn message(msg: &str) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::<()> {
            data: None,
            err: None,
            msg: Some(msg.to_owned()),
        }),
    )
        .into_response()
}

pub fn error(status: StatusCode, err: impl ToString) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            data: None,
            err: Some(err.to_string()),
            msg: None,
        }),
    )
        .into_response()
}

/// Status for an engine failure during a calculation. Catalog validation
/// errors never reach this path (`replace` maps them to 400 directly);
/// `EmptyCatalog` here means the service was somehow started without sizes,
/// and `UnreachableResidue` is a broken internal invariant.
pub fn calculation_status(error: &optipack::Error) -> StatusCode {
    match error {
        optipack::Error::InvalidItems { .. } => StatusCode::BAD_REQUEST,
        optipack::Error::EmptyCatalog => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
