mod autocorrect;
mod debug;

pub use autocorrect::{AutocorrectRequest, AutocorrectResponse, autocorrect_handler};
pub use debug::{DebugRequest, DebugResponse, debug_handler};

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, Responder, get};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn bad_request(message: impl Into<String>) -> HttpResponse {
        HttpResponse::BadRequest().json(Self {
            error: message.into(),
        })
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected request body: {err}");
    let response = ErrorResponse::bad_request(format!("Invalid request body: {err}"));
    InternalError::from_response(err, response).into()
}

/// Treats a missing and an empty field alike
fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}
