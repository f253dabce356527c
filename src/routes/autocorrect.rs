use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};

use super::{ErrorResponse, non_empty};
use crate::assistant::{AssistantClient, render_correction};

#[derive(Serialize, Deserialize, Debug)]
pub struct AutocorrectRequest {
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AutocorrectResponse {
    pub corrected_code: String,
}

#[post("/autocorrect")]
pub async fn autocorrect_handler(
    assistant: web::Data<AssistantClient>,
    body: web::Json<AutocorrectRequest>,
) -> impl Responder {
    let Some(code) = non_empty(body.into_inner().code) else {
        return ErrorResponse::bad_request("Code missing");
    };

    let corrected_code = render_correction(assistant.correct_code(&code).await);
    HttpResponse::Ok().json(AutocorrectResponse { corrected_code })
}
