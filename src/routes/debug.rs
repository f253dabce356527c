use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};

use super::{ErrorResponse, non_empty};
use crate::assistant::{AssistantClient, render_questions};
use crate::sandbox::{ExecutionOutput, ExecutionRequest, ExecutionResult, Executor, Language};
use crate::steps::{ExecutionStep, execution_steps};

#[derive(Serialize, Deserialize, Debug)]
pub struct DebugRequest {
    pub code: Option<String>,
    pub language: Option<String>,
    pub user_input: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct DebugResponse {
    #[serde(flatten)]
    pub execution: ExecutionOutput,
    pub questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_steps: Option<Vec<ExecutionStep>>,
}

#[post("/debug")]
pub async fn debug_handler(
    executor: web::Data<Executor>,
    assistant: web::Data<AssistantClient>,
    body: web::Json<DebugRequest>,
) -> impl Responder {
    let DebugRequest {
        code,
        language,
        user_input,
    } = body.into_inner();

    let (Some(code), Some(language)) = (non_empty(code), non_empty(language)) else {
        return ErrorResponse::bad_request("Code or language missing");
    };

    let language = language.parse::<Language>();
    let execution = async {
        match &language {
            Ok(language) => {
                let request = ExecutionRequest::new(code.as_str(), *language, user_input);
                executor.execute(&request).await
            }
            Err(e) => {
                log::info!("Rejected debug request: {e}");
                ExecutionResult::from_error(e)
            }
        }
    };

    let (result, questions) = tokio::join!(execution, assistant.generate_questions(&code));

    let execution_steps = match language {
        Ok(Language::Python) => execution_steps(&code),
        _ => None,
    };

    HttpResponse::Ok().json(DebugResponse {
        execution: ExecutionOutput::from(&result),
        questions: render_questions(questions),
        execution_steps,
    })
}
