// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

pub const NO_ACTIVE_SESSION_MESSAGE: &str =
    "No active analysis session. Please start a new analysis.";

#[derive(Error, Debug)]
pub enum AutoCheckError {
    #[error("{}", NO_ACTIVE_SESSION_MESSAGE)]
    NoActiveSession,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend responded with {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Wizard flow {0} not found")]
    FlowNotFound(Uuid),

    #[error("No route matches {0}")]
    RouteNotFound(String),

    #[error("Analysis results for {0} are not available yet")]
    ResultsUnavailable(i64),
}

impl From<reqwest::Error> for AutoCheckError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AutoCheckError::Serialization(e.to_string())
        } else {
            AutoCheckError::Network(e.to_string())
        }
    }
}

impl ResponseError for AutoCheckError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AutoCheckError::NoActiveSession => HttpResponse::Conflict().json(serde_json::json!({
                "error": "No active session",
                "message": self.to_string()
            })),
            AutoCheckError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            AutoCheckError::Network(_) | AutoCheckError::Backend { .. } => {
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "Analysis backend error",
                    "message": self.to_string()
                }))
            }
            AutoCheckError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            AutoCheckError::FlowNotFound(_) | AutoCheckError::RouteNotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({
                    "error": "Not found",
                    "message": self.to_string()
                }))
            }
            AutoCheckError::ResultsUnavailable(_) => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "Results unavailable",
                    "message": self.to_string()
                }))
            }
        }
    }
}
