use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Internal error")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::Validation(details) => {
                json!({ "error": self.to_string(), "details": details })
            }
            AppError::OrderNotFound(_) => json!({ "error": self.to_string() }),
            AppError::Store(cause) => {
                // The concrete cause goes to the log, never to the client.
                error!("store failure: {cause}");
                json!({ "error": "Internal error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
