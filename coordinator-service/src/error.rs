use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brewcrew_shared::models::{LevelOutOfRange, UnknownDrink};
use brewcrew_shared::store::StoreError;
use log::error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// No usable actor identity on the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The actor is not allowed to do this (usually: not a member).
    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Invite already consumed, inactive or unknown.
    #[error("Invite redemption failed: {0}")]
    RedemptionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl AppError {
    pub fn unauthorized(msg: String) -> Self {
        AppError::Unauthorized(msg)
    }

    pub fn forbidden(msg: String) -> Self {
        AppError::Forbidden(msg)
    }

    pub fn bad_request(msg: String) -> Self {
        AppError::BadRequest(msg)
    }

    pub fn redemption_failed(msg: String) -> Self {
        AppError::RedemptionFailed(msg)
    }

    pub fn not_found(msg: String) -> Self {
        AppError::NotFound(msg)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RedemptionFailed(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::not_found(what),
            other => AppError::Store(other),
        }
    }
}

impl From<LevelOutOfRange> for AppError {
    fn from(e: LevelOutOfRange) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<UnknownDrink> for AppError {
    fn from(e: UnknownDrink) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(e) => {
                error!("Store failure while handling request: {}", e);
                "Something went wrong, please try again later".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
