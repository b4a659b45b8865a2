use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use outfitsave_core::OutfitSaveError;
use serde::Serialize;
use tracing::error;

/// Error returned by HTTP handlers.
///
/// Wraps [`OutfitSaveError`] and renders it as `{ "error": "..." }` with a
/// status derived from the error kind. Server-side failures are logged and
/// replaced by a generic message.
#[derive(Debug)]
pub struct ApiError(pub OutfitSaveError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            OutfitSaveError::NotFound(_) => StatusCode::NOT_FOUND,
            OutfitSaveError::Unauthorized => StatusCode::UNAUTHORIZED,
            OutfitSaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            OutfitSaveError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OutfitSaveError> for ApiError {
    fn from(err: OutfitSaveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("outfitsave-server: request failed: {}", self.0);
            match self.0 {
                OutfitSaveError::SlugAllocationExhausted { .. } => {
                    "Could not create a share link, please try again".to_string()
                }
                _ => "Internal server error".to_string(),
            }
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
