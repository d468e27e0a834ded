use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use biocup_service::{Error as ServiceError, InputBatch, Prediction};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/predict", post(predict))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn predict(
	State(state): State<AppState>,
	Json(batch): Json<InputBatch>,
) -> Result<Json<Prediction>, ApiError> {
	let prediction = state.service.predict_batch(batch).await?;

	Ok(Json(prediction))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::Alignment { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "alignment_error", message),
			ServiceError::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Configuration { .. } => {
				tracing::error!(error = %message, "Prediction backend is misconfigured.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", message)
			},
			ServiceError::Retrieval { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "retrieval_error", message),
			ServiceError::Timeout { .. } =>
				Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message),
			ServiceError::Internal { .. } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
