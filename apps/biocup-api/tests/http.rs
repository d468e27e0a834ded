use std::{sync::Arc, time::Duration};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use biocup_api::{routes, state::AppState};
use biocup_domain::{Section, SparseVector};
use biocup_service::PredictionService;
use biocup_testkit::{InMemoryRepository, corpus_chunk, test_config};

const DIM: u32 = 4;

fn app_with(cfg: biocup_config::Config, repository: InMemoryRepository) -> Router {
	let service = PredictionService::new(cfg, Arc::new(repository))
		.expect("Failed to build prediction service.");

	routes::router(AppState::from_service(service))
}

fn app(repository: InMemoryRepository) -> Router {
	app_with(test_config(DIM), repository)
}

fn corpus_repository() -> InMemoryRepository {
	InMemoryRepository::new(vec![
		corpus_chunk(
			"l1-d",
			"case-l1",
			"lung",
			Section::Diagnosis,
			"Adenocarcinoma, TTF-1 positive.",
			vec![1.0, 0.0, 0.0, 0.0],
			SparseVector::new(vec![1], vec![1.0]),
		),
		corpus_chunk(
			"c1-d",
			"case-c1",
			"colon",
			Section::Diagnosis,
			"Adenocarcinoma, CDX2 positive.",
			vec![0.0, 1.0, 0.0, 0.0],
			SparseVector::new(vec![3], vec![1.0]),
		),
	])
}

fn lung_batch() -> Value {
	serde_json::json!({
		"meta": [{ "section": "diagnosis" }],
		"dense": [[1.0, 0.0, 0.0, 0.0]],
		"sparse": [{ "indices": [1], "values": [1.0] }]
	})
}

async fn post_predict(app: Router, payload: Value) -> (StatusCode, Value) {
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/predict")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/predict.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = serde_json::from_slice(&bytes).expect("Response body is not JSON.");

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let response = app(corpus_repository())
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn predict_returns_probabilities_and_trace() {
	let (status, json) = post_predict(app(corpus_repository()), lung_batch()).await;
	let probabilities = json["probabilities"].as_object().expect("probabilities is an object.");
	let total: f64 = probabilities.values().filter_map(Value::as_f64).sum();

	assert_eq!(status, StatusCode::OK);
	assert!((total - 100.0).abs() < 1e-9);
	assert_eq!(json["trace"]["sorted_sites"][0]["site"], "lung");
	assert_eq!(json["trace"]["n_input_chunks"], 1);
}

#[tokio::test]
async fn misaligned_batch_is_a_bad_request() {
	let payload = serde_json::json!({
		"meta": [{ "section": "IHC" }, { "section": "GROSS" }],
		"dense": [[1.0, 0.0, 0.0, 0.0]],
		"sparse": []
	});
	let (status, json) = post_predict(app(corpus_repository()), payload).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "alignment_error");
}

#[tokio::test]
async fn retrieval_failure_is_a_bad_gateway() {
	let (status, json) =
		post_predict(app(corpus_repository().failing_dense(1)), lung_batch()).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "retrieval_error");
}

#[tokio::test]
async fn missing_collection_is_a_server_error() {
	let (status, json) = post_predict(app(InMemoryRepository::missing()), lung_batch()).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json["error_code"], "configuration_error");
}

#[tokio::test]
async fn deadline_expiry_is_a_gateway_timeout() {
	let mut cfg = test_config(DIM);

	cfg.retrieval.request_timeout_ms = Some(10);

	let repository = corpus_repository().with_latency(Duration::from_millis(500));
	let (status, json) = post_predict(app_with(cfg, repository), lung_batch()).await;

	assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
	assert_eq!(json["error_code"], "timeout");
}
