use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{PointStruct, UpsertPointsBuilder, Value, Vector},
};
use uuid::Uuid;

use biocup_domain::{RetrievedHit, Section, SectionFilter, SparseVector};
use biocup_storage::{filter::to_qdrant_filter, payload, qdrant::QdrantStore};
use biocup_testkit::{corpus_chunk, test_config};

const DIM: u32 = 4;

fn test_store() -> Option<QdrantStore> {
	let url = biocup_testkit::env_qdrant_url()?;
	let mut cfg = test_config(DIM).storage.qdrant;

	cfg.url = url;
	cfg.collection = format!("biocup_test_{}", Uuid::new_v4().simple());

	Some(QdrantStore::new(&cfg).expect("Failed to build Qdrant client."))
}

#[tokio::test]
#[ignore = "Requires external Qdrant. Set BIOCUP_QDRANT_URL to run."]
async fn indexed_chunks_are_retrievable_with_section_filters() {
	let Some(store) = test_store() else {
		eprintln!(
			"Skipping indexed_chunks_are_retrievable_with_section_filters; set BIOCUP_QDRANT_URL to run this test."
		);

		return;
	};

	assert!(store.ensure_collection().await.expect("Failed to create collection."));
	assert!(!store.ensure_collection().await.expect("Failed to re-check collection."));

	store.verify_collection().await.expect("Bootstrapped collection fails verification.");

	let chunks = vec![
		corpus_chunk(
			"c-1",
			"case-1",
			"lung",
			Section::Diagnosis,
			"Adenocarcinoma, TTF-1 positive.",
			vec![1.0, 0.0, 0.0, 0.0],
			SparseVector::new(vec![1, 7], vec![1.0, 0.5]),
		),
		corpus_chunk(
			"c-2",
			"case-2",
			"colon",
			Section::Gross,
			"Specimen received in formalin.",
			vec![0.0, 1.0, 0.0, 0.0],
			SparseVector::new(vec![3], vec![1.0]),
		),
	];

	assert_eq!(store.upsert_chunks(&chunks).await.expect("Failed to upsert chunks."), 2);

	let filter = to_qdrant_filter(&SectionFilter::for_input(&Section::Diagnosis));
	let dense = store
		.dense_query(&[1.0, 0.0, 0.0, 0.0], &filter, 10)
		.await
		.expect("Dense query failed.");
	let sparse = store
		.sparse_query(&SparseVector::new(vec![1], vec![1.0]), &filter, 10)
		.await
		.expect("Sparse query failed.");
	let status = store.status().await.expect("Failed to read collection status.");
	let payload = dense[0].payload.as_ref().expect("Hit payload decodes.");

	assert_eq!(dense.len(), 1);
	assert_eq!(payload.chunk_id, "c-1");
	assert_eq!(payload.case_id, "case-1");
	assert_eq!(dense[0].chunk_id, biocup_storage::payload::stable_point_id("c-1").to_string());
	assert_eq!(sparse.len(), 1);
	assert!(status.exists);

	store
		.client
		.delete_collection(store.collection.clone())
		.await
		.expect("Failed to drop test collection.");
}

#[tokio::test]
#[ignore = "Requires external Qdrant. Set BIOCUP_QDRANT_URL to run."]
async fn integer_flagged_admin_noise_is_excluded() {
	let Some(store) = test_store() else {
		eprintln!(
			"Skipping integer_flagged_admin_noise_is_excluded; set BIOCUP_QDRANT_URL to run this test."
		);

		return;
	};

	store.ensure_collection().await.expect("Failed to create collection.");

	let clean = corpus_chunk(
		"c-clean",
		"case-1",
		"lung",
		Section::Diagnosis,
		"Adenocarcinoma, TTF-1 positive.",
		vec![1.0, 0.0, 0.0, 0.0],
		SparseVector::new(vec![1], vec![1.0]),
	);
	let noise = corpus_chunk(
		"c-noise",
		"case-2",
		"breast",
		Section::Diagnosis,
		"Electronically signed by the attending pathologist.",
		vec![1.0, 0.0, 0.0, 0.0],
		SparseVector::new(vec![1], vec![2.0]),
	);

	assert_eq!(store.upsert_chunks(&[clean]).await.expect("Failed to upsert clean chunk."), 1);

	let mut legacy_payload = payload::encode_payload(&noise.payload);

	legacy_payload.insert("is_admin_noise".to_string(), Value::from(1_i64));

	let mut vectors = HashMap::new();

	vectors.insert(store.dense_vector_name.clone(), Vector::from(noise.dense.clone()));
	vectors.insert(
		store.sparse_vector_name.clone(),
		Vector::new_sparse(noise.sparse.indices.clone(), noise.sparse.values.clone()),
	);

	let point = PointStruct::new(
		payload::stable_point_id("c-noise").to_string(),
		vectors,
		Payload::from(legacy_payload),
	);

	store
		.client
		.upsert_points(UpsertPointsBuilder::new(store.collection.clone(), vec![point]).wait(true))
		.await
		.expect("Failed to upsert integer-flagged point.");

	let filter = to_qdrant_filter(&SectionFilter::for_input(&Section::Diagnosis));
	let dense = store
		.dense_query(&[1.0, 0.0, 0.0, 0.0], &filter, 10)
		.await
		.expect("Dense query failed.");
	let sparse = store
		.sparse_query(&SparseVector::new(vec![1], vec![1.0]), &filter, 10)
		.await
		.expect("Sparse query failed.");
	let ids = |hits: &[RetrievedHit]| {
		hits.iter()
			.filter_map(|hit| hit.payload.as_ref().map(|payload| payload.chunk_id.clone()))
			.collect::<Vec<_>>()
	};

	assert_eq!(ids(&dense), vec!["c-clean".to_string()]);
	assert_eq!(ids(&sparse), vec!["c-clean".to_string()]);

	store
		.client
		.delete_collection(store.collection.clone())
		.await
		.expect("Failed to drop test collection.");
}

#[tokio::test]
#[ignore = "Requires external Qdrant. Set BIOCUP_QDRANT_URL to run."]
async fn missing_collection_is_reported() {
	let Some(store) = test_store() else {
		eprintln!("Skipping missing_collection_is_reported; set BIOCUP_QDRANT_URL to run this test.");

		return;
	};

	assert!(matches!(
		store.verify_collection().await,
		Err(biocup_storage::Error::MissingCollection(_))
	));
	assert!(!store.status().await.expect("Failed to read collection status.").exists);
}
