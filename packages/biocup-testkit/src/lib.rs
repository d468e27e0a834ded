//! Test support: an in-memory corpus behind the `ChunkRepository` seam, fixture builders, and
//! environment lookups for live backend tests.

pub mod fixtures;

pub use fixtures::{corpus_chunk, input_chunk, test_config};

use std::{
	cmp::Ordering,
	env,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering as AtomicOrdering},
	},
	time::Duration,
};

use color_eyre::eyre;

use biocup_domain::{ChunkPayload, CorpusChunk, RetrievedHit, SectionFilter, SparseVector};
use biocup_service::{BoxFuture, ChunkRepository};

pub fn env_qdrant_url() -> Option<String> {
	env::var("BIOCUP_QDRANT_URL").ok().filter(|url| !url.trim().is_empty())
}

#[derive(Debug, Default)]
struct FailurePlan {
	dense: usize,
	sparse: usize,
}

/// Brute-force dense cosine and sparse dot-product search over a fixed set of chunks, with the
/// same section and admin-noise filtering as the Qdrant store.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
	chunks: Vec<CorpusChunk>,
	ready: bool,
	latency: Option<Duration>,
	failures: Mutex<FailurePlan>,
	dense_calls: AtomicUsize,
	sparse_calls: AtomicUsize,
}
impl InMemoryRepository {
	pub fn new(chunks: Vec<CorpusChunk>) -> Self {
		Self { chunks, ready: true, ..Default::default() }
	}

	/// A repository whose collection does not exist.
	pub fn missing() -> Self {
		Self { ready: false, ..Default::default() }
	}

	/// Fails the next `count` dense queries.
	pub fn failing_dense(self, count: usize) -> Self {
		self.set_failures(|plan| plan.dense = count);

		self
	}

	/// Fails the next `count` sparse queries.
	pub fn failing_sparse(self, count: usize) -> Self {
		self.set_failures(|plan| plan.sparse = count);

		self
	}

	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);

		self
	}

	pub fn dense_calls(&self) -> usize {
		self.dense_calls.load(AtomicOrdering::SeqCst)
	}

	pub fn sparse_calls(&self) -> usize {
		self.sparse_calls.load(AtomicOrdering::SeqCst)
	}

	fn set_failures(&self, update: impl FnOnce(&mut FailurePlan)) {
		let mut plan = self.failures.lock().unwrap_or_else(|err| err.into_inner());

		update(&mut plan);
	}

	fn take_failure(&self, select: impl FnOnce(&mut FailurePlan) -> &mut usize) -> bool {
		let mut plan = self.failures.lock().unwrap_or_else(|err| err.into_inner());
		let remaining = select(&mut plan);

		if *remaining == 0 {
			return false;
		}

		*remaining -= 1;

		true
	}

	async fn simulate_latency(&self) {
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
	}

	fn rank<F>(&self, filter: &SectionFilter, limit: u32, score: F) -> Vec<RetrievedHit>
	where
		F: Fn(&CorpusChunk) -> Option<f32>,
	{
		let mut hits: Vec<RetrievedHit> = self
			.chunks
			.iter()
			.filter(|chunk| filter.matches(&chunk.payload))
			.filter_map(|chunk| {
				score(chunk).map(|similarity| RetrievedHit {
					chunk_id: chunk.payload.chunk_id.clone(),
					similarity,
					payload: stored_payload(&chunk.payload),
				})
			})
			.collect();

		hits.sort_by(|left, right| {
			match right.similarity.partial_cmp(&left.similarity).unwrap_or(Ordering::Equal) {
				Ordering::Equal => left.chunk_id.cmp(&right.chunk_id),
				other => other,
			}
		});
		hits.truncate(limit as usize);

		hits
	}
}
impl ChunkRepository for InMemoryRepository {
	fn dense_query<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, eyre::Result<Vec<RetrievedHit>>> {
		Box::pin(async move {
			self.dense_calls.fetch_add(1, AtomicOrdering::SeqCst);
			self.simulate_latency().await;

			if self.take_failure(|plan| &mut plan.dense) {
				return Err(eyre::eyre!("Injected dense query failure."));
			}

			Ok(self.rank(filter, limit, |chunk| Some(cosine(vector, &chunk.dense))))
		})
	}

	fn sparse_query<'a>(
		&'a self,
		vector: &'a SparseVector,
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, eyre::Result<Vec<RetrievedHit>>> {
		Box::pin(async move {
			self.sparse_calls.fetch_add(1, AtomicOrdering::SeqCst);
			self.simulate_latency().await;

			if self.take_failure(|plan| &mut plan.sparse) {
				return Err(eyre::eyre!("Injected sparse query failure."));
			}

			// Sparse search only returns points that share at least one term.
			Ok(self.rank(filter, limit, |chunk| {
				let score = vector.dot(&chunk.sparse);

				(score > 0.0).then_some(score)
			}))
		})
	}

	fn check_ready<'a>(&'a self) -> BoxFuture<'a, eyre::Result<()>> {
		Box::pin(async move {
			if self.ready {
				Ok(())
			} else {
				Err(eyre::eyre!("Collection does not exist."))
			}
		})
	}
}

pub fn cosine(left: &[f32], right: &[f32]) -> f32 {
	let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
	let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
	let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

	if left_norm == 0.0 || right_norm == 0.0 {
		return 0.0;
	}

	dot / (left_norm * right_norm)
}

// Mirrors payload decoding in the store: points without a case or site carry no payload.
fn stored_payload(payload: &ChunkPayload) -> Option<ChunkPayload> {
	if payload.case_id.trim().is_empty() || payload.primary_site.trim().is_empty() {
		return None;
	}

	Some(payload.clone())
}
