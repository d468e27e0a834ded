mod aggregate;
mod calibrate;
mod evidence;
mod fusion;
mod reduce;
mod sites;

use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet},
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet, time};

use crate::{ChunkRepository, Error, InputBatch, PredictionService, Result};
use aggregate::CaseTable;
use biocup_domain::{InputChunk, Section, SectionFilter};
use calibrate::ScoredCase;
use reduce::ChunkOutcome;

const MAX_RETRY_BACKOFF_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
	/// Site label to percentage; sums to 100 unless empty.
	pub probabilities: BTreeMap<String, f64>,
	pub trace: PredictionTrace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionTrace {
	pub sorted_sites: Vec<SiteProbability>,
	/// Site scores after the weak-evidence penalty, before normalization.
	pub site_scores: BTreeMap<String, f64>,
	pub site_strong_counts: BTreeMap<String, usize>,
	pub evidence_by_site: BTreeMap<String, Vec<EvidenceItem>>,
	pub per_case_support_counts: BTreeMap<String, usize>,
	pub n_input_chunks: usize,
	pub parameters: PredictionParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteProbability {
	pub site: String,
	pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
	pub case_id: String,
	pub chunk_id: String,
	pub section: Section,
	pub score: f64,
	pub snippet: String,
}

/// The tunables a prediction ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionParameters {
	pub k_dense: u32,
	pub k_sparse: u32,
	pub k_fused: u32,
	pub rrf_k: u32,
	pub max_cases_per_input_chunk: u32,
	pub consistency_bonus: f64,
	pub section_weights: BTreeMap<String, f64>,
	pub default_section_weight: f64,
	pub strong_evidence_min: u32,
	pub weak_site_penalty: f64,
	pub max_evidence_per_site: u32,
	pub snippet_chars: u32,
}

#[derive(Debug, Clone, Copy)]
struct ChunkPlan {
	k_dense: u32,
	k_sparse: u32,
	k_fused: usize,
	rrf_k: u32,
	max_cases: usize,
	max_attempts: u32,
	retry_backoff_ms: u64,
}

impl PredictionService {
	pub async fn predict_batch(&self, batch: InputBatch) -> Result<Prediction> {
		let chunks = batch.into_chunks(self.cfg.storage.qdrant.vector_dim)?;

		self.predict(chunks).await
	}

	/// Scores every corpus site against the input chunks.
	///
	/// Either the whole prediction succeeds or the first error is returned; no partial result
	/// is ever produced.
	pub async fn predict(&self, chunks: Vec<InputChunk>) -> Result<Prediction> {
		match self.cfg.retrieval.request_timeout_ms {
			Some(timeout_ms) => time::timeout(Duration::from_millis(timeout_ms), self.run(chunks))
				.await
				.map_err(|_| Error::Timeout { timeout_ms })?,
			None => self.run(chunks).await,
		}
	}

	async fn run(&self, chunks: Vec<InputChunk>) -> Result<Prediction> {
		let started = Instant::now();
		let n_input_chunks = chunks.len();

		self.check_chunks(&chunks)?;
		self.repository
			.check_ready()
			.await
			.map_err(|err| Error::Configuration { message: err.to_string() })?;

		let outcomes = self.retrieve_all(chunks).await?;
		let table = aggregate::fold_outcomes(outcomes);
		let prediction = self.assemble(table, n_input_chunks);

		tracing::info!(
			input_chunks = n_input_chunks,
			cases = prediction.trace.per_case_support_counts.len(),
			sites = prediction.probabilities.len(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Prediction completed."
		);

		Ok(prediction)
	}

	fn check_chunks(&self, chunks: &[InputChunk]) -> Result<()> {
		let vector_dim = self.cfg.storage.qdrant.vector_dim as usize;
		let mut seen = BTreeSet::new();

		for chunk in chunks {
			if !seen.insert(chunk.index) {
				return Err(Error::Alignment {
					message: format!("input chunk index {} appears more than once.", chunk.index),
				});
			}
			if chunk.dense.len() != vector_dim {
				return Err(Error::Alignment {
					message: format!(
						"input chunk {} has {} dense dimensions; expected {vector_dim}.",
						chunk.index,
						chunk.dense.len()
					),
				});
			}
			if !chunk.sparse.is_aligned() {
				return Err(Error::Alignment {
					message: format!(
						"input chunk {} has a sparse vector with mismatched indices and values.",
						chunk.index
					),
				});
			}
		}

		Ok(())
	}

	async fn retrieve_all(&self, chunks: Vec<InputChunk>) -> Result<Vec<ChunkOutcome>> {
		let retrieval = &self.cfg.retrieval;
		let plan = ChunkPlan {
			k_dense: retrieval.k_dense,
			k_sparse: retrieval.k_sparse,
			k_fused: retrieval.k_fused as usize,
			rrf_k: retrieval.rrf_k,
			max_cases: self.cfg.aggregation.max_cases_per_input_chunk as usize,
			max_attempts: retrieval.max_attempts.max(1),
			retry_backoff_ms: retrieval.retry_backoff_ms,
		};
		let semaphore = Arc::new(Semaphore::new(retrieval.max_concurrency.max(1) as usize));
		let mut tasks: JoinSet<Result<ChunkOutcome>> = JoinSet::new();
		let mut outcomes = Vec::with_capacity(chunks.len());

		for chunk in chunks {
			let repository = Arc::clone(&self.repository);
			let semaphore = Arc::clone(&semaphore);
			let section_weight = self.weights().weight(&chunk.section);

			tasks.spawn(async move {
				let _permit = semaphore.acquire_owned().await.map_err(|err| Error::Internal {
					message: format!("Retrieval limiter closed: {err}."),
				})?;

				run_chunk(repository.as_ref(), plan, section_weight, chunk).await
			});
		}

		// Dropping the set on an early return aborts the remaining chunk cycles.
		while let Some(joined) = tasks.join_next().await {
			let outcome = joined.map_err(|err| Error::Internal {
				message: format!("Retrieval task failed: {err}."),
			})??;

			outcomes.push(outcome);
		}

		Ok(outcomes)
	}

	fn assemble(&self, table: CaseTable, n_input_chunks: usize) -> Prediction {
		let aggregation = &self.cfg.aggregation;
		let calibration = &self.cfg.calibration;
		let evidence_cfg = &self.cfg.evidence;
		let per_case_support_counts = table
			.entries()
			.map(|entry| (entry.case_id.clone(), entry.support_count()))
			.collect::<BTreeMap<_, _>>();
		let cases = table
			.into_entries()
			.map(|entry| {
				calibrate::score_case(entry, aggregation.consistency_bonus, self.calibrator())
			})
			.collect::<Vec<ScoredCase>>();
		let mut site_scores = sites::sum_site_scores(&cases);
		let evidence_by_site = evidence::select_evidence(
			&cases,
			evidence_cfg.max_per_site as usize,
			evidence_cfg.snippet_chars as usize,
		);
		let site_strong_counts = evidence::strong_counts(&evidence_by_site);

		calibrate::apply_weak_site_penalty(
			&mut site_scores,
			&site_strong_counts,
			calibration.strong_evidence_min as usize,
			calibration.weak_site_penalty,
		);

		let probabilities = sites::normalize(&site_scores);
		let sorted_sites = sites::sort_sites(&probabilities);

		Prediction {
			probabilities,
			trace: PredictionTrace {
				sorted_sites,
				site_scores,
				site_strong_counts,
				evidence_by_site,
				per_case_support_counts,
				n_input_chunks,
				parameters: self.parameters(),
			},
		}
	}

	pub fn parameters(&self) -> PredictionParameters {
		let cfg = &self.cfg;

		PredictionParameters {
			k_dense: cfg.retrieval.k_dense,
			k_sparse: cfg.retrieval.k_sparse,
			k_fused: cfg.retrieval.k_fused,
			rrf_k: cfg.retrieval.rrf_k,
			max_cases_per_input_chunk: cfg.aggregation.max_cases_per_input_chunk,
			consistency_bonus: cfg.aggregation.consistency_bonus,
			section_weights: cfg.aggregation.section_weights.clone(),
			default_section_weight: cfg.aggregation.default_section_weight,
			strong_evidence_min: cfg.calibration.strong_evidence_min,
			weak_site_penalty: cfg.calibration.weak_site_penalty,
			max_evidence_per_site: cfg.evidence.max_per_site,
			snippet_chars: cfg.evidence.snippet_chars,
		}
	}
}

pub(crate) fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

async fn run_chunk(
	repository: &dyn ChunkRepository,
	plan: ChunkPlan,
	section_weight: f64,
	chunk: InputChunk,
) -> Result<ChunkOutcome> {
	let filter = SectionFilter::for_input(&chunk.section);
	let dense_query = with_retry(plan, chunk.index, "dense", || {
		repository.dense_query(&chunk.dense, &filter, plan.k_dense)
	});
	let sparse_query = with_retry(plan, chunk.index, "sparse", || {
		repository.sparse_query(&chunk.sparse, &filter, plan.k_sparse)
	});
	let (dense, sparse) = tokio::try_join!(dense_query, sparse_query)?;
	let fused = fusion::rrf_fuse(&[dense.as_slice(), sparse.as_slice()], plan.rrf_k, plan.k_fused);
	let fused_hits = fused.len();
	let outcome = reduce::reduce_chunk(chunk.index, fused, section_weight, plan.max_cases);

	if outcome.dropped_hits > 0 {
		tracing::warn!(
			chunk_index = chunk.index,
			dropped_hits = outcome.dropped_hits,
			"Dropped fused hits without case_id or primary_site."
		);
	}

	tracing::debug!(
		chunk_index = chunk.index,
		section = chunk.section.as_str(),
		dense_hits = dense.len(),
		sparse_hits = sparse.len(),
		fused_hits,
		cases_kept = outcome.cases.len(),
		"Input chunk reduced."
	);

	Ok(outcome)
}

async fn with_retry<T, F, Fut>(
	plan: ChunkPlan,
	chunk_index: usize,
	modality: &'static str,
	mut query: F,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = color_eyre::Result<T>>,
{
	let mut attempt = 1;

	loop {
		match query().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < plan.max_attempts => {
				let backoff = retry_backoff(plan.retry_backoff_ms, attempt);

				tracing::warn!(
					error = %err,
					chunk_index,
					modality,
					attempt,
					backoff_ms = backoff.as_millis() as u64,
					"Retrieval attempt failed; retrying."
				);
				time::sleep(backoff).await;

				attempt += 1;
			},
			Err(err) => {
				return Err(Error::Retrieval { chunk_index, modality, message: err.to_string() });
			},
		}
	}
}

fn retry_backoff(base_ms: u64, attempt: u32) -> Duration {
	let factor = 1_u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);

	Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
}
