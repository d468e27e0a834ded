pub mod batch;
pub mod predict;
pub mod repository;

mod error;

pub use batch::{CorpusBatch, InputBatch, InputChunkMeta};
pub use error::{Error, Result};
pub use predict::{
	EvidenceItem, Prediction, PredictionParameters, PredictionTrace, SiteProbability,
};
pub use repository::QdrantRepository;

use std::{future::Future, pin::Pin, sync::Arc};

use biocup_config::Config;
use biocup_domain::{QualityCalibrator, RetrievedHit, SectionFilter, SectionWeights, SparseVector};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only access to the indexed corpus. Both queries return hits ordered best-first.
pub trait ChunkRepository
where
	Self: Send + Sync,
{
	fn dense_query<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedHit>>>;

	fn sparse_query<'a>(
		&'a self,
		vector: &'a SparseVector,
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedHit>>>;

	/// Fails when the backing collection or either vector space is unavailable.
	fn check_ready<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<()>>;
}

pub struct PredictionService {
	pub cfg: Config,
	pub repository: Arc<dyn ChunkRepository>,
	calibrator: QualityCalibrator,
	weights: SectionWeights,
}
impl PredictionService {
	pub fn new(cfg: Config, repository: Arc<dyn ChunkRepository>) -> Result<Self> {
		let calibrator = QualityCalibrator::new(&cfg.calibration)?;
		let weights = SectionWeights::from_config(&cfg.aggregation);

		Ok(Self { cfg, repository, calibrator, weights })
	}

	pub fn calibrator(&self) -> &QualityCalibrator {
		&self.calibrator
	}

	pub fn weights(&self) -> &SectionWeights {
		&self.weights
	}
}
