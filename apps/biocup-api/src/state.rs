use std::sync::Arc;

use biocup_service::{PredictionService, QdrantRepository};
use biocup_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PredictionService>,
}
impl AppState {
	/// Connects to Qdrant and fails early when the corpus collection is missing.
	pub async fn new(config: biocup_config::Config) -> color_eyre::Result<Self> {
		let store = QdrantStore::new(&config.storage.qdrant)?;

		store.verify_collection().await?;

		let service = PredictionService::new(config, Arc::new(QdrantRepository::new(store)))?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: PredictionService) -> Self {
		Self { service: Arc::new(service) }
	}
}
