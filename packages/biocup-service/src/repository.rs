use biocup_domain::{RetrievedHit, SectionFilter, SparseVector};
use biocup_storage::{filter::to_qdrant_filter, qdrant::QdrantStore};

use crate::{BoxFuture, ChunkRepository};

pub struct QdrantRepository {
	pub store: QdrantStore,
}
impl QdrantRepository {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}
}
impl ChunkRepository for QdrantRepository {
	fn dense_query<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedHit>>> {
		Box::pin(async move {
			let filter = to_qdrant_filter(filter);

			Ok(self.store.dense_query(vector, &filter, limit).await?)
		})
	}

	fn sparse_query<'a>(
		&'a self,
		vector: &'a SparseVector,
		filter: &'a SectionFilter,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RetrievedHit>>> {
		Box::pin(async move {
			let filter = to_qdrant_filter(filter);

			Ok(self.store.sparse_query(vector, &filter, limit).await?)
		})
	}

	fn check_ready<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(self.store.verify_collection().await?) })
	}
}
