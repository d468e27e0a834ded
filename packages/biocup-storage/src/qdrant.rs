use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType, Filter,
		HnswConfigDiffBuilder, Modifier, PointStruct, Query, QueryPointsBuilder, ScoredPoint,
		SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder, Vector,
		VectorInput, VectorParamsBuilder, VectorsConfigBuilder, vectors_config,
	},
};

use crate::{
	Error, Result,
	payload::{self, CASE_ID_KEY, PRIMARY_SITE_KEY},
};
use biocup_domain::{CorpusChunk, RetrievedHit, SparseVector};

pub const UPSERT_BATCH_SIZE: usize = 128;
pub const HNSW_M: u64 = 16;
pub const HNSW_EF_CONSTRUCT: u64 = 256;

const KEYWORD_INDEXES: [&str; 3] = ["section", CASE_ID_KEY, PRIMARY_SITE_KEY];
const BOOL_INDEXES: [&str; 4] = ["has_ihc", "has_lymph", "has_margins", "is_admin_noise"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStatus {
	pub exists: bool,
	pub points_count: Option<u64>,
}

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	pub dense_vector_name: String,
	pub sparse_vector_name: String,
}
impl QdrantStore {
	pub fn new(cfg: &biocup_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			dense_vector_name: cfg.dense_vector_name.clone(),
			sparse_vector_name: cfg.sparse_vector_name.clone(),
		})
	}

	/// Creates the hybrid collection and its payload indexes when it does not exist yet.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(false);
		}

		let mut vectors = VectorsConfigBuilder::default();

		vectors.add_named_vector_params(
			self.dense_vector_name.as_str(),
			VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
		);

		let mut sparse = SparseVectorsConfigBuilder::default();

		sparse.add_named_vector_params(
			self.sparse_vector_name.as_str(),
			SparseVectorParamsBuilder::default().modifier(Modifier::Idf),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone())
					.vectors_config(vectors)
					.sparse_vectors_config(sparse)
					.hnsw_config(
						HnswConfigDiffBuilder::default().m(HNSW_M).ef_construct(HNSW_EF_CONSTRUCT),
					),
			)
			.await?;

		for (field, field_type) in KEYWORD_INDEXES
			.iter()
			.map(|field| (*field, FieldType::Keyword))
			.chain(BOOL_INDEXES.iter().map(|field| (*field, FieldType::Bool)))
		{
			self.client
				.create_field_index(CreateFieldIndexCollectionBuilder::new(
					self.collection.clone(),
					field,
					field_type,
				))
				.await?;
		}

		tracing::info!(collection = %self.collection, "Created hybrid collection.");

		Ok(true)
	}

	/// Fails unless the collection exists with both named vector spaces.
	pub async fn verify_collection(&self) -> Result<()> {
		if !self.client.collection_exists(self.collection.clone()).await? {
			return Err(Error::MissingCollection(self.collection.clone()));
		}

		let info = self.client.collection_info(self.collection.clone()).await?;
		let params = info.result.and_then(|info| info.config).and_then(|config| config.params);
		let Some(params) = params else {
			return Err(Error::MissingVectorSpace {
				collection: self.collection.clone(),
				name: self.dense_vector_name.clone(),
			});
		};
		let has_dense = match params.vectors_config.and_then(|vectors| vectors.config) {
			Some(vectors_config::Config::ParamsMap(named)) =>
				named.map.contains_key(&self.dense_vector_name),
			_ => false,
		};

		if !has_dense {
			return Err(Error::MissingVectorSpace {
				collection: self.collection.clone(),
				name: self.dense_vector_name.clone(),
			});
		}

		let has_sparse = params
			.sparse_vectors_config
			.map(|sparse| sparse.map.contains_key(&self.sparse_vector_name))
			.unwrap_or(false);

		if !has_sparse {
			return Err(Error::MissingVectorSpace {
				collection: self.collection.clone(),
				name: self.sparse_vector_name.clone(),
			});
		}

		Ok(())
	}

	pub async fn status(&self) -> Result<CollectionStatus> {
		if !self.client.collection_exists(self.collection.clone()).await? {
			return Ok(CollectionStatus { exists: false, points_count: None });
		}

		let info = self.client.collection_info(self.collection.clone()).await?;
		let points_count = info.result.and_then(|info| info.points_count);

		Ok(CollectionStatus { exists: true, points_count })
	}

	pub async fn upsert_chunks(&self, chunks: &[CorpusChunk]) -> Result<usize> {
		let mut written = 0;

		for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
			let mut points = Vec::with_capacity(batch.len());

			for chunk in batch {
				points.push(self.build_point(chunk)?);
			}

			self.client
				.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
				.await?;

			written += batch.len();

			tracing::info!(written, total = chunks.len(), "Upserted corpus chunks.");
		}

		Ok(written)
	}

	pub async fn dense_query(
		&self,
		vector: &[f32],
		filter: &Filter,
		limit: u32,
	) -> Result<Vec<RetrievedHit>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Dense query has {} dimensions; collection expects {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let query = Query::new_nearest(vector.to_vec());
		let points = self.run_query(query, self.dense_vector_name.as_str(), filter, limit).await?;

		Ok(collect_hits(points))
	}

	pub async fn sparse_query(
		&self,
		vector: &SparseVector,
		filter: &Filter,
		limit: u32,
	) -> Result<Vec<RetrievedHit>> {
		if !vector.is_aligned() {
			return Err(Error::InvalidArgument(
				"Sparse query indices and values differ in length.".to_string(),
			));
		}

		let query = Query::new_nearest(VectorInput::new_sparse(
			vector.indices.clone(),
			vector.values.clone(),
		));
		let points = self.run_query(query, self.sparse_vector_name.as_str(), filter, limit).await?;

		Ok(collect_hits(points))
	}

	async fn run_query(
		&self,
		query: Query,
		using: &str,
		filter: &Filter,
		limit: u32,
	) -> Result<Vec<ScoredPoint>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(query)
			.using(using)
			.filter(filter.clone())
			.limit(u64::from(limit))
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(response.result)
	}

	fn build_point(&self, chunk: &CorpusChunk) -> Result<PointStruct> {
		let raw_id = chunk.payload.chunk_id.as_str();

		if chunk.dense.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Chunk {raw_id:?} has {} dense dimensions; collection expects {}.",
				chunk.dense.len(),
				self.vector_dim
			)));
		}
		if !chunk.sparse.is_aligned() {
			return Err(Error::InvalidArgument(format!(
				"Chunk {raw_id:?} has misaligned sparse indices and values."
			)));
		}

		let mut vectors = HashMap::new();

		vectors.insert(self.dense_vector_name.clone(), Vector::from(chunk.dense.clone()));
		vectors.insert(
			self.sparse_vector_name.clone(),
			Vector::new_sparse(chunk.sparse.indices.clone(), chunk.sparse.values.clone()),
		);

		let payload = Payload::from(payload::encode_payload(&chunk.payload));

		Ok(PointStruct::new(payload::stable_point_id(raw_id).to_string(), vectors, payload))
	}
}

fn collect_hits(points: Vec<ScoredPoint>) -> Vec<RetrievedHit> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(chunk_id) = point.id.as_ref().and_then(payload::point_id_to_string) else {
			tracing::warn!("Retrieved point missing id.");

			continue;
		};
		let payload = payload::decode_payload(&chunk_id, &point.payload);

		out.push(RetrievedHit { chunk_id, similarity: point.score, payload });
	}

	out
}
