//! Position-aligned vector batches as produced by the embedding pipeline.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use biocup_domain::{ChunkFlags, ChunkPayload, CorpusChunk, InputChunk, Section, SparseVector};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputChunkMeta {
	#[serde(default)]
	pub section: Section,
	#[serde(flatten)]
	pub flags: ChunkFlags,
}

/// Metadata, dense and sparse vectors of the case under evaluation, indexed `0..N`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputBatch {
	pub meta: Vec<InputChunkMeta>,
	pub dense: Vec<Vec<f32>>,
	pub sparse: Vec<SparseVector>,
}
impl InputBatch {
	pub fn into_chunks(self, vector_dim: u32) -> Result<Vec<InputChunk>> {
		check_alignment("input", self.meta.len(), self.dense.len(), self.sparse.len())?;
		check_vectors("input", &self.dense, &self.sparse, vector_dim)?;

		Ok(self
			.meta
			.into_iter()
			.zip(self.dense)
			.zip(self.sparse)
			.enumerate()
			.map(|(index, ((meta, dense), sparse))| InputChunk {
				index,
				section: meta.section,
				flags: meta.flags,
				dense,
				sparse,
			})
			.collect())
	}
}

/// Corpus chunks with their vectors, indexed `0..N`, ready to be upserted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusBatch {
	pub meta: Vec<ChunkPayload>,
	pub dense: Vec<Vec<f32>>,
	pub sparse: Vec<SparseVector>,
}
impl CorpusBatch {
	pub fn into_chunks(self, vector_dim: u32) -> Result<Vec<CorpusChunk>> {
		check_alignment("corpus", self.meta.len(), self.dense.len(), self.sparse.len())?;
		check_vectors("corpus", &self.dense, &self.sparse, vector_dim)?;

		for (index, payload) in self.meta.iter().enumerate() {
			if payload.chunk_id.trim().is_empty() {
				return Err(Error::InvalidRequest {
					message: format!("corpus meta[{index}].chunk_id must be non-empty."),
				});
			}
		}

		Ok(self
			.meta
			.into_iter()
			.zip(self.dense)
			.zip(self.sparse)
			.map(|((payload, dense), sparse)| CorpusChunk { payload, dense, sparse })
			.collect())
	}
}

fn check_alignment(label: &str, meta: usize, dense: usize, sparse: usize) -> Result<()> {
	if meta == dense && dense == sparse {
		return Ok(());
	}

	Err(Error::Alignment {
		message: format!(
			"{label} arrays are misaligned: meta={meta}, dense={dense}, sparse={sparse}."
		),
	})
}

fn check_vectors(
	label: &str,
	dense: &[Vec<f32>],
	sparse: &[SparseVector],
	vector_dim: u32,
) -> Result<()> {
	for (index, vector) in dense.iter().enumerate() {
		if vector.len() != vector_dim as usize {
			return Err(Error::Alignment {
				message: format!(
					"{label} dense[{index}] has {} dimensions; expected {vector_dim}.",
					vector.len()
				),
			});
		}
	}
	for (index, vector) in sparse.iter().enumerate() {
		if !vector.is_aligned() {
			return Err(Error::Alignment {
				message: format!(
					"{label} sparse[{index}] has {} indices but {} values.",
					vector.indices.len(),
					vector.values.len()
				),
			});
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn batch(n_meta: usize, n_dense: usize, n_sparse: usize) -> InputBatch {
		InputBatch {
			meta: vec![InputChunkMeta::default(); n_meta],
			dense: vec![vec![0.0; 2]; n_dense],
			sparse: vec![SparseVector::default(); n_sparse],
		}
	}

	#[test]
	fn aligned_batch_keeps_positions() {
		let mut input = batch(2, 2, 2);

		input.meta[1].section = Section::Ihc;

		let chunks = input.into_chunks(2).expect("Batch must be aligned.");

		assert_eq!(chunks.len(), 2);
		assert_eq!(chunks[1].index, 1);
		assert_eq!(chunks[1].section, Section::Ihc);
		assert_eq!(chunks[0].section, Section::General);
	}

	#[test]
	fn length_mismatch_is_an_alignment_error() {
		let err = batch(3, 2, 3).into_chunks(2).expect_err("Expected alignment error.");

		assert!(matches!(err, Error::Alignment { .. }));
		assert!(err.to_string().contains("meta=3, dense=2, sparse=3"));
	}

	#[test]
	fn dense_dimension_mismatch_is_an_alignment_error() {
		let err = batch(1, 1, 1).into_chunks(3).expect_err("Expected alignment error.");

		assert!(matches!(err, Error::Alignment { .. }));
	}

	#[test]
	fn misaligned_sparse_vector_is_rejected() {
		let mut input = batch(1, 1, 1);

		input.sparse[0] = SparseVector::new(vec![1, 2], vec![0.3]);

		assert!(matches!(input.into_chunks(2), Err(Error::Alignment { .. })));
	}

	#[test]
	fn meta_decodes_flags_and_lenient_sections() {
		let input: InputBatch = serde_json::from_value(serde_json::json!({
			"meta": [{ "section": "Lymph", "has_lymph": true }, {}],
			"dense": [[0.1, 0.2], [0.3, 0.4]],
			"sparse": [{ "indices": [5], "values": [1.0] }, { "indices": [], "values": [] }]
		}))
		.expect("Batch must decode.");
		let chunks = input.into_chunks(2).expect("Batch must be aligned.");

		assert_eq!(chunks[0].section, Section::LymphNodes);
		assert!(chunks[0].flags.has_lymph);
		assert_eq!(chunks[1].section, Section::General);
	}
}
