use serde::{Deserialize, Serialize};

use crate::section::Section;

/// Lexical term weights as parallel index/value arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
	pub indices: Vec<u32>,
	pub values: Vec<f32>,
}
impl SparseVector {
	pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
		Self { indices, values }
	}

	pub fn is_aligned(&self) -> bool {
		self.indices.len() == self.values.len()
	}

	pub fn dot(&self, other: &Self) -> f32 {
		let mut total = 0.0_f32;

		for (index, value) in self.indices.iter().zip(&self.values) {
			for (other_index, other_value) in other.indices.iter().zip(&other.values) {
				if index == other_index {
					total += value * other_value;
				}
			}
		}

		total
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkFlags {
	pub has_ihc: bool,
	pub has_lymph: bool,
	pub has_margins: bool,
	pub has_tnm: bool,
	pub has_size: bool,
}

/// Metadata stored next to every indexed corpus chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
	pub chunk_id: String,
	pub case_id: String,
	pub primary_site: String,
	#[serde(default)]
	pub section: Section,
	#[serde(flatten)]
	pub flags: ChunkFlags,
	#[serde(default)]
	pub is_admin_noise: bool,
	#[serde(default)]
	pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusChunk {
	pub payload: ChunkPayload,
	pub dense: Vec<f32>,
	pub sparse: SparseVector,
}

/// A ranked point returned by one retrieval modality. `payload` is `None` when the stored
/// metadata lacks a case id or primary site; such hits still occupy a rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedHit {
	pub chunk_id: String,
	pub similarity: f32,
	pub payload: Option<ChunkPayload>,
}

/// One section-labeled fragment of the case under evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct InputChunk {
	pub index: usize,
	pub section: Section,
	pub flags: ChunkFlags,
	pub dense: Vec<f32>,
	pub sparse: SparseVector,
}
