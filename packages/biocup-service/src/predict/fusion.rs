use std::collections::HashMap;

use biocup_domain::{ChunkPayload, RetrievedHit};

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
	pub chunk_id: String,
	pub score: f64,
	pub payload: Option<ChunkPayload>,
}

pub fn rrf_contribution(rank: usize, k: u32) -> f64 {
	1.0 / (f64::from(k) + rank as f64 + 1.0)
}

/// Reciprocal Rank Fusion over best-first hit lists.
///
/// Items present in several lists sum their contributions. The first payload seen for an item
/// is kept. Equal scores keep first-seen order, so the dense list wins ties against sparse-only
/// items.
pub fn rrf_fuse(lists: &[&[RetrievedHit]], k: u32, limit: usize) -> Vec<FusedHit> {
	let mut fused: Vec<FusedHit> = Vec::new();
	let mut position: HashMap<&str, usize> = HashMap::new();

	for hits in lists {
		for (rank, hit) in hits.iter().enumerate() {
			let contribution = rrf_contribution(rank, k);

			match position.get(hit.chunk_id.as_str()) {
				Some(&idx) => {
					let entry = &mut fused[idx];

					entry.score += contribution;

					if entry.payload.is_none() {
						entry.payload = hit.payload.clone();
					}
				},
				None => {
					position.insert(hit.chunk_id.as_str(), fused.len());
					fused.push(FusedHit {
						chunk_id: hit.chunk_id.clone(),
						score: contribution,
						payload: hit.payload.clone(),
					});
				},
			}
		}
	}

	// Stable sort keeps first-seen order among equal scores.
	fused.sort_by(|left, right| super::cmp_f64_desc(left.score, right.score));
	fused.truncate(limit);

	fused
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(id: &str) -> RetrievedHit {
		RetrievedHit { chunk_id: id.to_string(), similarity: 0.0, payload: None }
	}

	fn hits(ids: &[&str]) -> Vec<RetrievedHit> {
		ids.iter().map(|id| hit(id)).collect()
	}

	#[test]
	fn item_in_both_lists_sums_both_terms() {
		let dense = hits(&["a", "b", "c"]);
		let sparse = hits(&["x", "y", "a"]);
		let fused = rrf_fuse(&[dense.as_slice(), sparse.as_slice()], 60, 50);
		let a = fused.iter().find(|hit| hit.chunk_id == "a").expect("a must be fused.");

		assert_eq!(a.score, 1.0 / 61.0 + 1.0 / 63.0);
		assert_eq!(fused[0].chunk_id, "a");
	}

	#[test]
	fn item_in_one_list_yields_the_single_term() {
		let dense = hits(&["a", "b"]);
		let sparse = hits(&["c"]);
		let fused = rrf_fuse(&[dense.as_slice(), sparse.as_slice()], 60, 50);
		let b = fused.iter().find(|hit| hit.chunk_id == "b").expect("b must be fused.");

		assert_eq!(b.score, 1.0 / 62.0);
	}

	#[test]
	fn ties_keep_dense_order_before_sparse_only_items() {
		let dense = hits(&["d0", "d1"]);
		let sparse = hits(&["s0", "s1"]);
		let fused = rrf_fuse(&[dense.as_slice(), sparse.as_slice()], 60, 50);
		let order: Vec<&str> = fused.iter().map(|hit| hit.chunk_id.as_str()).collect();

		assert_eq!(order, vec!["d0", "s0", "d1", "s1"]);
	}

	#[test]
	fn output_is_truncated_to_limit() {
		let dense = hits(&["a", "b", "c", "d"]);
		let fused = rrf_fuse(&[dense.as_slice()], 60, 2);

		assert_eq!(fused.len(), 2);
	}

	#[test]
	fn first_available_payload_is_kept() {
		let dense = hits(&["a"]);
		let mut sparse = hits(&["a"]);
		let payload = biocup_domain::ChunkPayload {
			chunk_id: "raw-a".to_string(),
			case_id: "case".to_string(),
			primary_site: "colon".to_string(),
			section: biocup_domain::Section::Diagnosis,
			flags: Default::default(),
			is_admin_noise: false,
			text: String::new(),
		};

		sparse[0].payload = Some(payload.clone());

		let fused = rrf_fuse(&[dense.as_slice(), sparse.as_slice()], 60, 50);

		assert_eq!(fused[0].payload, Some(payload));
	}

	#[test]
	fn fusion_is_deterministic() {
		let dense = hits(&["a", "b", "c", "d"]);
		let sparse = hits(&["d", "c", "e"]);

		let lists = [dense.as_slice(), sparse.as_slice()];

		assert_eq!(rrf_fuse(&lists, 60, 50), rrf_fuse(&lists, 60, 50));
	}
}
