use std::collections::HashMap;

use biocup_domain::ChunkPayload;

use super::fusion::FusedHit;

/// A corpus case's best contribution for one input chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseContribution {
	pub case_id: String,
	pub contrib: f64,
	pub payload: ChunkPayload,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
	pub index: usize,
	pub dropped_hits: usize,
	pub cases: Vec<CaseContribution>,
}

/// Collapses fused hits to one representative per case, weighted by the input chunk's section,
/// and keeps the `max_cases` strongest cases.
pub fn reduce_chunk(
	index: usize,
	fused: Vec<FusedHit>,
	section_weight: f64,
	max_cases: usize,
) -> ChunkOutcome {
	let mut cases: Vec<CaseContribution> = Vec::new();
	let mut position: HashMap<String, usize> = HashMap::new();
	let mut dropped_hits = 0;

	for hit in fused {
		let Some(payload) = hit.payload else {
			dropped_hits += 1;

			continue;
		};
		let contrib = hit.score * section_weight;

		match position.get(payload.case_id.as_str()) {
			Some(&idx) =>
				if contrib > cases[idx].contrib {
					cases[idx].contrib = contrib;
					cases[idx].payload = payload;
				},
			None =>
				if contrib > 0.0 {
					position.insert(payload.case_id.clone(), cases.len());
					cases.push(CaseContribution {
						case_id: payload.case_id.clone(),
						contrib,
						payload,
					});
				},
		}
	}

	cases.sort_by(|left, right| super::cmp_f64_desc(left.contrib, right.contrib));
	cases.truncate(max_cases);

	ChunkOutcome { index, dropped_hits, cases }
}
