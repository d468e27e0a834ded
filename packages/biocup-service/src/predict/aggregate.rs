//! Cross-chunk accumulation of case evidence.
//!
//! Each input chunk's outcome becomes a set of request-scoped case entries. Entries merge with a
//! commutative sum for scores and support sets and an idempotent max for the best payload, so
//! the table is independent of the order in which chunk cycles finish.

use std::collections::{BTreeMap, BTreeSet};

use biocup_domain::ChunkPayload;

use super::reduce::ChunkOutcome;

#[derive(Debug, Clone, PartialEq)]
pub struct CaseEntry {
	pub case_id: String,
	pub primary_site: String,
	pub total_score: f64,
	pub support: BTreeSet<usize>,
	pub best_contrib: f64,
	pub best_chunk: usize,
	pub best_payload: ChunkPayload,
}
impl CaseEntry {
	pub fn new(chunk_index: usize, contrib: f64, payload: ChunkPayload) -> Self {
		Self {
			case_id: payload.case_id.clone(),
			primary_site: payload.primary_site.clone(),
			total_score: contrib,
			support: BTreeSet::from([chunk_index]),
			best_contrib: contrib,
			best_chunk: chunk_index,
			best_payload: payload,
		}
	}

	pub fn merge(&mut self, other: Self) {
		self.total_score += other.total_score;
		self.support.extend(other.support);

		// Equal contributions resolve to the earlier input chunk.
		let other_wins = other.best_contrib > self.best_contrib
			|| (other.best_contrib == self.best_contrib && other.best_chunk < self.best_chunk);

		if other_wins {
			self.best_contrib = other.best_contrib;
			self.best_chunk = other.best_chunk;
			self.best_payload = other.best_payload;
		}
	}

	pub fn support_count(&self) -> usize {
		self.support.len()
	}

	pub fn consistency_bonus(&self, beta: f64) -> f64 {
		1.0 + beta * self.support_count().saturating_sub(1) as f64
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseTable {
	entries: BTreeMap<String, CaseEntry>,
}
impl CaseTable {
	pub fn absorb(&mut self, outcome: ChunkOutcome) {
		for case in outcome.cases {
			self.insert(CaseEntry::new(outcome.index, case.contrib, case.payload));
		}
	}

	pub fn insert(&mut self, entry: CaseEntry) {
		match self.entries.get_mut(&entry.case_id) {
			Some(existing) => existing.merge(entry),
			None => {
				self.entries.insert(entry.case_id.clone(), entry);
			},
		}
	}

	pub fn entries(&self) -> impl Iterator<Item = &CaseEntry> {
		self.entries.values()
	}

	pub fn into_entries(self) -> impl Iterator<Item = CaseEntry> {
		self.entries.into_values()
	}
}

/// Folds chunk outcomes in input order, which fixes the floating-point summation order.
pub fn fold_outcomes(mut outcomes: Vec<ChunkOutcome>) -> CaseTable {
	outcomes.sort_by_key(|outcome| outcome.index);

	outcomes.into_iter().fold(CaseTable::default(), |mut table, outcome| {
		table.absorb(outcome);

		table
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::predict::reduce::CaseContribution;
	use biocup_domain::Section;

	fn payload(case_id: &str, chunk_id: &str) -> ChunkPayload {
		ChunkPayload {
			chunk_id: chunk_id.to_string(),
			case_id: case_id.to_string(),
			primary_site: "colon".to_string(),
			section: Section::Diagnosis,
			flags: Default::default(),
			is_admin_noise: false,
			text: String::new(),
		}
	}

	fn outcome(index: usize, cases: &[(&str, &str, f64)]) -> ChunkOutcome {
		ChunkOutcome {
			index,
			dropped_hits: 0,
			cases: cases
				.iter()
				.map(|(case_id, chunk_id, contrib)| CaseContribution {
					case_id: case_id.to_string(),
					contrib: *contrib,
					payload: payload(case_id, chunk_id),
				})
				.collect(),
		}
	}

	#[test]
	fn contributions_sum_across_chunks_and_track_support() {
		let table = fold_outcomes(vec![
			outcome(0, &[("case-a", "a0", 0.10)]),
			outcome(1, &[("case-a", "a1", 0.30), ("case-b", "b1", 0.05)]),
			outcome(2, &[("case-a", "a2", 0.20)]),
		]);
		let a = table.entries().find(|entry| entry.case_id == "case-a").expect("case-a exists.");

		assert_eq!(table.entries().count(), 2);
		assert_eq!(a.support_count(), 3);
		assert_eq!(a.total_score, 0.10 + 0.30 + 0.20);
		assert_eq!(a.best_payload.chunk_id, "a1");
		assert_eq!(a.best_chunk, 1);
	}

	#[test]
	fn fold_is_independent_of_completion_order() {
		let outcomes = vec![
			outcome(0, &[("case-a", "a0", 0.10), ("case-b", "b0", 0.20)]),
			outcome(1, &[("case-a", "a1", 0.10)]),
			outcome(2, &[("case-b", "b2", 0.40)]),
		];
		let mut reversed = outcomes.clone();

		reversed.reverse();

		assert_eq!(fold_outcomes(outcomes), fold_outcomes(reversed));
	}

	#[test]
	fn merge_is_commutative_on_equal_contributions() {
		let mut left = CaseEntry::new(2, 0.5, payload("case-a", "late"));
		let mut right = CaseEntry::new(0, 0.5, payload("case-a", "early"));
		let left_copy = left.clone();

		left.merge(right.clone());
		right.merge(left_copy);

		assert_eq!(left, right);
		assert_eq!(left.best_payload.chunk_id, "early");
	}

	#[test]
	fn consistency_bonus_grows_with_support() {
		let mut entry = CaseEntry::new(0, 1.0, payload("case-a", "a0"));

		assert_eq!(entry.consistency_bonus(0.20), 1.0);

		entry.merge(CaseEntry::new(1, 1.0, payload("case-a", "a1")));
		entry.merge(CaseEntry::new(2, 1.0, payload("case-a", "a2")));

		assert_eq!(entry.support_count(), 3);
		assert!((entry.consistency_bonus(0.20) - 1.40).abs() < 1e-12);
	}
}
