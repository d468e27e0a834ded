use std::collections::BTreeMap;

use biocup_domain::{QualityCalibrator, Section};

use super::aggregate::CaseEntry;

/// A corpus case after bonus and quality calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCase {
	pub case_id: String,
	pub primary_site: String,
	pub score: f64,
	pub chunk_id: String,
	pub section: Section,
	pub text: String,
}

pub fn score_case(
	entry: CaseEntry,
	consistency_bonus: f64,
	calibrator: &QualityCalibrator,
) -> ScoredCase {
	let bonus = entry.consistency_bonus(consistency_bonus);
	let quality = calibrator.assess(&entry.best_payload.section, &entry.best_payload.text).factor;

	ScoredCase {
		case_id: entry.case_id,
		primary_site: entry.primary_site,
		score: entry.total_score * bonus * quality,
		chunk_id: entry.best_payload.chunk_id,
		section: entry.best_payload.section,
		text: entry.best_payload.text,
	}
}

/// Scales down every site whose strong-section evidence count is below `min_strong`.
pub fn apply_weak_site_penalty(
	site_scores: &mut BTreeMap<String, f64>,
	strong_counts: &BTreeMap<String, usize>,
	min_strong: usize,
	penalty: f64,
) {
	for (site, score) in site_scores.iter_mut() {
		let strong = strong_counts.get(site).copied().unwrap_or(0);

		if strong < min_strong {
			*score *= penalty;
		}
	}
}
