use std::{cmp::Ordering, collections::BTreeMap};

use super::{EvidenceItem, calibrate::ScoredCase};

/// Picks the `max_per_site` highest-scoring cases for each site as its supporting evidence.
pub fn select_evidence(
	cases: &[ScoredCase],
	max_per_site: usize,
	snippet_chars: usize,
) -> BTreeMap<String, Vec<EvidenceItem>> {
	let mut by_site: BTreeMap<String, Vec<&ScoredCase>> = BTreeMap::new();

	for case in cases {
		by_site.entry(case.primary_site.clone()).or_default().push(case);
	}

	by_site
		.into_iter()
		.map(|(site, mut site_cases)| {
			site_cases.sort_by(|left, right| match super::cmp_f64_desc(left.score, right.score) {
				Ordering::Equal => left.case_id.cmp(&right.case_id),
				other => other,
			});
			site_cases.truncate(max_per_site);

			let items = site_cases
				.into_iter()
				.map(|case| EvidenceItem {
					case_id: case.case_id.clone(),
					chunk_id: case.chunk_id.clone(),
					section: case.section.clone(),
					score: case.score,
					snippet: biocup_domain::evidence::snippet(&case.text, snippet_chars),
				})
				.collect();

			(site, items)
		})
		.collect()
}

/// Counts evidence items drawn from strong sections, per site.
pub fn strong_counts(evidence: &BTreeMap<String, Vec<EvidenceItem>>) -> BTreeMap<String, usize> {
	evidence
		.iter()
		.map(|(site, items)| {
			(site.clone(), items.iter().filter(|item| item.section.is_strong()).count())
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use biocup_domain::Section;

	fn case(case_id: &str, site: &str, score: f64, section: Section) -> ScoredCase {
		ScoredCase {
			case_id: case_id.to_string(),
			primary_site: site.to_string(),
			score,
			chunk_id: format!("{case_id}-chunk"),
			section,
			text: format!("{case_id} text"),
		}
	}

	#[test]
	fn evidence_is_capped_and_ordered_per_site() {
		let cases: Vec<ScoredCase> = (0..8)
			.map(|i| case(&format!("case-{i}"), "colon", i as f64, Section::Diagnosis))
			.chain([case("case-x", "lung", 1.0, Section::Gross)])
			.collect();
		let evidence = select_evidence(&cases, 6, 220);
		let colon: Vec<&str> = evidence["colon"].iter().map(|item| item.case_id.as_str()).collect();

		assert_eq!(colon, vec!["case-7", "case-6", "case-5", "case-4", "case-3", "case-2"]);
		assert_eq!(evidence["lung"].len(), 1);
		assert_eq!(evidence["lung"][0].snippet, "case-x text");
	}

	#[test]
	fn strong_counts_only_include_strong_sections() {
		let cases = vec![
			case("case-1", "lung", 3.0, Section::Ihc),
			case("case-2", "lung", 2.0, Section::Micro),
			case("case-3", "lung", 1.0, Section::Synoptic),
			case("case-4", "breast", 1.0, Section::Gross),
		];
		let counts = strong_counts(&select_evidence(&cases, 6, 220));

		assert_eq!(counts["lung"], 2);
		assert_eq!(counts["breast"], 0);
	}

	#[test]
	fn snippets_are_truncated() {
		let mut long = case("case-1", "lung", 1.0, Section::Ihc);

		long.text = "a".repeat(300);

		let evidence = select_evidence(&[long], 6, 220);

		assert_eq!(evidence["lung"][0].snippet.chars().count(), 221);
	}
}
