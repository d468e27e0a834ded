use std::{cmp::Ordering, collections::BTreeMap};

use super::{SiteProbability, calibrate::ScoredCase};

pub fn sum_site_scores(cases: &[ScoredCase]) -> BTreeMap<String, f64> {
	let mut scores = BTreeMap::new();

	for case in cases {
		*scores.entry(case.primary_site.clone()).or_insert(0.0) += case.score;
	}

	scores
}

/// Rescales site scores to percentages summing to 100. A non-positive total yields no sites.
pub fn normalize(site_scores: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
	let total: f64 = site_scores.values().sum();

	if !total.is_finite() || total <= 0.0 {
		return BTreeMap::new();
	}

	site_scores.iter().map(|(site, score)| (site.clone(), 100.0 * score / total)).collect()
}

/// Orders sites by probability, highest first, breaking ties by site name.
pub fn sort_sites(probabilities: &BTreeMap<String, f64>) -> Vec<SiteProbability> {
	let mut sites: Vec<SiteProbability> = probabilities
		.iter()
		.map(|(site, probability)| SiteProbability {
			site: site.clone(),
			probability: *probability,
		})
		.collect();

	sites.sort_by(|left, right| match super::cmp_f64_desc(left.probability, right.probability) {
		Ordering::Equal => left.site.cmp(&right.site),
		other => other,
	});

	sites
}
