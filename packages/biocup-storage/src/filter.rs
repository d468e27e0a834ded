use qdrant_client::qdrant::{Condition, Filter};

use biocup_domain::{
	SectionFilter,
	filter::{ADMIN_NOISE_KEY, SECTION_KEY},
};

pub fn to_qdrant_filter(filter: &SectionFilter) -> Filter {
	let mut must = vec![Condition::matches(SECTION_KEY, filter.section_labels())];

	if let Some(flag) = filter.required_flag {
		must.push(Condition::matches(flag.payload_key(), true));
	}

	Filter {
		must,
		should: Vec::new(),
		must_not: vec![
			Condition::matches(ADMIN_NOISE_KEY, true),
			Condition::matches(ADMIN_NOISE_KEY, 1_i64),
		],
		min_should: None,
	}
}
