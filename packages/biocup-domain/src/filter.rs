//! Retrieval predicate restricting corpus chunks to sections that can plausibly answer an input
//! chunk. Administrative noise is always excluded.

use crate::{
	chunk::{ChunkFlags, ChunkPayload},
	section::Section,
};

pub const ADMIN_NOISE_KEY: &str = "is_admin_noise";
pub const SECTION_KEY: &str = "section";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagRequirement {
	Ihc,
	Lymph,
	Margins,
}
impl FlagRequirement {
	pub fn payload_key(self) -> &'static str {
		match self {
			Self::Ihc => "has_ihc",
			Self::Lymph => "has_lymph",
			Self::Margins => "has_margins",
		}
	}

	pub fn is_set(self, flags: &ChunkFlags) -> bool {
		match self {
			Self::Ihc => flags.has_ihc,
			Self::Lymph => flags.has_lymph,
			Self::Margins => flags.has_margins,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFilter {
	pub sections: Vec<Section>,
	pub required_flag: Option<FlagRequirement>,
}
impl SectionFilter {
	pub fn for_input(section: &Section) -> Self {
		let (sections, required_flag) = match section {
			Section::Ihc => (vec![Section::Ihc, Section::Diagnosis], Some(FlagRequirement::Ihc)),
			Section::LymphNodes => (
				vec![Section::LymphNodes, Section::Synoptic, Section::Diagnosis],
				Some(FlagRequirement::Lymph),
			),
			Section::Margins => (
				vec![Section::Margins, Section::Synoptic, Section::Diagnosis],
				Some(FlagRequirement::Margins),
			),
			Section::Synoptic => (
				vec![Section::Synoptic, Section::Diagnosis, Section::Margins, Section::LymphNodes],
				None,
			),
			Section::Diagnosis => (vec![Section::Diagnosis, Section::Synoptic], None),
			_ => (
				vec![
					Section::Diagnosis,
					Section::Synoptic,
					Section::Ihc,
					Section::LymphNodes,
					Section::Margins,
				],
				None,
			),
		};

		Self { sections, required_flag }
	}

	pub fn section_labels(&self) -> Vec<String> {
		self.sections.iter().map(|section| section.as_str().to_string()).collect()
	}

	pub fn matches(&self, payload: &ChunkPayload) -> bool {
		if payload.is_admin_noise {
			return false;
		}
		if !self.sections.contains(&payload.section) {
			return false;
		}

		self.required_flag.map(|flag| flag.is_set(&payload.flags)).unwrap_or(true)
	}
}
