//! Content-based calibration of case scores.
//!
//! A case is judged by the section and text of its best-scoring chunk: strong clinical sections
//! and discriminative biomarker tokens raise its quality, descriptive sections and boilerplate
//! phrases lower it. Patterns match whole tokens, case-insensitively; a trailing `*` relaxes the
//! match to a token prefix.

use regex::Regex;

use biocup_config::Calibration;

use crate::section::Section;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityAssessment {
	pub generic_hits: u32,
	pub biomarker_hits: u32,
	pub factor: f64,
}

#[derive(Debug, Clone)]
pub struct QualityCalibrator {
	strong_section_boost: f64,
	weak_section_factor: f64,
	generic_pattern_base: f64,
	biomarker_pattern_base: f64,
	generic: Vec<Regex>,
	biomarkers: Vec<Regex>,
}
impl QualityCalibrator {
	pub fn new(cfg: &Calibration) -> Result<Self, regex::Error> {
		Ok(Self {
			strong_section_boost: cfg.strong_section_boost,
			weak_section_factor: cfg.weak_section_factor,
			generic_pattern_base: cfg.generic_pattern_base,
			biomarker_pattern_base: cfg.biomarker_pattern_base,
			generic: compile_patterns(&cfg.generic_patterns)?,
			biomarkers: compile_patterns(&cfg.biomarker_patterns)?,
		})
	}

	pub fn section_factor(&self, section: &Section) -> f64 {
		if section.is_strong() {
			self.strong_section_boost
		} else if section.is_weak() {
			self.weak_section_factor
		} else {
			1.0
		}
	}

	pub fn assess(&self, section: &Section, text: &str) -> QualityAssessment {
		let generic_hits = count_matches(&self.generic, text);
		let biomarker_hits = count_matches(&self.biomarkers, text);
		let factor = self.section_factor(section)
			* self.generic_pattern_base.powi(generic_hits as i32)
			* self.biomarker_pattern_base.powi(biomarker_hits as i32);

		QualityAssessment { generic_hits, biomarker_hits, factor }
	}
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
	patterns.iter().map(|pattern| Regex::new(&token_pattern(pattern))).collect()
}

fn token_pattern(pattern: &str) -> String {
	let (pattern, prefix) = match pattern.strip_suffix('*') {
		Some(stem) => (stem, true),
		None => (pattern, false),
	};
	let starts_with_word = pattern.chars().next().map(char::is_alphanumeric).unwrap_or(false);
	let ends_with_word = pattern.chars().last().map(char::is_alphanumeric).unwrap_or(false);
	let mut out = String::from("(?i)");

	if starts_with_word {
		out.push_str(r"\b");
	}

	out.push_str(&regex::escape(pattern));

	if ends_with_word && !prefix {
		out.push_str(r"\b");
	}

	out
}

// Each pattern counts once, however often it repeats.
fn count_matches(patterns: &[Regex], text: &str) -> u32 {
	patterns.iter().filter(|pattern| pattern.is_match(text)).count() as u32
}
