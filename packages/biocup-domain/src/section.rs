use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use biocup_config::Aggregation;

/// Clinical report section a chunk was routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Section {
	Ihc,
	Diagnosis,
	Synoptic,
	LymphNodes,
	Margins,
	Micro,
	Gross,
	Specimen,
	#[default]
	General,
	Comment,
	Other(String),
}
impl Section {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Ihc => "IHC",
			Self::Diagnosis => "DIAGNOSIS",
			Self::Synoptic => "SYNOPTIC",
			Self::LymphNodes => "LYMPH_NODES",
			Self::Margins => "MARGINS",
			Self::Micro => "MICRO",
			Self::Gross => "GROSS",
			Self::Specimen => "SPECIMEN",
			Self::General => "GENERAL",
			Self::Comment => "COMMENT",
			Self::Other(label) => label.as_str(),
		}
	}

	/// Sections that carry discriminative clinical content.
	pub fn is_strong(&self) -> bool {
		matches!(self, Self::Ihc | Self::Diagnosis | Self::Synoptic)
	}

	/// Descriptive sections that rarely identify a primary site on their own.
	pub fn is_weak(&self) -> bool {
		matches!(self, Self::Gross | Self::Micro | Self::Specimen)
	}

	pub fn parse(raw: &str) -> Self {
		let label = raw.trim().to_uppercase();

		match label.as_str() {
			"" | "GENERAL" => Self::General,
			"IHC" => Self::Ihc,
			"DIAGNOSIS" => Self::Diagnosis,
			"SYNOPTIC" => Self::Synoptic,
			"LYMPH_NODES" | "LYMPH" => Self::LymphNodes,
			"MARGINS" => Self::Margins,
			"MICRO" => Self::Micro,
			"GROSS" => Self::Gross,
			"SPECIMEN" => Self::Specimen,
			"COMMENT" => Self::Comment,
			_ => Self::Other(label),
		}
	}
}
impl fmt::Display for Section {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Section {
	type Err = std::convert::Infallible;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Ok(Self::parse(raw))
	}
}
impl From<String> for Section {
	fn from(raw: String) -> Self {
		Self::parse(&raw)
	}
}
impl From<Section> for String {
	fn from(section: Section) -> Self {
		section.as_str().to_string()
	}
}

/// Importance of an input chunk's section when its hits are turned into case contributions.
#[derive(Debug, Clone)]
pub struct SectionWeights {
	weights: BTreeMap<String, f64>,
	fallback: f64,
}
impl SectionWeights {
	pub fn new(weights: BTreeMap<String, f64>, fallback: f64) -> Self {
		Self { weights, fallback }
	}

	pub fn from_config(cfg: &Aggregation) -> Self {
		Self::new(cfg.section_weights.clone(), cfg.default_section_weight)
	}

	pub fn weight(&self, section: &Section) -> f64 {
		self.weights.get(section.as_str()).copied().unwrap_or(self.fallback)
	}
}
