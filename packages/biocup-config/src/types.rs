use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub aggregation: Aggregation,
	#[serde(default)]
	pub calibration: Calibration,
	#[serde(default)]
	pub evidence: Evidence,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
	#[serde(default = "default_http_bind")]
	pub http_bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	pub api_key: Option<String>,
	#[serde(default = "default_dense_vector_name")]
	pub dense_vector_name: String,
	#[serde(default = "default_sparse_vector_name")]
	pub sparse_vector_name: String,
}

/// Per-input-chunk retrieval sizes and backend call policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Retrieval {
	pub k_dense: u32,
	pub k_sparse: u32,
	pub k_fused: u32,
	pub rrf_k: u32,
	pub max_concurrency: u32,
	/// Total attempts per backend query, including the first one.
	pub max_attempts: u32,
	pub retry_backoff_ms: u64,
	/// Whole-request deadline. Unset means no deadline.
	pub request_timeout_ms: Option<u64>,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			k_dense: 80,
			k_sparse: 80,
			k_fused: 50,
			rrf_k: 60,
			max_concurrency: 8,
			max_attempts: 1,
			retry_backoff_ms: 200,
			request_timeout_ms: None,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Aggregation {
	pub max_cases_per_input_chunk: u32,
	pub consistency_bonus: f64,
	/// Keys are upper-case section labels, e.g. "IHC".
	pub section_weights: BTreeMap<String, f64>,
	pub default_section_weight: f64,
}
impl Default for Aggregation {
	fn default() -> Self {
		Self {
			max_cases_per_input_chunk: 15,
			consistency_bonus: 0.20,
			section_weights: default_section_weights(),
			default_section_weight: 1.0,
		}
	}
}

/// Quality calibration tunables.
///
/// Patterns match whole tokens, case-insensitively. A trailing `*` turns a pattern into a token
/// prefix, so `pt*` matches `pT2` and `pT3a`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Calibration {
	pub strong_section_boost: f64,
	pub weak_section_factor: f64,
	pub generic_pattern_base: f64,
	pub biomarker_pattern_base: f64,
	pub strong_evidence_min: u32,
	pub weak_site_penalty: f64,
	pub generic_patterns: Vec<String>,
	pub biomarker_patterns: Vec<String>,
}
impl Default for Calibration {
	fn default() -> Self {
		Self {
			strong_section_boost: 1.15,
			weak_section_factor: 0.90,
			generic_pattern_base: 0.92,
			biomarker_pattern_base: 1.06,
			strong_evidence_min: 2,
			weak_site_penalty: 0.75,
			generic_patterns: to_strings(DEFAULT_GENERIC_PATTERNS),
			biomarker_patterns: to_strings(DEFAULT_BIOMARKER_PATTERNS),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Evidence {
	pub max_per_site: u32,
	pub snippet_chars: u32,
}
impl Default for Evidence {
	fn default() -> Self {
		Self { max_per_site: 6, snippet_chars: 220 }
	}
}

const DEFAULT_SECTION_WEIGHTS: [(&str, f64); 10] = [
	("IHC", 2.4),
	("DIAGNOSIS", 2.0),
	("SYNOPTIC", 1.5),
	("LYMPH_NODES", 1.2),
	("MARGINS", 1.1),
	("MICRO", 0.7),
	("GROSS", 0.5),
	("SPECIMEN", 0.3),
	("GENERAL", 0.7),
	("COMMENT", 0.6),
];

const DEFAULT_GENERIC_PATTERNS: &[&str] = &[
	"negative for malignancy",
	"no tumor seen",
	"free of tumor",
	"margins negative",
	"resection margins negative",
	"lymph nodes negative",
	"no lymph node metastasis",
	"n0",
	"pn0",
	"tumor size",
	"greatest dimension",
	"pt*",
	"pn*",
	"pm*",
	"pathologic staging",
	"tnm",
	"specimen received",
	"submitted in toto",
	"gross description",
];

const DEFAULT_BIOMARKER_PATTERNS: &[&str] = &[
	"ttf-1", "napsin a", "cdx2", "ck20", "satb2", "er", "pr", "her2", "gata3", "psa", "psap",
	"nkx3.1", "pax8", "wt1", "heppar-1", "arg1", "ck7", "ck5/6", "p63",
];

pub fn default_section_weights() -> BTreeMap<String, f64> {
	DEFAULT_SECTION_WEIGHTS.iter().map(|(label, weight)| (label.to_string(), *weight)).collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

fn default_http_bind() -> String {
	"127.0.0.1:8080".to_string()
}

fn default_dense_vector_name() -> String {
	"dense".to_string()
}

fn default_sparse_vector_name() -> String {
	"sparse".to_string()
}
