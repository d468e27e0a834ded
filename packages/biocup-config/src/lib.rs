mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Aggregation, Calibration, Config, Evidence, Qdrant, Retrieval, Service, Storage,
	default_section_weights,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let qdrant = &cfg.storage.qdrant;

	if qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}

	for (label, name) in [
		("storage.qdrant.dense_vector_name", &qdrant.dense_vector_name),
		("storage.qdrant.sparse_vector_name", &qdrant.sparse_vector_name),
	] {
		if name.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if qdrant.dense_vector_name == qdrant.sparse_vector_name {
		return Err(Error::Validation {
			message: "storage.qdrant.dense_vector_name and sparse_vector_name must differ."
				.to_string(),
		});
	}

	let retrieval = &cfg.retrieval;

	for (label, value) in [
		("retrieval.k_dense", retrieval.k_dense),
		("retrieval.k_sparse", retrieval.k_sparse),
		("retrieval.k_fused", retrieval.k_fused),
		("retrieval.max_concurrency", retrieval.max_concurrency),
		("retrieval.max_attempts", retrieval.max_attempts),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if let Some(timeout) = retrieval.request_timeout_ms
		&& timeout == 0
	{
		return Err(Error::Validation {
			message: "retrieval.request_timeout_ms must be greater than zero.".to_string(),
		});
	}

	let aggregation = &cfg.aggregation;

	if aggregation.max_cases_per_input_chunk == 0 {
		return Err(Error::Validation {
			message: "aggregation.max_cases_per_input_chunk must be greater than zero."
				.to_string(),
		});
	}

	require_non_negative("aggregation.consistency_bonus", aggregation.consistency_bonus)?;
	require_non_negative("aggregation.default_section_weight", aggregation.default_section_weight)?;

	for (section, weight) in &aggregation.section_weights {
		if section.trim().is_empty() {
			return Err(Error::Validation {
				message: "aggregation.section_weights keys must be non-empty.".to_string(),
			});
		}

		require_non_negative(&format!("aggregation.section_weights.{section}"), *weight)?;
	}

	let calibration = &cfg.calibration;

	for (label, value) in [
		("calibration.strong_section_boost", calibration.strong_section_boost),
		("calibration.weak_section_factor", calibration.weak_section_factor),
		("calibration.generic_pattern_base", calibration.generic_pattern_base),
		("calibration.biomarker_pattern_base", calibration.biomarker_pattern_base),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value <= 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !calibration.weak_site_penalty.is_finite() {
		return Err(Error::Validation {
			message: "calibration.weak_site_penalty must be a finite number.".to_string(),
		});
	}
	if calibration.weak_site_penalty <= 0.0 || calibration.weak_site_penalty > 1.0 {
		return Err(Error::Validation {
			message: "calibration.weak_site_penalty must be in the range (0.0, 1.0].".to_string(),
		});
	}

	for (label, patterns) in [
		("calibration.generic_patterns", &calibration.generic_patterns),
		("calibration.biomarker_patterns", &calibration.biomarker_patterns),
	] {
		if patterns.iter().any(|pattern| pattern.trim().trim_end_matches('*').is_empty()) {
			return Err(Error::Validation {
				message: format!("{label} entries must be non-empty."),
			});
		}
	}

	if cfg.evidence.max_per_site == 0 {
		return Err(Error::Validation {
			message: "evidence.max_per_site must be greater than zero.".to_string(),
		});
	}
	if cfg.evidence.snippet_chars == 0 {
		return Err(Error::Validation {
			message: "evidence.snippet_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn require_non_negative(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value < 0.0 {
		return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}

	let overrides = std::mem::take(&mut cfg.aggregation.section_weights);
	let mut weights = types::default_section_weights();

	weights.extend(
		overrides.into_iter().map(|(section, weight)| (section.trim().to_uppercase(), weight)),
	);

	cfg.aggregation.section_weights = weights;

	for patterns in
		[&mut cfg.calibration.generic_patterns, &mut cfg.calibration.biomarker_patterns]
	{
		for pattern in patterns.iter_mut() {
			*pattern = pattern.trim().to_lowercase();
		}
	}
}
