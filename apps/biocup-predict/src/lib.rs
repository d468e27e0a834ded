use std::{
	fmt::Write as _,
	fs, io,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use biocup_config::Config;
use biocup_service::{CorpusBatch, InputBatch, Prediction, PredictionService, QdrantRepository};
use biocup_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(
	version = biocup_cli::VERSION,
	rename_all = "kebab",
	styles = biocup_cli::styles(),
)]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Predicts the primary site for one case given as an input batch JSON file.
	Predict {
		#[arg(long, short = 'c', value_name = "FILE")]
		config: PathBuf,
		#[arg(long, short = 'i', value_name = "FILE")]
		input: PathBuf,
		/// Print the full prediction and trace as JSON.
		#[arg(long)]
		json: bool,
	},
	/// Creates the collection if needed and upserts a corpus batch JSON file.
	Index {
		#[arg(long, short = 'c', value_name = "FILE")]
		config: PathBuf,
		#[arg(long, short = 'i', value_name = "FILE")]
		input: PathBuf,
	},
	/// Reports whether the collection exists and how many points it holds.
	Status {
		#[arg(long, short = 'c', value_name = "FILE")]
		config: PathBuf,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	match args.command {
		Command::Predict { config, input, json } => predict(&config, &input, json).await,
		Command::Index { config, input } => index(&config, &input).await,
		Command::Status { config } => status(&config).await,
	}
}

async fn predict(config_path: &Path, input_path: &Path, json: bool) -> color_eyre::Result<()> {
	let config = load_config(config_path)?;
	let batch: InputBatch = load_json(input_path)?;
	let store = QdrantStore::new(&config.storage.qdrant)?;
	let evidence_shown = config.evidence.max_per_site as usize;
	let service = PredictionService::new(config, Arc::new(QdrantRepository::new(store)))?;
	let prediction = service.predict_batch(batch).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&prediction)?);
	} else {
		print!("{}", render_prediction(&prediction, evidence_shown));
	}

	Ok(())
}

async fn index(config_path: &Path, input_path: &Path) -> color_eyre::Result<()> {
	let config = load_config(config_path)?;
	let batch: CorpusBatch = load_json(input_path)?;
	let chunks = batch.into_chunks(config.storage.qdrant.vector_dim)?;
	let store = QdrantStore::new(&config.storage.qdrant)?;
	let created = store.ensure_collection().await?;

	if created {
		tracing::info!(collection = %store.collection, "Created collection.");
	}

	let written = store.upsert_chunks(&chunks).await?;

	println!("Indexed {written} chunks into {}.", store.collection);

	Ok(())
}

async fn status(config_path: &Path) -> color_eyre::Result<()> {
	let config = load_config(config_path)?;
	let store = QdrantStore::new(&config.storage.qdrant)?;
	let status = store.status().await?;

	match (status.exists, status.points_count) {
		(false, _) => println!("Collection {} does not exist.", store.collection),
		(true, Some(points)) => println!("Collection {} holds {points} points.", store.collection),
		(true, None) => println!("Collection {} exists.", store.collection),
	}

	Ok(())
}

fn load_config(path: &Path) -> color_eyre::Result<Config> {
	let config = biocup_config::load(path)?;

	init_tracing(&config);

	Ok(config)
}

fn load_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: DeserializeOwned,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;

	serde_json::from_str(&raw)
		.map_err(|err| eyre::eyre!("Failed to parse {}: {err}.", path.display()))
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Formats ranked sites with up to `evidence_per_site` supporting snippets each.
pub fn render_prediction(prediction: &Prediction, evidence_per_site: usize) -> String {
	let mut out = String::new();

	if prediction.trace.sorted_sites.is_empty() {
		out.push_str("No site could be predicted.\n");

		return out;
	}

	for site in &prediction.trace.sorted_sites {
		let _ = writeln!(out, "{:<24} {:>6.2}%", site.site, site.probability);

		let evidence = prediction.trace.evidence_by_site.get(&site.site);

		for item in evidence.into_iter().flatten().take(evidence_per_site) {
			let _ = writeln!(
				out,
				"    [{}] {} ({:.4}) {}",
				item.section, item.case_id, item.score, item.snippet
			);
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;
	use biocup_domain::Section;
	use biocup_service::{EvidenceItem, PredictionParameters, PredictionTrace, SiteProbability};

	fn parameters() -> PredictionParameters {
		PredictionParameters {
			k_dense: 80,
			k_sparse: 80,
			k_fused: 50,
			rrf_k: 60,
			max_cases_per_input_chunk: 15,
			consistency_bonus: 0.2,
			section_weights: BTreeMap::new(),
			default_section_weight: 1.0,
			strong_evidence_min: 2,
			weak_site_penalty: 0.75,
			max_evidence_per_site: 6,
			snippet_chars: 220,
		}
	}

	fn prediction(
		sites: &[(&str, f64)],
		evidence: BTreeMap<String, Vec<EvidenceItem>>,
	) -> Prediction {
		Prediction {
			probabilities: sites.iter().map(|(site, p)| (site.to_string(), *p)).collect(),
			trace: PredictionTrace {
				sorted_sites: sites
					.iter()
					.map(|(site, p)| SiteProbability { site: site.to_string(), probability: *p })
					.collect(),
				site_scores: BTreeMap::new(),
				site_strong_counts: BTreeMap::new(),
				evidence_by_site: evidence,
				per_case_support_counts: BTreeMap::new(),
				n_input_chunks: 1,
				parameters: parameters(),
			},
		}
	}

	#[test]
	fn renders_sites_in_rank_order_with_evidence() {
		let evidence = BTreeMap::from([(
			"lung".to_string(),
			vec![
				EvidenceItem {
					case_id: "case-1".to_string(),
					chunk_id: "c-1".to_string(),
					section: Section::Ihc,
					score: 0.5,
					snippet: "TTF-1 positive.".to_string(),
				},
				EvidenceItem {
					case_id: "case-2".to_string(),
					chunk_id: "c-2".to_string(),
					section: Section::Diagnosis,
					score: 0.25,
					snippet: "Adenocarcinoma.".to_string(),
				},
			],
		)]);
		let rendered =
			render_prediction(&prediction(&[("lung", 71.428), ("breast", 28.572)], evidence), 1);
		let lines: Vec<&str> = rendered.lines().collect();

		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("lung"));
		assert!(lines[0].ends_with("71.43%"));
		assert_eq!(lines[1], "    [IHC] case-1 (0.5000) TTF-1 positive.");
		assert!(lines[2].starts_with("breast"));
	}

	#[test]
	fn renders_a_notice_for_empty_predictions() {
		let rendered = render_prediction(&prediction(&[], BTreeMap::new()), 6);

		assert_eq!(rendered, "No site could be predicted.\n");
	}
}
