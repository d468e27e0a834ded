use biocup_config::{
	Aggregation, Calibration, Config, Evidence, Qdrant, Retrieval, Service, Storage,
};
use biocup_domain::{ChunkFlags, ChunkPayload, CorpusChunk, InputChunk, Section, SparseVector};

/// A valid configuration with default tunables for a collection of `vector_dim` dimensions.
pub fn test_config(vector_dim: u32) -> Config {
	Config {
		service: Service { log_level: "info".to_string(), http_bind: "127.0.0.1:0".to_string() },
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "biocup_test".to_string(),
				vector_dim,
				api_key: None,
				dense_vector_name: "dense".to_string(),
				sparse_vector_name: "sparse".to_string(),
			},
		},
		retrieval: Retrieval::default(),
		aggregation: Aggregation::default(),
		calibration: Calibration::default(),
		evidence: Evidence::default(),
	}
}

/// A corpus chunk whose flags are derived from its section.
pub fn corpus_chunk(
	chunk_id: &str,
	case_id: &str,
	primary_site: &str,
	section: Section,
	text: &str,
	dense: Vec<f32>,
	sparse: SparseVector,
) -> CorpusChunk {
	let flags = flags_for(&section);

	CorpusChunk {
		payload: ChunkPayload {
			chunk_id: chunk_id.to_string(),
			case_id: case_id.to_string(),
			primary_site: primary_site.to_string(),
			section,
			flags,
			is_admin_noise: false,
			text: text.to_string(),
		},
		dense,
		sparse,
	}
}

pub fn input_chunk(
	index: usize,
	section: Section,
	dense: Vec<f32>,
	sparse: SparseVector,
) -> InputChunk {
	let flags = flags_for(&section);

	InputChunk { index, section, flags, dense, sparse }
}

fn flags_for(section: &Section) -> ChunkFlags {
	ChunkFlags {
		has_ihc: matches!(section, Section::Ihc),
		has_lymph: matches!(section, Section::LymphNodes),
		has_margins: matches!(section, Section::Margins),
		..Default::default()
	}
}
