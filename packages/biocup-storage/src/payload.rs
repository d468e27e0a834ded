//! Conversion between corpus chunk metadata and Qdrant point payloads.

use std::collections::HashMap;

use qdrant_client::qdrant::{PointId, Value, point_id::PointIdOptions, value::Kind};
use uuid::Uuid;

use biocup_domain::{ChunkFlags, ChunkPayload, Section};

pub const CHUNK_ID_RAW_KEY: &str = "chunk_id_raw";
pub const CASE_ID_KEY: &str = "case_id";
pub const PRIMARY_SITE_KEY: &str = "primary_site";
pub const TEXT_KEY: &str = "chunk_text";

/// Deterministic point id, so re-indexing the same raw chunk id overwrites the same point.
pub fn stable_point_id(raw_chunk_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_URL, raw_chunk_id.as_bytes())
}

pub fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

pub fn encode_payload(payload: &ChunkPayload) -> HashMap<String, Value> {
	let mut out = HashMap::new();

	out.insert(CHUNK_ID_RAW_KEY.to_string(), Value::from(payload.chunk_id.clone()));
	out.insert(CASE_ID_KEY.to_string(), Value::from(payload.case_id.clone()));
	out.insert(PRIMARY_SITE_KEY.to_string(), Value::from(payload.primary_site.clone()));
	out.insert("section".to_string(), Value::from(payload.section.as_str().to_string()));
	out.insert("has_ihc".to_string(), Value::from(payload.flags.has_ihc));
	out.insert("has_lymph".to_string(), Value::from(payload.flags.has_lymph));
	out.insert("has_margins".to_string(), Value::from(payload.flags.has_margins));
	out.insert("has_tnm".to_string(), Value::from(payload.flags.has_tnm));
	out.insert("has_size".to_string(), Value::from(payload.flags.has_size));
	out.insert("is_admin_noise".to_string(), Value::from(payload.is_admin_noise));
	out.insert(TEXT_KEY.to_string(), Value::from(payload.text.clone()));

	out
}

/// Returns `None` when the case id or primary site is missing or blank.
pub fn decode_payload(point_id: &str, payload: &HashMap<String, Value>) -> Option<ChunkPayload> {
	let case_id = payload_string(payload, CASE_ID_KEY).filter(|value| !value.trim().is_empty())?;
	let primary_site =
		payload_string(payload, PRIMARY_SITE_KEY).filter(|value| !value.trim().is_empty())?;
	let chunk_id = payload_string(payload, CHUNK_ID_RAW_KEY)
		.or_else(|| payload_string(payload, "chunk_id"))
		.unwrap_or_else(|| point_id.to_string());
	let section =
		payload_string(payload, "section").map(|raw| Section::parse(&raw)).unwrap_or_default();
	let text = payload_string(payload, TEXT_KEY)
		.or_else(|| payload_string(payload, "text"))
		.unwrap_or_default();

	Some(ChunkPayload {
		chunk_id,
		case_id,
		primary_site,
		section,
		flags: ChunkFlags {
			has_ihc: payload_flag(payload, "has_ihc"),
			has_lymph: payload_flag(payload, "has_lymph"),
			has_margins: payload_flag(payload, "has_margins"),
			has_tnm: payload_flag(payload, "has_tnm"),
			has_size: payload_flag(payload, "has_size"),
		},
		is_admin_noise: payload_flag(payload, "is_admin_noise"),
		text,
	})
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		Some(Kind::IntegerValue(value)) => Some(value.to_string()),
		_ => None,
	}
}

// Older corpora stored flags as 0/1 integers.
pub fn payload_flag(payload: &HashMap<String, Value>, key: &str) -> bool {
	let Some(value) = payload.get(key) else { return false };

	match &value.kind {
		Some(Kind::BoolValue(flag)) => *flag,
		Some(Kind::IntegerValue(value)) => *value != 0,
		Some(Kind::DoubleValue(value)) => *value != 0.0,
		_ => false,
	}
}
