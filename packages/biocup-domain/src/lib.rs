pub mod chunk;
pub mod evidence;
pub mod filter;
pub mod quality;
pub mod section;

pub use chunk::{ChunkFlags, ChunkPayload, CorpusChunk, InputChunk, RetrievedHit, SparseVector};
pub use filter::{FlagRequirement, SectionFilter};
pub use quality::QualityCalibrator;
pub use section::{Section, SectionWeights};
