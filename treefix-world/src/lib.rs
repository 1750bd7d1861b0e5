//! World-level processing: finding chunk files and running the leaf rewrite
//! over a whole world on a background worker.

pub mod pipeline;
pub mod scan;
pub mod store;

pub use pipeline::{Phase, PhaseWeights, Pipeline, PipelineConfig, ProgressEvent, ProgressView, RunSummary};
pub use scan::{EXCLUDED_FILES, scan};
pub use store::{ChunkStore, FileChunkStore, MemoryChunkStore};
