//! Pipeline services: extraction, job polling, coordination.

pub mod extract;
pub mod pipeline;
pub mod poll;

pub use pipeline::ExtractionPipeline;
