pub mod config;
pub mod document_processor;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;

pub use config::PipelineConfig;
pub use document_processor::{DocumentProcessor, Submission};
