pub mod extractors;
pub mod fusion;
pub mod image_processor;
pub mod normalize;
pub mod ocr;
pub mod regions;
pub mod spatial;

pub use extractors::{ExtractionInput, FieldExtractor};
pub use fusion::{fuse, Candidate, CandidatePool};
pub use image_processor::{ImageProcessor, Variant, VariantKind};
pub use normalize::normalize;
pub use ocr::{parse_tsv, TextRecognizer, UnavailableRecognizer};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractRecognizer;
pub use regions::{Region, RegionSegmenter};
pub use spatial::TokenAssembler;
