pub mod data;
pub mod rules;

pub use data::{DocumentRecord, DocumentType, Detection, FieldRecord, Point, RecordBody, SubmissionRecord, Token};
pub use rules::{ExtractorKind, FieldSpec, KeywordTable, PatternRule, Schema, ID_CARD, PROPERTY_CARD};
