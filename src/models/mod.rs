//! Core data models for resolution inputs, PDF hints and metadata records.

mod hints;
mod input;
mod record;

pub use hints::PdfHints;
pub use input::ResolveInput;
pub use record::{ItemFields, MetadataRecord, RecordBuilder, RecordSource};
