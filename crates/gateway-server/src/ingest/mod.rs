//! CSV ingestion: uploaded file → decoded records → published batch

pub mod decoder;
pub mod pipeline;
pub mod upload;

pub use decoder::{DecodeError, DecoderOptions, MalformedRowPolicy, RowIssue, TabularDecoder};
pub use pipeline::{IngestReport, IngestStage, IngestionError, IngestionPipeline};
pub use upload::UploadedFile;
