//! Document ingestion: extraction, chunking, tagging, and the embed/append pipeline

mod chunker;
mod extractor;
mod ingestor;
mod tagging;

pub use chunker::TextChunker;
pub use extractor::{PlainTextExtractor, TextExtractor};
pub use ingestor::{DocumentIngestor, IngestOutcome};
pub use tagging::TopicTagger;
