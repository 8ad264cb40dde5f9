//! End-to-end tests of the RAG service with stub providers

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use docqa_rag::config::RagConfig;
use docqa_rag::ingestion::TextExtractor;
use docqa_rag::providers::{EmbeddingProvider, GenerationParams, TextGenerator};
use docqa_rag::storage::PersistenceManager;
use docqa_rag::{Error, Intent, RagService, Result};

const DIM: usize = 4;

const CLASS_DOC: &str = "C++ classes encapsulate state and behavior. A class bundles data \
                         members with the member functions that operate on them.";
const MEMORY_DOC: &str = "Heap memory is allocated with new and released with delete; \
                          leaking memory wastes resources over time.";

/// Projects text onto topic axes: [class-ish, memory-ish, unused, bias]
struct TopicEmbedder;

impl TopicEmbedder {
    fn axis(token: &str) -> Option<usize> {
        const CLASS_WORDS: [&str; 5] = ["encapsulate", "state", "behavior", "member", "object"];
        const MEMORY_WORDS: [&str; 5] = ["heap", "memory", "allocated", "delete", "leaking"];

        if token.starts_with("class") || CLASS_WORDS.iter().any(|w| token.starts_with(w)) {
            Some(0)
        } else if MEMORY_WORDS.contains(&token) {
            Some(1)
        } else {
            None
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0, 0.0, 0.0, 0.1];
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if let Some(axis) = Self::axis(&token.to_lowercase()) {
                v[axis] += 1.0;
            }
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "topic"
    }
}

enum Reply {
    Text(&'static str),
    Fail,
}

struct StubGenerator(Reply);

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        match self.0 {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(Error::generation("generator offline")),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(matches!(self.0, Reply::Text(_)))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

fn config(dir: &Path, dimensions: usize) -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.dimensions = dimensions;
    config.storage.data_dir = dir.to_path_buf();
    config
}

fn service_from(config: RagConfig, reply: Reply) -> RagService {
    RagService::with_providers(config, Arc::new(TopicEmbedder), Arc::new(StubGenerator(reply)))
        .unwrap()
}

fn service_with(dir: &Path, reply: Reply) -> RagService {
    service_from(config(dir, DIM), reply)
}

fn service(dir: &Path) -> RagService {
    service_with(dir, Reply::Text("Answer: A class groups data and the functions on it."))
}

fn persisted_files(dir: &Path) -> (Vec<u8>, Vec<u8>) {
    let manager = PersistenceManager::in_dir(dir);
    let vectors_path = manager.committed_vectors_path().unwrap().unwrap();
    (
        std::fs::read(vectors_path).unwrap(),
        std::fs::read(manager.metadata_path()).unwrap(),
    )
}

#[tokio::test]
async fn test_class_question_retrieves_class_document() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    assert_eq!(service.ingest("a.pdf", CLASS_DOC).await.unwrap(), 1);
    assert_eq!(service.ingest("b.pdf", MEMORY_DOC).await.unwrap(), 1);

    let results = service.search("What is a class?", 3).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.source_path, "a.pdf");
    assert!(results[0].score > 0.5);
    assert!(results[0].score > results[1].score);

    let answer = service.answer("What is a class?").await;
    assert_eq!(answer.text, "A class groups data and the functions on it.");
    assert!(!answer.used_fallback);
    assert_eq!(answer.sources, vec!["a.pdf".to_string(), "b.pdf".to_string()]);
}

#[tokio::test]
async fn test_vectors_and_metadata_stay_aligned() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    service.ingest("b.pdf", MEMORY_DOC).await.unwrap();

    let manager = PersistenceManager::new(&config(dir.path(), DIM).storage);
    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.len(), service.len());
    assert_eq!(loaded.index().records().len(), 2);
    assert_eq!(loaded.metadata().unique_sources(), 2);
    for record in loaded.index().records() {
        let norm: f32 = record.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_reingest_leaves_files_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    let before = persisted_files(dir.path());

    assert_eq!(service.ingest("a.pdf", CLASS_DOC).await.unwrap(), 0);
    assert_eq!(service.ingest("a.pdf", MEMORY_DOC).await.unwrap(), 0);

    assert_eq!(persisted_files(dir.path()), before);
    assert_eq!(service.len(), 1);
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    service.ingest("b.pdf", MEMORY_DOC).await.unwrap();

    let first = service.search("memory and classes", 2).await;
    let second = service.search("memory and classes", 2).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fresh_index_search_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    assert!(service.is_empty());
    assert!(service.search("anything", 3).await.is_empty());
}

#[tokio::test]
async fn test_empty_index_answer_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    let answer = service.answer("What is a class?").await;
    assert!(answer.is_not_found());
    assert!(!answer.used_fallback);
    assert_eq!(answer.text, service.config().answer.no_information_message);
}

#[tokio::test]
async fn test_empty_generation_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_with(dir.path(), Reply::Text(""));
    service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    service.ingest("b.pdf", MEMORY_DOC).await.unwrap();

    let answer = service.answer("What is a class?").await;
    assert!(answer.used_fallback);
    assert_eq!(
        answer.text,
        "Based on the retrieved documents: C++ classes encapsulate state and behavior. \
         Heap memory is allocated with new and released with delete; leaking memory wastes resources over time."
    );
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn test_generator_error_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_with(dir.path(), Reply::Fail);
    service.ingest("a.pdf", CLASS_DOC).await.unwrap();

    let answer = service.answer("What is a class?").await;
    assert!(answer.used_fallback);
    assert!(answer.text.contains("C++ classes encapsulate state and behavior."));
    assert_eq!(answer.sources, vec!["a.pdf".to_string()]);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = service(dir.path());
        service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    }

    let service = service(dir.path());
    assert_eq!(service.len(), 1);
    assert!(service.is_processed("a.pdf"));
    assert_eq!(service.search("class", 1).await[0].chunk.source_path, "a.pdf");
}

#[tokio::test]
async fn test_interrupted_save_keeps_committed_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let manager = PersistenceManager::in_dir(dir.path());

    let (old_vectors_path, old_vectors, old_metadata) = {
        let service = service(dir.path());
        service.ingest("a.txt", CLASS_DOC).await.unwrap();
        let vectors_path = manager.committed_vectors_path().unwrap().unwrap();
        let snapshot = (
            vectors_path.clone(),
            std::fs::read(&vectors_path).unwrap(),
            std::fs::read(manager.metadata_path()).unwrap(),
        );

        service.ingest("b.txt", MEMORY_DOC).await.unwrap();
        snapshot
    };

    // Roll the directory back to the moment the new vector file was in
    // place but metadata.json still named the previous one
    std::fs::write(&old_vectors_path, old_vectors).unwrap();
    std::fs::write(manager.metadata_path(), old_metadata).unwrap();

    let service = service(dir.path());
    assert_eq!(service.len(), 1);
    assert!(service.is_processed("a.txt"));
    assert!(!service.is_processed("b.txt"));

    assert_eq!(service.ingest("b.txt", MEMORY_DOC).await.unwrap(), 1);
    assert_eq!(service.len(), 2);
    assert_eq!(manager.load().unwrap().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_during_ingest_sees_consistent_store() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(service(dir.path()));

    let docs: Vec<(String, String)> = (0..20)
        .map(|i| (format!("doc{:02}.txt", i), format!("{} Copy number {}.", CLASS_DOC, i)))
        .collect();
    let expected: HashMap<String, String> = docs.iter().cloned().collect();

    let writer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for (path, text) in docs {
                assert_eq!(service.ingest(&path, &text).await.unwrap(), 1);
            }
        })
    };

    let mut observed = 0;
    while !writer.is_finished() {
        let results = service.search("class", 50).await;
        assert!(results.len() <= service.len());
        assert!(results.len() >= observed);
        observed = results.len();
        for result in &results {
            assert_eq!(Some(&result.chunk.text), expected.get(&result.chunk.source_path));
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    assert_eq!(service.len(), 20);
    assert_eq!(service.stats().unique_sources, 20);
    let loaded = PersistenceManager::in_dir(dir.path()).load().unwrap().unwrap();
    assert_eq!(loaded.len(), 20);
    assert_eq!(loaded.metadata().unique_sources(), 20);
}

#[tokio::test]
async fn test_corrupt_state_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = service(dir.path());
        service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    }
    std::fs::write(dir.path().join("metadata.json"), b"{ not json").unwrap();

    let service = service(dir.path());
    assert!(service.is_empty());
    assert!(!service.is_processed("a.pdf"));
}

#[tokio::test]
async fn test_persisted_dimension_mismatch_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = service(dir.path());
        service.ingest("a.pdf", CLASS_DOC).await.unwrap();
    }

    struct WideEmbedder;

    #[async_trait]
    impl EmbeddingProvider for WideEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 8])
        }
        fn dimensions(&self) -> usize {
            8
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "wide"
        }
    }

    let result = RagService::with_providers(
        config(dir.path(), 8),
        Arc::new(WideEmbedder),
        Arc::new(StubGenerator(Reply::Fail)),
    );
    assert!(matches!(
        result,
        Err(Error::DimensionMismatch { expected: 8, actual: 4 })
    ));
}

#[tokio::test]
async fn test_ingest_directory_reads_supported_files_once() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("classes.txt"), CLASS_DOC).unwrap();
    std::fs::create_dir(docs.path().join("nested")).unwrap();
    std::fs::write(docs.path().join("nested").join("memory.md"), MEMORY_DOC).unwrap();
    std::fs::write(docs.path().join("book.pdf"), b"%PDF-1.4 binary").unwrap();

    let service = service(data.path());
    assert_eq!(service.ingest_directory(docs.path()).await.unwrap(), 2);
    assert_eq!(service.stats().unique_sources, 2);

    assert_eq!(service.ingest_directory(docs.path()).await.unwrap(), 0);
    assert_eq!(service.len(), 2);
}

#[tokio::test]
async fn test_chat_routes_by_intent() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    service.ingest("a.pdf", CLASS_DOC).await.unwrap();

    let greeting = service.chat("hello").await;
    assert_eq!(greeting.intent, Intent::Greeting);
    assert!(greeting.sources.is_empty());

    let status = service.chat("show me the status").await;
    assert_eq!(status.intent, Intent::Status);
    assert!(status.reply.contains("1 chunks from 1 documents"));

    let topics = service.chat("list topics").await;
    assert_eq!(topics.intent, Intent::ListTopics);
    assert!(topics.reply.contains("classes"));

    let question = service.chat("What is a class?").await;
    assert_eq!(question.intent, Intent::Question);
    assert_eq!(question.sources, vec!["a.pdf".to_string()]);
}

#[tokio::test]
async fn test_chat_topic_questions_are_answered() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    service.ingest("a.pdf", CLASS_DOC).await.unwrap();

    for message in [
        "How many member functions can a class have?",
        "Which topics does a class relate to?",
    ] {
        let reply = service.chat(message).await;
        assert_eq!(reply.intent, Intent::Question, "{}", message);
        assert_eq!(reply.sources, vec!["a.pdf".to_string()]);
    }
}

#[tokio::test]
async fn test_chat_refresh_rescans_documents_dir() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    let mut config = config(data.path(), DIM);
    config.documents.dir = Some(docs.path().to_path_buf());
    let service = service_from(config, Reply::Fail);

    let empty = service.chat("refresh").await;
    assert_eq!(empty.intent, Intent::Refresh);
    assert!(empty.reply.contains("stored 0 new chunks"));

    std::fs::write(docs.path().join("classes.md"), CLASS_DOC).unwrap();
    let refreshed = service.chat("please reload the documents").await;
    assert_eq!(refreshed.intent, Intent::Refresh);
    assert!(refreshed.reply.contains("stored 1 new chunks"));
    assert_eq!(service.len(), 1);
}

#[tokio::test]
async fn test_chat_refresh_without_documents_dir() {
    let dir = tempfile::tempdir().unwrap();
    let reply = service(dir.path()).chat("rescan").await;

    assert_eq!(reply.intent, Intent::Refresh);
    assert!(reply.reply.contains("No documents directory"));
}

/// Reads `.notes` files, dropping lines that start with `#`
struct NotesExtractor;

#[async_trait]
impl TextExtractor for NotesExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "notes")
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(raw
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[tokio::test]
async fn test_custom_extractor_drives_ingest_directory() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(
        docs.path().join("classes.notes"),
        format!("# draft, do not index\n{}", CLASS_DOC),
    )
    .unwrap();
    std::fs::write(docs.path().join("memory.txt"), MEMORY_DOC).unwrap();

    let service = service(data.path()).with_extractor(Arc::new(NotesExtractor));
    assert_eq!(service.ingest_directory(docs.path()).await.unwrap(), 1);

    let results = service.search("class", 1).await;
    assert!(results[0].chunk.source_path.ends_with("classes.notes"));
    assert!(!results[0].chunk.text.contains("draft"));
}
