//! End-to-end pipeline and shell behavior over fake collaborators.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docchat::document::{Document, EmbeddedChunk, SearchHit};
use docchat::embedding::{EmbeddingClient, EmbeddingError};
use docchat::llm::{ChatClient, LlmError};
use docchat::pipeline::{AnswerError, IngestionPipeline, QueryPipeline, TOP_K};
use docchat::prompt::REFUSAL_SENTENCE;
use docchat::shell;
use docchat::store::{StoreQueryError, StoreWriteError, VectorStore};
use serde_json::json;
use tokio::sync::RwLock;

/// Deterministic embedder hashing bytes into a normalized vector.
struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        for (idx, byte) in text.bytes().enumerate() {
            embedding[idx % self.dimension] += f32::from(byte) / 255.0;
        }
        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

/// In-memory store keyed by chunk id, searching by cosine similarity.
#[derive(Default)]
struct MemoryStore {
    records: RwLock<BTreeMap<String, EmbeddedChunk>>,
    ensured: AtomicUsize,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, _dimension: usize) -> Result<(), StoreWriteError> {
        self.ensured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<(), StoreWriteError> {
        let mut records = self.records.write().await;
        for chunk in chunks {
            records.insert(chunk.chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreQueryError> {
        let records = self.records.read().await;
        let mut hits: Vec<SearchHit> = records
            .values()
            .map(|record| SearchHit {
                id: record.chunk.id.clone(),
                text: record.chunk.text.clone(),
                metadata: record.chunk.metadata.clone(),
                score: cosine_similarity(embedding, &record.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("comparable scores"));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn health(&self) -> Result<(), StoreQueryError> {
        Ok(())
    }
}

/// Chat fake that honors the instruction contract: replies from context when
/// the needle is present, otherwise emits the fixed refusal sentence.
struct ContextBoundChat {
    needle: &'static str,
    reply: &'static str,
    calls: AtomicUsize,
}

impl ContextBoundChat {
    fn new(needle: &'static str, reply: &'static str) -> Self {
        Self {
            needle,
            reply,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatClient for ContextBoundChat {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let context = prompt
            .split("REGRAS:")
            .next()
            .expect("prompt has a context section");
        if context.contains(self.needle) {
            Ok(self.reply.to_string())
        } else {
            Ok(REFUSAL_SENTENCE.to_string())
        }
    }
}

/// Chat fake that records every prompt and always refuses.
#[derive(Default)]
struct RecordingChat {
    prompts: RwLock<Vec<String>>,
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.write().await.push(prompt.to_string());
        Ok(REFUSAL_SENTENCE.to_string())
    }
}

fn document(text: &str) -> Document {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), json!("relatorio.pdf"));
    metadata.insert("page".to_string(), json!(0));
    Document {
        text: text.to_string(),
        metadata,
    }
}

#[tokio::test]
async fn short_document_ingests_as_one_full_chunk() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let pipeline = IngestionPipeline::new(&embedder, &store);

    let text = "O valor do aporte mínimo é R$500.";
    let stored = pipeline
        .ingest_documents(&[document(text)])
        .await
        .expect("ingestion succeeded");

    assert_eq!(stored, 1);
    let records = store.records.read().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records["doc-0"].chunk.text, text);
}

#[tokio::test]
async fn ingest_assigns_sequential_ids_and_reingest_overwrites() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let pipeline = IngestionPipeline::new(&embedder, &store).with_window(20, 5);

    let documents = vec![document(&"aporte mensal de quinhentos reais ".repeat(5))];
    let first = pipeline
        .ingest_documents(&documents)
        .await
        .expect("first ingestion");
    assert!(first > 1);

    {
        let records = store.records.read().await;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort_by_key(|id| {
            id.trim_start_matches("doc-")
                .parse::<usize>()
                .expect("numeric suffix")
        });
        let expected: Vec<String> = (0..first).map(|i| format!("doc-{i}")).collect();
        assert_eq!(ids, expected);
    }

    let second = pipeline
        .ingest_documents(&documents)
        .await
        .expect("second ingestion");
    assert_eq!(first, second);
    assert_eq!(store.records.read().await.len(), first);
}

#[tokio::test]
async fn ingest_drops_empty_metadata_entries() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let pipeline = IngestionPipeline::new(&embedder, &store);

    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), json!("relatorio.pdf"));
    metadata.insert("author".to_string(), json!(""));
    metadata.insert("subject".to_string(), serde_json::Value::Null);
    let documents = vec![Document {
        text: "conteúdo".to_string(),
        metadata,
    }];

    pipeline
        .ingest_documents(&documents)
        .await
        .expect("ingestion succeeded");

    let records = store.records.read().await;
    let stored = &records["doc-0"].chunk.metadata;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["source"], json!("relatorio.pdf"));
}

#[tokio::test]
async fn empty_document_is_a_clean_zero_chunk_success() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let pipeline = IngestionPipeline::new(&embedder, &store);

    let stored = pipeline
        .ingest_documents(&[document("   \n  ")])
        .await
        .expect("ingestion succeeded");

    assert_eq!(stored, 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.ensured.load(Ordering::SeqCst), 0);
    assert!(store.records.read().await.is_empty());
}

#[tokio::test]
async fn answer_retrieves_at_most_top_k_ordered_hits() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let ingestion = IngestionPipeline::new(&embedder, &store).with_window(12, 2);

    let stored = ingestion
        .ingest_documents(&[document(&"rendimento anual líquido de cada fundo ".repeat(8))])
        .await
        .expect("ingestion succeeded");
    assert!(stored > TOP_K);

    let chat = RecordingChat::default();
    let query = QueryPipeline::new(&embedder, &store, &chat);
    query.answer("Qual o rendimento?").await.expect("answer");

    let prompts = chat.prompts.read().await;
    let prompt = prompts.first().expect("one prompt recorded");
    let hits = prompt.matches("(score: ").count();
    assert_eq!(hits, TOP_K);

    // Scores in the serialized context must be non-increasing.
    let scores: Vec<f32> = prompt
        .split("(score: ")
        .skip(1)
        .map(|rest| {
            rest.split(')')
                .next()
                .expect("closing parenthesis")
                .parse::<f32>()
                .expect("numeric score")
        })
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn unanswerable_question_yields_the_refusal_sentence() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let ingestion = IngestionPipeline::new(&embedder, &store);
    ingestion
        .ingest_documents(&[document(
            "O fundo aplica em títulos públicos com liquidez diária.",
        )])
        .await
        .expect("ingestion succeeded");

    let chat = ContextBoundChat::new("capital da França", "Paris.");
    let query = QueryPipeline::new(&embedder, &store, &chat);

    let answer = query
        .answer("Qual é a capital da França?")
        .await
        .expect("answer");
    assert_eq!(answer, REFUSAL_SENTENCE);
}

#[tokio::test]
async fn answerable_question_is_answered_from_context() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let ingestion = IngestionPipeline::new(&embedder, &store);
    ingestion
        .ingest_documents(&[document("O valor do aporte mínimo é R$500.")])
        .await
        .expect("ingestion succeeded");

    let chat = ContextBoundChat::new("R$500", "O valor do aporte mínimo é R$500.");
    let query = QueryPipeline::new(&embedder, &store, &chat);

    let answer = query
        .answer("Qual o aporte mínimo?")
        .await
        .expect("answer");
    assert!(answer.contains("R$500"));
}

#[tokio::test]
async fn empty_question_is_rejected_before_any_external_call() {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let chat = RecordingChat::default();
    let query = QueryPipeline::new(&embedder, &store, &chat);

    let error = query.answer("   ").await.expect_err("empty question");
    assert!(matches!(error, AnswerError::EmptyQuestion));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(chat.prompts.read().await.is_empty());
}

async fn run_shell_with_input(input: &str) -> (String, usize) {
    let embedder = HashEmbedder::new(16);
    let store = MemoryStore::default();
    let chat = ContextBoundChat::new("R$500", "O valor do aporte mínimo é R$500.");
    IngestionPipeline::new(&embedder, &store)
        .ingest_documents(&[document("O valor do aporte mínimo é R$500.")])
        .await
        .expect("ingestion succeeded");

    let query = QueryPipeline::new(&embedder, &store, &chat);
    let mut output = Vec::new();
    shell::run(&query, Cursor::new(input.to_string()), &mut output)
        .await
        .expect("shell ran");

    (
        String::from_utf8(output).expect("utf-8 output"),
        chat.calls.load(Ordering::SeqCst),
    )
}

#[tokio::test]
async fn shell_exits_cleanly_on_every_keyword_variant() {
    for keyword in ["exit", "quit", "sair", "SAIR", "Quit"] {
        let (output, turns) = run_shell_with_input(&format!("{keyword}\n")).await;
        assert!(
            output.contains(shell::FAREWELL),
            "missing farewell for {keyword}"
        );
        assert_eq!(turns, 0, "no turn should run for {keyword}");
    }
}

#[tokio::test]
async fn shell_answers_a_question_then_exits() {
    let (output, turns) = run_shell_with_input("Qual o aporte mínimo?\nsair\n").await;
    assert!(output.contains(shell::GREETING));
    assert!(output.contains("Assistente: O valor do aporte mínimo é R$500."));
    assert!(output.contains(shell::FAREWELL));
    assert_eq!(turns, 1);
}

#[tokio::test]
async fn shell_reports_a_failed_turn_and_continues() {
    let (output, turns) = run_shell_with_input("\nQual o aporte mínimo?\nsair\n").await;
    assert!(output.contains("não consegui responder agora"));
    assert!(output.contains("Assistente: O valor do aporte mínimo é R$500."));
    assert!(output.contains(shell::FAREWELL));
    assert_eq!(turns, 1);
}

#[tokio::test]
async fn shell_treats_end_of_input_as_exit() {
    let (output, turns) = run_shell_with_input("").await;
    assert!(output.contains(shell::FAREWELL));
    assert_eq!(turns, 0);
}
