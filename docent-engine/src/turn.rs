//! Turn handling: streamed answer delivery and source attribution
//!
//! One turn = one inbound user message. The streaming query is dispatched on
//! a spawned task so the connection task stays responsive; tokens are then
//! forwarded in emission order, the finished transcript is reported, and a
//! separate sources footer message follows with document previews attached.

use futures::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use docent_core::events::{DocumentPreview, OutboundMessage, TurnEvent};
use docent_core::{Error, Result};
use docent_index::Passage;
use docent_providers::LLMStreamEvent;

use crate::engine::ChatEngine;

/// Result of one completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Full answer text, the ordered concatenation of every streamed token
    pub content: String,
    /// The sources footer message that was sent after the answer
    pub sources_message: OutboundMessage,
}

/// Map a cited file name to its display name.
///
/// Tabular sources are mirrored by a PDF rendering with the same base name,
/// so `.csv` citations are rewritten to `.pdf`; all other names pass through
/// unchanged.
pub fn display_file_name(name: &str) -> String {
    match name.strip_suffix(".csv") {
        Some(base) => format!("{}.pdf", base),
        None => name.to_string(),
    }
}

/// Build the sources footer for one turn.
///
/// File names are deduplicated by exact string equality; a citation is kept
/// only when its (possibly rewritten) file exists under `docs_dir` at render
/// time. Missing files are dropped silently from both the text and the
/// attachments.
pub fn build_sources_message(sources: &[Passage], docs_dir: &Path) -> OutboundMessage {
    let names: HashSet<&str> = sources.iter().map(|p| p.file_name.as_str()).collect();

    let mut footer = String::from("\nSources:\n");
    let mut message = OutboundMessage::assistant("");
    for name in names {
        let display_name = display_file_name(name);
        let path = docs_dir.join(&display_name);
        if !path.exists() {
            debug!("Dropping citation for missing file: {}", display_name);
            continue;
        }

        footer.push_str(&format!("* {}\n", display_name));
        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        message = message.with_attachment(DocumentPreview {
            name: display_name,
            path: path.to_string_lossy().to_string(),
            mime,
        });
    }

    message.content = footer;
    message
}

/// Run a single turn against the session's engine.
///
/// Emits `TurnEvent`s on `events` in order: zero or more `Delta`s, one
/// `Completed` carrying the full transcript, then one `Sources` footer.
/// Any dispatch or mid-stream failure aborts the turn before the footer is
/// sent and propagates to the caller; the caller owns error presentation
/// and is also responsible for persisting the outcome's content as the
/// session's last message.
pub async fn run_turn(
    engine: Arc<ChatEngine>,
    docs_dir: impl AsRef<Path>,
    content: String,
    events: &mpsc::UnboundedSender<TurnEvent>,
) -> Result<TurnOutcome> {
    // The generation call is long-running; dispatch it off this task and
    // await only the dispatch so concurrent message delivery stays live.
    let dispatch = {
        let engine = engine.clone();
        let content = content.clone();
        tokio::spawn(async move { engine.stream_chat(&content).await })
    };
    let reply = dispatch
        .await
        .map_err(|e| Error::Internal(format!("turn dispatch failed: {}", e)))??;

    let mut stream = reply.stream;
    let mut transcript = String::new();
    while let Some(event) = stream.next().await {
        match event.map_err(|e| Error::Provider(e.to_string()))? {
            LLMStreamEvent::TextDelta(text) => {
                transcript.push_str(&text);
                if events
                    .send(TurnEvent::Delta { text })
                    .is_err()
                {
                    warn!("Turn event receiver dropped mid-stream");
                }
            }
            LLMStreamEvent::Completed(_) => break,
        }
    }

    let _ = events.send(TurnEvent::Completed {
        content: transcript.clone(),
    });
    engine.record_turn(&content, &transcript);

    let sources_message = build_sources_message(&reply.sources, docs_dir.as_ref());
    let _ = events.send(TurnEvent::Sources {
        message: sources_message.clone(),
    });

    Ok(TurnOutcome {
        content: transcript,
        sources_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use async_trait::async_trait;
    use docent_index::VectorIndex;
    use docent_providers::{
        EmbeddingProvider, LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError,
        ProviderResult,
    };
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn passage(file_name: &str) -> Passage {
        Passage {
            text: "chunk".to_string(),
            file_name: file_name.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_display_file_name_rewrites_csv() {
        assert_eq!(display_file_name("table.csv"), "table.pdf");
        assert_eq!(display_file_name("paper.pdf"), "paper.pdf");
        assert_eq!(display_file_name("notes.txt"), "notes.txt");
        // Idempotent on already-rewritten names
        assert_eq!(display_file_name(&display_file_name("table.csv")), "table.pdf");
    }

    #[test]
    fn test_sources_deduplicated_and_missing_files_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc1.pdf"), b"pdf").unwrap();
        // doc2.pdf deliberately absent

        let sources = vec![passage("doc1.pdf"), passage("doc1.pdf"), passage("doc2.csv")];
        let message = build_sources_message(&sources, dir.path());

        assert_eq!(message.content.matches("* doc1.pdf").count(), 1);
        assert!(!message.content.contains("doc2"));
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].name, "doc1.pdf");
        assert_eq!(message.attachments[0].mime, "application/pdf");
    }

    #[test]
    fn test_csv_citation_resolves_to_pdf_rendering() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("table.pdf"), b"pdf").unwrap();

        let sources = vec![passage("table.csv")];
        let message = build_sources_message(&sources, dir.path());

        assert!(message.content.contains("* table.pdf"));
        assert_eq!(message.attachments.len(), 1);
    }

    #[test]
    fn test_footer_with_no_surviving_sources() {
        let dir = TempDir::new().unwrap();
        let sources = vec![passage("missing.pdf")];
        let message = build_sources_message(&sources, dir.path());

        assert_eq!(message.content, "\nSources:\n");
        assert!(message.attachments.is_empty());
    }

    struct MockEmbedder;

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, _text: &str) -> ProviderResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "mock-embed"
        }
    }

    struct ScriptedProvider {
        tokens: Vec<&'static str>,
        fail_mid_stream: bool,
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: i32,
            _temperature: f64,
        ) -> ProviderResult<LLMResponse> {
            Ok(LLMResponse {
                content: Some(self.tokens.concat()),
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            })
        }

        async fn chat_stream(
            &self,
            _messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: i32,
            _temperature: f64,
        ) -> ProviderResult<docent_providers::ProviderEventStream> {
            let mut events: Vec<ProviderResult<LLMStreamEvent>> = self
                .tokens
                .iter()
                .map(|t| Ok(LLMStreamEvent::TextDelta(t.to_string())))
                .collect();
            if self.fail_mid_stream {
                events.push(Err(ProviderError::ApiError("stream cut".to_string())));
            } else {
                events.push(Ok(LLMStreamEvent::Completed(LLMResponse {
                    content: Some(self.tokens.concat()),
                    finish_reason: "stop".to_string(),
                    usage: HashMap::new(),
                })));
            }
            Ok(Box::pin(futures::stream::iter(events)))
        }

        fn get_default_model(&self) -> String {
            "scripted".to_string()
        }
    }

    fn engine_over(docs_dir: &Path, tokens: Vec<&'static str>, fail: bool) -> Arc<ChatEngine> {
        let mut index = VectorIndex::new();
        for entry in std::fs::read_dir(docs_dir).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            index.add(vec![1.0, 0.0], "chunk", name).unwrap();
        }
        Arc::new(ChatEngine::new(
            Arc::new(ScriptedProvider {
                tokens,
                fail_mid_stream: fail,
            }),
            Arc::new(MockEmbedder),
            index,
            EngineConfig {
                model: "gpt-4o".to_string(),
                max_tokens: 2048,
                temperature: 0.1,
                top_k: 3,
                memory_token_budget: 2048,
            },
        ))
    }

    #[tokio::test]
    async fn test_turn_streams_tokens_then_footer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc1.pdf"), b"pdf").unwrap();

        let engine = engine_over(dir.path(), vec!["Hel", "lo", ", world"], false);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = run_turn(engine, dir.path(), "question".to_string(), &tx)
            .await
            .unwrap();
        assert_eq!(outcome.content, "Hello, world");

        // Events arrive in order: deltas, completed, sources
        let mut deltas = Vec::new();
        let mut completed = None;
        let mut sources = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                TurnEvent::Delta { text } => {
                    assert!(completed.is_none(), "delta after completion");
                    deltas.push(text);
                }
                TurnEvent::Completed { content } => {
                    assert!(sources.is_none(), "completion after sources");
                    completed = Some(content);
                }
                TurnEvent::Sources { message } => sources = Some(message),
            }
        }

        assert_eq!(deltas, vec!["Hel", "lo", ", world"]);
        assert_eq!(completed.as_deref(), Some("Hello, world"));
        let sources = sources.unwrap();
        assert!(sources.content.contains("* doc1.pdf"));
    }

    #[tokio::test]
    async fn test_turn_records_memory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc1.pdf"), b"pdf").unwrap();

        let engine = engine_over(dir.path(), vec!["answer"], false);
        let (tx, _rx) = mpsc::unbounded_channel();

        run_turn(engine.clone(), dir.path(), "question".to_string(), &tx)
            .await
            .unwrap();
        assert_eq!(engine.memory_len(), 2);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_without_footer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc1.pdf"), b"pdf").unwrap();

        let engine = engine_over(dir.path(), vec!["partial"], true);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = run_turn(engine, dir.path(), "question".to_string(), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        // Partial tokens were delivered, but no completion and no footer
        let mut saw_delta = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                TurnEvent::Delta { .. } => saw_delta = true,
                TurnEvent::Completed { .. } | TurnEvent::Sources { .. } => {
                    panic!("turn must abort before completion and footer")
                }
            }
        }
        assert!(saw_delta);
    }
}
