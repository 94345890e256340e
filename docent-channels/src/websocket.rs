//! WebSocket chat gateway
//!
//! Accepts client connections, runs the login handshake through the
//! credential gate, then serves one isolated chat session per connection:
//! the knowledge index is built for the session, every inbound message runs
//! one turn, and the answer streams back as delta frames followed by the
//! sources footer frame.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};

use docent_core::auth::{CredentialGate, Identity};
use docent_core::config::{AssistantDefaults, Config, KnowledgeConfig};
use docent_core::events::{DocumentPreview, InboundMessage, TurnEvent, ASSISTANT_AUTHOR};
use docent_core::session::Session;
use docent_core::utils::truncate;
use docent_engine::prompt::GREETING;
use docent_engine::{run_turn, ChatEngine, EngineConfig, TurnOutcome};
use docent_index::{build_index, ChunkingConfig};
use docent_providers::{EmbeddingProvider, LLMProvider, OpenAIClient};

use crate::base::{ChannelError, ChannelHandler, Result};

// Type alias for the WebSocket sink to simplify signatures
type WsSink = futures::stream::SplitSink<WebSocketStream<TcpStream>, WsMessage>;

/// Frames received from a chat client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Login { username: String, password: String },
    Message { content: String },
}

/// Frames sent to a chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Login accepted; the session is starting
    LoginOk { identity: Identity },
    /// Login rejected; the connection will close
    LoginFailed,
    /// A complete assistant message (greeting)
    Message { author: String, content: String },
    /// Incremental answer token
    Delta { text: String },
    /// The streamed answer message is complete
    MessageEnd { author: String, content: String },
    /// Source-attribution footer with preview attachments
    Sources {
        author: String,
        content: String,
        attachments: Vec<DocumentPreview>,
    },
    /// Turn or session failure
    Error { message: String },
}

fn server_event_from_turn(event: TurnEvent) -> ServerEvent {
    match event {
        TurnEvent::Delta { text } => ServerEvent::Delta { text },
        TurnEvent::Completed { content } => ServerEvent::MessageEnd {
            author: ASSISTANT_AUTHOR.to_string(),
            content,
        },
        TurnEvent::Sources { message } => ServerEvent::Sources {
            author: message.author,
            content: message.content,
            attachments: message.attachments,
        },
    }
}

/// Per-connection context shared by the accept loop
#[derive(Clone)]
struct ConnectionContext {
    gate: CredentialGate,
    client: Arc<OpenAIClient>,
    assistant: AssistantDefaults,
    knowledge: KnowledgeConfig,
}

/// WebSocket chat gateway handler
pub struct WebSocketGateway {
    name: String,
    config: Config,
    running: bool,
    task_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl WebSocketGateway {
    /// Create a new gateway from configuration
    pub fn new(config: Config) -> Self {
        Self {
            name: "websocket".to_string(),
            config,
            running: false,
            task_handle: None,
            shutdown_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl ChannelHandler for WebSocketGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn start(&mut self) -> Result<()> {
        // Missing secrets must fail the gateway loudly at startup
        let gate = CredentialGate::new(&self.config.auth)
            .map_err(|e| ChannelError::AuthError(e.to_string()))?;

        let api_key = if self.config.providers.openai.api_key.is_empty() {
            warn!("No provider API key configured; generation calls will fail");
            None
        } else {
            Some(self.config.providers.openai.api_key.clone())
        };
        let client = Arc::new(OpenAIClient::new(
            api_key,
            self.config.providers.openai.api_base.clone(),
            self.config.assistant.defaults.model.clone(),
            self.config.assistant.defaults.embed_model.clone(),
        ));

        let addr = (
            self.config.gateway.host.clone(),
            self.config.gateway.port,
        );
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        info!(
            "WebSocket gateway listening on {}:{}",
            self.config.gateway.host, self.config.gateway.port
        );

        let ctx = ConnectionContext {
            gate,
            client,
            assistant: self.config.assistant.defaults.clone(),
            knowledge: self.config.knowledge.clone(),
        };

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("WebSocket gateway shutting down");
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, addr)) => {
                                debug!("Connection from {}", addr);
                                let ctx = ctx.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, ctx).await {
                                        warn!("Connection {} ended with error: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept failed: {}", e);
                            }
                        }
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        self.running = false;
        Ok(())
    }
}

async fn send_event(ws_tx: &mut WsSink, event: &ServerEvent) -> Result<()> {
    let payload =
        serde_json::to_string(event).map_err(|e| ChannelError::SendError(e.to_string()))?;
    ws_tx
        .send(WsMessage::Text(payload))
        .await
        .map_err(|e| ChannelError::SendError(e.to_string()))
}

async fn handle_connection(stream: TcpStream, ctx: ConnectionContext) -> Result<()> {
    let ws = accept_async(stream)
        .await
        .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Login handshake: the first text frame must carry credentials
    let identity = loop {
        let Some(frame) = ws_rx.next().await else {
            return Ok(());
        };
        let frame = frame.map_err(|e| ChannelError::ConnectionError(e.to_string()))?;
        match frame {
            WsMessage::Text(raw) => match serde_json::from_str::<ClientEvent>(&raw) {
                Ok(ClientEvent::Login { username, password }) => {
                    match ctx.gate.authenticate(&username, &password) {
                        Some(identity) => {
                            send_event(
                                &mut ws_tx,
                                &ServerEvent::LoginOk {
                                    identity: identity.clone(),
                                },
                            )
                            .await?;
                            break identity;
                        }
                        None => {
                            warn!("Login denied for user {}", username);
                            send_event(&mut ws_tx, &ServerEvent::LoginFailed).await?;
                            let _ = ws_tx.close().await;
                            return Ok(());
                        }
                    }
                }
                _ => {
                    send_event(
                        &mut ws_tx,
                        &ServerEvent::Error {
                            message: "login required".to_string(),
                        },
                    )
                    .await?;
                    let _ = ws_tx.close().await;
                    return Ok(());
                }
            },
            WsMessage::Close(_) => return Ok(()),
            _ => continue,
        }
    };

    // Session start: build this session's knowledge index. A load failure
    // is fatal for the session and closes the connection.
    let chunking = ChunkingConfig {
        chunk_size: ctx.knowledge.chunk_size,
        chunk_overlap: ctx.knowledge.chunk_overlap,
    };
    let index = match build_index(ctx.client.as_ref(), &ctx.knowledge.dir, chunking).await {
        Ok(index) => index,
        Err(e) => {
            error!("Knowledge base load failed: {}", e);
            send_event(
                &mut ws_tx,
                &ServerEvent::Error {
                    message: format!("knowledge base unavailable: {}", e),
                },
            )
            .await?;
            let _ = ws_tx.close().await;
            return Err(ChannelError::Error(e.to_string()));
        }
    };

    let provider: Arc<dyn LLMProvider> = ctx.client.clone();
    let embedder: Arc<dyn EmbeddingProvider> = ctx.client.clone();
    let engine = Arc::new(ChatEngine::new(
        provider,
        embedder,
        index,
        EngineConfig::from(&ctx.assistant),
    ));
    let mut session = Session::new(identity);
    info!("Session {} started", session.id);

    send_event(
        &mut ws_tx,
        &ServerEvent::Message {
            author: ASSISTANT_AUTHOR.to_string(),
            content: GREETING.to_string(),
        },
    )
    .await?;

    // Turn loop
    while let Some(frame) = ws_rx.next().await {
        let frame = frame.map_err(|e| ChannelError::ConnectionError(e.to_string()))?;
        match frame {
            WsMessage::Text(raw) => {
                let event = match serde_json::from_str::<ClientEvent>(&raw) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Invalid frame: {} (raw: {})", e, truncate(&raw, 100));
                        continue;
                    }
                };
                match event {
                    ClientEvent::Message { content } => {
                        let msg =
                            InboundMessage::new("websocket", &session.identity.identifier, content);
                        debug!(
                            "Processing message from {}:{} ({} chars) for session {}",
                            msg.channel,
                            msg.sender_id,
                            msg.content.len(),
                            session.id
                        );
                        match run_session_turn(&engine, &ctx.knowledge.dir, msg.content, &mut ws_tx)
                            .await
                        {
                            Ok(outcome) => session.set_last_message(&outcome.content),
                            Err(e) => {
                                error!("Turn failed for session {}: {}", session.id, e);
                                send_event(
                                    &mut ws_tx,
                                    &ServerEvent::Error {
                                        message: e.to_string(),
                                    },
                                )
                                .await?;
                            }
                        }
                    }
                    ClientEvent::Login { .. } => {
                        warn!("Duplicate login ignored for session {}", session.id);
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Session {} closed", session.id);
    Ok(())
}

/// Drive one turn and forward its events to the socket as they arrive
async fn run_session_turn(
    engine: &Arc<ChatEngine>,
    docs_dir: &str,
    content: String,
    ws_tx: &mut WsSink,
) -> docent_core::Result<TurnOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let turn = {
        let engine = engine.clone();
        let docs_dir = PathBuf::from(docs_dir);
        async move {
            let result = run_turn(engine, docs_dir, content, &tx).await;
            drop(tx);
            result
        }
    };

    let forward = async {
        while let Some(event) = rx.recv().await {
            let frame = server_event_from_turn(event);
            if let Err(e) = send_event(ws_tx, &frame).await {
                warn!("Failed to forward turn event: {}", e);
                break;
            }
        }
    };

    let (result, ()) = tokio::join!(turn, forward);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::config::AuthConfig;
    use docent_core::events::OutboundMessage;

    #[test]
    fn test_client_event_parsing() {
        let login: ClientEvent =
            serde_json::from_str(r#"{"type":"login","username":"alice","password":"secret"}"#)
                .unwrap();
        match login {
            ClientEvent::Login { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "secret");
            }
            _ => panic!("Expected Login"),
        }

        let message: ClientEvent =
            serde_json::from_str(r#"{"type":"message","content":"hello"}"#).unwrap();
        match message {
            ClientEvent::Message { content } => assert_eq!(content, "hello"),
            _ => panic!("Expected Message"),
        }
    }

    #[test]
    fn test_server_event_wire_format() {
        let event = ServerEvent::Delta {
            text: "Hel".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"delta"#));

        let event = ServerEvent::Sources {
            author: ASSISTANT_AUTHOR.to_string(),
            content: "\nSources:\n* doc1.pdf\n".to_string(),
            attachments: vec![DocumentPreview {
                name: "doc1.pdf".to_string(),
                path: "./data/doc1.pdf".to_string(),
                mime: "application/pdf".to_string(),
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"sources"#));
        assert!(json.contains("doc1.pdf"));
    }

    #[test]
    fn test_turn_events_map_to_ordered_frames() {
        let end = server_event_from_turn(TurnEvent::Completed {
            content: "Hello, world".to_string(),
        });
        match end {
            ServerEvent::MessageEnd { author, content } => {
                assert_eq!(author, ASSISTANT_AUTHOR);
                assert_eq!(content, "Hello, world");
            }
            _ => panic!("Expected MessageEnd"),
        }

        let footer = server_event_from_turn(TurnEvent::Sources {
            message: OutboundMessage::assistant("\nSources:\n"),
        });
        match footer {
            ServerEvent::Sources { author, content, attachments } => {
                assert_eq!(author, ASSISTANT_AUTHOR);
                assert_eq!(content, "\nSources:\n");
                assert!(attachments.is_empty());
            }
            _ => panic!("Expected Sources"),
        }
    }

    #[tokio::test]
    async fn test_gateway_start_fails_without_secrets() {
        let mut config = Config::default();
        config.auth = AuthConfig::default();

        let mut gateway = WebSocketGateway::new(config);
        let err = gateway.start().await.unwrap_err();
        assert!(matches!(err, ChannelError::AuthError(_)));
        assert!(!gateway.is_running());
    }
}
