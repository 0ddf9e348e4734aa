//! Conversation controller: session lifecycle and message exchange
//!
//! Owns the conversation state and drives its transitions against the
//! backend. Methods take `&mut self`, so a second send cannot start until
//! the current exchange resolves; presentation layers queue commands.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use newschat_core::{ConversationState, Message, SessionId, SessionStore};

use crate::backend::BackendClient;

/// Point-in-time view of the conversation for presentation layers
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub session: Option<SessionId>,
    pub messages: Vec<Message>,
    pub typing: bool,
}

/// Drives the conversation against the backend session API
pub struct ChatController {
    client: BackendClient,
    store: Box<dyn SessionStore>,
    state: ConversationState,
    session: Option<SessionId>,
    updates: Option<mpsc::UnboundedSender<ConversationSnapshot>>,
}

impl ChatController {
    /// Create a controller over a backend client and session store
    pub fn new(client: BackendClient, store: Box<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            state: ConversationState::new(),
            session: None,
            updates: None,
        }
    }

    /// Publish a snapshot after every state change
    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<ConversationSnapshot>) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Current session id, if one has been established
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Current conversation state
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Restore a stored session's history or establish a fresh session
    ///
    /// Failures are logged and leave the default greeting in place; the UI
    /// stays interactive either way.
    pub async fn initialize(&mut self) {
        if let Some(id) = self.store.load() {
            self.session = Some(id.clone());

            match self.client.chat_history(&id).await {
                Ok(turns) if !turns.is_empty() => {
                    let messages = turns
                        .into_iter()
                        .map(|turn| match turn.role.as_str() {
                            "assistant" => Message::bot(turn.content, Vec::new()),
                            _ => Message::user(turn.content),
                        })
                        .collect();
                    self.state.replace(messages);
                    self.publish();
                    return;
                }
                Ok(_) => debug!("Stored session {} has no history", id),
                Err(e) => {
                    warn!("Failed to fetch history for stored session: {}", e);
                    self.publish();
                    return;
                }
            }
        }

        self.start_session().await;
        self.publish();
    }

    /// Exchange one user message with the backend
    ///
    /// No-op when the text is blank or no session exists. The user message
    /// appears immediately; the bot reply is appended only when the exchange
    /// succeeds. Persistence calls are best-effort and never retried.
    pub async fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let session = match &self.session {
            Some(id) => id.clone(),
            None => return,
        };

        self.state.push(Message::user(text));
        self.state.set_typing(true);
        self.publish();

        // Persist the user turn in the background; the result is ignored.
        let client = self.client.clone();
        let turn_session = session.clone();
        let turn_text = text.to_string();
        tokio::spawn(async move {
            if let Err(e) = client.post_turn(&turn_session, "user", &turn_text).await {
                warn!("Failed to persist user turn: {}", e);
            }
        });

        match self.client.send_chat(&session, text).await {
            Ok(reply) => {
                if let Err(e) = self
                    .client
                    .post_turn(&session, "assistant", &reply.answer)
                    .await
                {
                    warn!("Failed to persist bot turn: {}", e);
                }
                self.state.push(Message::bot(reply.answer, reply.context));
            }
            Err(e) => warn!("Chat request failed: {}", e),
        }

        self.state.set_typing(false);
        self.publish();
    }

    /// Drop the conversation and obtain a fresh session
    ///
    /// The old session is superseded, not deleted: the backend reset call is
    /// best-effort and its result ignored.
    pub async fn reset(&mut self) {
        let old = match &self.session {
            Some(id) => id.clone(),
            None => return,
        };

        self.state.reset();
        self.publish();

        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.reset_session(&old).await {
                warn!("Failed to reset backend session: {}", e);
            }
        });

        self.start_session().await;
        self.publish();
    }

    /// Request and persist a fresh session id
    async fn start_session(&mut self) {
        match self.client.create_session().await {
            Ok(id) => {
                if let Err(e) = self.store.save(&id) {
                    warn!("Failed to persist session id: {}", e);
                }
                self.session = Some(id);
            }
            Err(e) => warn!("Failed to create session: {}", e),
        }
    }

    fn publish(&self) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(ConversationSnapshot {
                session: self.session.clone(),
                messages: self.state.messages().to_vec(),
                typing: self.state.typing(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newschat_core::conversation::GREETING;
    use newschat_core::Sender;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory session store, the fake the trait exists for
    #[derive(Clone, Default)]
    struct MemoryStore {
        inner: Arc<Mutex<Option<String>>>,
    }

    impl MemoryStore {
        fn with_id(id: &str) -> Self {
            Self {
                inner: Arc::new(Mutex::new(Some(id.to_string()))),
            }
        }

        fn current(&self) -> Option<String> {
            self.inner.lock().unwrap().clone()
        }
    }

    impl SessionStore for MemoryStore {
        fn load(&self) -> Option<String> {
            self.inner.lock().unwrap().clone()
        }

        fn save(&self, id: &str) -> newschat_core::Result<()> {
            *self.inner.lock().unwrap() = Some(id.to_string());
            Ok(())
        }
    }

    fn controller_for(server: &mockito::ServerGuard, store: MemoryStore) -> ChatController {
        let client = BackendClient::new(server.url(), Duration::from_secs(5));
        ChatController::new(client, Box::new(store))
    }

    #[tokio::test]
    async fn test_initialize_restores_stored_history() {
        let mut server = mockito::Server::new_async().await;
        let _history = server
            .mock("GET", "/api/session/chat_history/abc")
            .with_status(200)
            .with_body(
                r#"{"messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#,
            )
            .create_async()
            .await;
        let new_session = server
            .mock("GET", "/api/session/new_session/")
            .expect(0)
            .create_async()
            .await;

        let store = MemoryStore::with_id("abc");
        let mut controller = controller_for(&server, store.clone());
        controller.initialize().await;

        let messages = controller.state().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].text, "hello");
        assert!(!controller.state().typing());
        assert_eq!(controller.session(), Some("abc"));
        assert_eq!(store.current().unwrap(), "abc");
        new_session.assert_async().await;
    }

    #[tokio::test]
    async fn test_initialize_creates_session_when_none_stored() {
        let mut server = mockito::Server::new_async().await;
        let new_session = server
            .mock("GET", "/api/session/new_session/")
            .with_status(200)
            .with_body(r#"{"session_id":"fresh-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = MemoryStore::default();
        let mut controller = controller_for(&server, store.clone());
        controller.initialize().await;

        assert_eq!(controller.session(), Some("fresh-1"));
        assert_eq!(store.current().unwrap(), "fresh-1");
        // The greeting stays in place
        let messages = controller.state().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, GREETING);
        new_session.assert_async().await;
    }

    #[tokio::test]
    async fn test_initialize_with_empty_history_creates_session() {
        let mut server = mockito::Server::new_async().await;
        let _history = server
            .mock("GET", "/api/session/chat_history/abc")
            .with_status(200)
            .with_body(r#"{"messages":[]}"#)
            .create_async()
            .await;
        let new_session = server
            .mock("GET", "/api/session/new_session/")
            .with_status(200)
            .with_body(r#"{"session_id":"fresh-2"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = MemoryStore::with_id("abc");
        let mut controller = controller_for(&server, store.clone());
        controller.initialize().await;

        assert_eq!(controller.session(), Some("fresh-2"));
        assert_eq!(store.current().unwrap(), "fresh-2");
        assert_eq!(controller.state().messages()[0].text, GREETING);
        new_session.assert_async().await;
    }

    #[tokio::test]
    async fn test_initialize_history_failure_keeps_greeting_and_session() {
        let mut server = mockito::Server::new_async().await;
        let _history = server
            .mock("GET", "/api/session/chat_history/abc")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let new_session = server
            .mock("GET", "/api/session/new_session/")
            .expect(0)
            .create_async()
            .await;

        let store = MemoryStore::with_id("abc");
        let mut controller = controller_for(&server, store.clone());
        controller.initialize().await;

        assert_eq!(controller.session(), Some("abc"));
        assert_eq!(controller.state().messages()[0].text, GREETING);
        new_session.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_blank_text_is_noop() {
        let server = mockito::Server::new_async().await;
        let mut controller = controller_for(&server, MemoryStore::with_id("abc"));
        controller.session = Some("abc".to_string());

        controller.send("").await;
        controller.send("   ").await;

        assert_eq!(controller.state().messages().len(), 1);
        assert!(!controller.state().typing());
    }

    #[tokio::test]
    async fn test_send_without_session_is_noop() {
        let server = mockito::Server::new_async().await;
        let mut controller = controller_for(&server, MemoryStore::default());

        controller.send("hello").await;

        assert_eq!(controller.state().messages().len(), 1);
        assert!(!controller.state().typing());
    }

    #[tokio::test]
    async fn test_send_appends_user_then_bot_message() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"answer":"hi there","news_context":[]}"#)
            .expect(1)
            .create_async()
            .await;
        let _turns = server
            .mock("POST", "/api/session/chat_message/abc")
            .with_status(200)
            .with_body("{}")
            .expect_at_least(0)
            .create_async()
            .await;

        let mut controller = controller_for(&server, MemoryStore::with_id("abc"));
        controller.session = Some("abc".to_string());

        controller.send("hello").await;

        let messages = controller.state().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "hello");
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(messages[2].text, "hi there");
        assert!(messages[2].context.is_empty());
        assert!(!controller.state().typing());
        chat.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_failure_appends_no_bot_message() {
        let mut server = mockito::Server::new_async().await;
        let _chat = server
            .mock("POST", "/api/chat")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;
        let _turns = server
            .mock("POST", "/api/session/chat_message/abc")
            .with_status(200)
            .with_body("{}")
            .expect_at_least(0)
            .create_async()
            .await;

        let mut controller = controller_for(&server, MemoryStore::with_id("abc"));
        controller.session = Some("abc".to_string());

        controller.send("hello").await;

        let messages = controller.state().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::User);
        assert!(!controller.state().typing());
    }

    #[tokio::test]
    async fn test_send_publishes_typing_snapshots() {
        let mut server = mockito::Server::new_async().await;
        let _chat = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"answer":"hi there"}"#)
            .create_async()
            .await;
        let _turns = server
            .mock("POST", "/api/session/chat_message/abc")
            .with_status(200)
            .with_body("{}")
            .expect_at_least(0)
            .create_async()
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = BackendClient::new(server.url(), Duration::from_secs(5));
        let mut controller =
            ChatController::new(client, Box::new(MemoryStore::with_id("abc"))).with_updates(tx);
        controller.session = Some("abc".to_string());

        controller.send("hello").await;

        let first = rx.try_recv().unwrap();
        assert!(first.typing);
        assert_eq!(first.messages.last().unwrap().text, "hello");

        let second = rx.try_recv().unwrap();
        assert!(!second.typing);
        assert_eq!(second.messages.last().unwrap().text, "hi there");
    }

    #[tokio::test]
    async fn test_reset_returns_to_greeting_and_new_session() {
        let mut server = mockito::Server::new_async().await;
        let _reset = server
            .mock("POST", "/api/session/reset/abc")
            .with_status(200)
            .with_body("{}")
            .expect_at_least(0)
            .create_async()
            .await;
        let new_session = server
            .mock("GET", "/api/session/new_session/")
            .with_status(200)
            .with_body(r#"{"session_id":"fresh-3"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = MemoryStore::with_id("abc");
        let mut controller = controller_for(&server, store.clone());
        controller.session = Some("abc".to_string());
        controller.state.push(Message::user("hello"));

        controller.reset().await;

        let messages = controller.state().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, GREETING);
        assert!(!controller.state().typing());
        assert_eq!(controller.session(), Some("fresh-3"));
        assert_eq!(store.current().unwrap(), "fresh-3");
        new_session.assert_async().await;
    }

    #[tokio::test]
    async fn test_reset_without_session_is_noop() {
        let server = mockito::Server::new_async().await;
        let mut controller = controller_for(&server, MemoryStore::default());
        controller.state.push(Message::user("hello"));

        controller.reset().await;

        assert_eq!(controller.state().messages().len(), 2);
        assert!(controller.session().is_none());
    }
}
