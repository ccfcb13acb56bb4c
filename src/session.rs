//! Per-conversation session state and the session repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::appsheet::Product;
use crate::orders::Order;

/// Conversation position. One variant per state, each carrying exactly the
/// data that state needs, so a stale product selection cannot leak into an
/// unrelated state.
#[derive(Debug, Clone)]
pub enum ConversationState {
    AwaitingStart,
    AwaitingMainMenu,
    AwaitingName,
    AwaitingAddress,
    AwaitingPhone,
    AwaitingProduct,
    /// More than one product matched; waiting for a 1-indexed pick.
    AwaitingProductChoice { matches: Vec<Product> },
    /// A product is selected; waiting for the quantity. `matches` is the
    /// result set the selection came from and is offered again after the
    /// item is added when it held more than one candidate.
    AwaitingQuantity {
        selected: Product,
        matches: Vec<Product>,
    },
    /// Offering another pick from the previous result set.
    AwaitingAnotherFromList { matches: Vec<Product> },
    AwaitingFaqQuestion,
    AwaitingFaqRetryChoice,
}

/// Transient conversation state for one user. Lives in process memory only;
/// a restart drops every session.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: ConversationState,
    pub order: Order,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: ConversationState::AwaitingStart,
            order: Order::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session repository keyed by conversation id (phone number or chat id).
/// Injected into the turn driver so a durable store can replace the
/// in-memory one without touching conversation logic.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the stored session, or create and store a fresh one.
    async fn load_or_create(&self, conversation_id: &str) -> Session;

    /// Persist the session for the next turn. Concurrent turns for one
    /// conversation are not coordinated: last write wins.
    async fn save(&self, conversation_id: &str, session: Session);

    /// Drop the session (terminal states and the fatal-error fallback).
    async fn remove(&self, conversation_id: &str);
}

/// In-memory implementation backing the repository trait.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_or_create(&self, conversation_id: &str) -> Session {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(Session::new)
            .clone()
    }

    async fn save(&self, conversation_id: &str, session: Session) {
        self.sessions
            .lock()
            .await
            .insert(conversation_id.to_string(), session);
    }

    async fn remove(&self, conversation_id: &str) {
        self.sessions.lock().await.remove(conversation_id);
    }
}
