//! Operator relay: the operator picks a client chat and every following
//! message is forwarded there until `/cancel`.

use std::collections::HashMap;

use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    /// `/forward` was issued; the next message names the client.
    AwaitingClientId,
    /// Messages go to this client chat.
    Forwarding { client_chat_id: String },
}

/// Relay state per operator chat.
#[derive(Debug, Default)]
pub struct Relay {
    states: RwLock<HashMap<String, RelayState>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self, chat_id: &str) {
        self.states
            .write()
            .await
            .insert(chat_id.to_string(), RelayState::AwaitingClientId);
    }

    pub async fn state(&self, chat_id: &str) -> Option<RelayState> {
        self.states.read().await.get(chat_id).cloned()
    }

    pub async fn set_target(&self, chat_id: &str, client_chat_id: String) {
        self.states
            .write()
            .await
            .insert(chat_id.to_string(), RelayState::Forwarding { client_chat_id });
    }

    /// Stop relaying. Returns whether a relay was active.
    pub async fn end(&self, chat_id: &str) -> bool {
        self.states.write().await.remove(chat_id).is_some()
    }
}

/// Client ids are Telegram chat ids: signed integers.
pub fn parse_client_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().map(|_| raw.to_string())
}
