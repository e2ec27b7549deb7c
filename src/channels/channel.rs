//! Channel trait and the message types that cross it.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of incoming messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A button press on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// Id to acknowledge the press with.
    pub id: String,
    /// Message carrying the pressed keyboard.
    pub message_id: Option<i64>,
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced it.
    pub channel: String,
    pub user_id: String,
    pub user_name: Option<String>,
    /// Conversation to answer in. Equals `user_id` for private chats.
    pub chat_id: String,
    /// Message text, or the callback data of a button press.
    pub content: String,
    /// Transport id of the message, used for forwarding.
    pub message_id: Option<i64>,
    /// Set when this is a button press rather than a typed message.
    pub callback: Option<Callback>,
    pub received_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            chat_id: user_id.to_string(),
            content: content.to_string(),
            message_id: None,
            callback: None,
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    /// A button press carrying `data`.
    pub fn callback(channel: &str, user_id: &str, data: &str, callback_id: &str) -> Self {
        let mut msg = Self::new(channel, user_id, data);
        msg.callback = Some(Callback {
            id: callback_id.to_string(),
            message_id: None,
        });
        msg
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = chat_id.into();
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_message_id(mut self, message_id: i64) -> Self {
        match self.callback.as_mut() {
            Some(callback) => callback.message_id = Some(message_id),
            None => self.message_id = Some(message_id),
        }
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_id)
    }
}

/// What a button does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Sends the data back as a callback.
    Callback(String),
    /// Opens a link.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the user has.
    #[default]
    None,
    /// Hide the reply keyboard.
    Remove,
    /// Reply keyboard; pressing a button sends its text.
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<InlineButton>>),
}

/// A file sent along with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Photo {
        path: PathBuf,
        caption: Option<String>,
    },
    Document {
        file_name: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

/// A response to send on a channel.
#[derive(Debug, Clone, Default)]
pub struct OutgoingResponse {
    pub content: String,
    pub keyboard: Keyboard,
    /// Sent before the text.
    pub attachments: Vec<Attachment>,
    pub metadata: serde_json::Value,
}

impl OutgoingResponse {
    /// Plain text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A message transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving. The stream ends when the channel stops.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a response to an arbitrary chat.
    async fn send_to(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError>;

    /// Answer in the chat `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.send_to(&msg.chat_id, response).await
    }

    /// Replace the inline keyboard of the message a callback came from.
    async fn update_buttons(
        &self,
        msg: &IncomingMessage,
        keyboard: Vec<Vec<InlineButton>>,
    ) -> Result<(), ChannelError>;

    /// Acknowledge a button press, optionally with a short notice.
    async fn answer_callback(
        &self,
        _msg: &IncomingMessage,
        _notice: Option<&str>,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Forward `msg` unchanged to another chat.
    async fn forward(&self, msg: &IncomingMessage, to_chat_id: &str) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_chat_defaults_to_user_id() {
        let msg = IncomingMessage::new("telegram", "123", "hello");
        assert_eq!(msg.chat_id, "123");
        assert!(!msg.is_callback());
        assert_eq!(msg.display_name(), "123");
    }

    #[test]
    fn callback_keeps_message_id_on_the_callback() {
        let msg = IncomingMessage::callback("telegram", "123", "area_check", "cb-1")
            .with_message_id(77)
            .with_user_name("Анна");
        assert!(msg.is_callback());
        assert_eq!(msg.content, "area_check");
        assert_eq!(msg.message_id, None);
        assert_eq!(
            msg.callback,
            Some(Callback {
                id: "cb-1".into(),
                message_id: Some(77)
            })
        );
        assert_eq!(msg.display_name(), "Анна");
    }

    #[test]
    fn outgoing_builder() {
        let response = OutgoingResponse::text("Кол-во комнат?")
            .with_keyboard(Keyboard::Reply(vec![vec!["1".into(), "2".into()]]))
            .with_attachment(Attachment::Photo {
                path: PathBuf::from("images/Loft_style.jpg"),
                caption: Some("лофт".into()),
            });
        assert_eq!(response.content, "Кол-во комнат?");
        assert_eq!(response.attachments.len(), 1);
        assert!(matches!(response.keyboard, Keyboard::Reply(_)));
    }
}
