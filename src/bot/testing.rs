//! Test doubles for the bot layer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::Bot;
use crate::channels::{Channel, IncomingMessage, InlineButton, MessageStream, OutgoingResponse};
use crate::config::BotConfig;
use crate::engine::FormEngine;
use crate::error::ChannelError;

/// Channel that records everything the bot does with it.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub sent: Mutex<Vec<(String, OutgoingResponse)>>,
    pub edits: Mutex<Vec<Vec<Vec<InlineButton>>>>,
    pub notices: Mutex<Vec<Option<String>>>,
    /// `(content, to_chat_id)` of forwarded messages.
    pub forwards: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_to(&self, chat_id: &str) -> Vec<OutgoingResponse> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == chat_id)
            .map(|(_, response)| response.clone())
            .collect()
    }

    pub fn texts_to(&self, chat_id: &str) -> Vec<String> {
        self.sent_to(chat_id)
            .into_iter()
            .map(|response| response.content)
            .collect()
    }

    pub fn last_to(&self, chat_id: &str) -> OutgoingResponse {
        self.sent_to(chat_id).pop().expect("nothing sent")
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "test"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send_to(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), response));
        Ok(())
    }

    async fn update_buttons(
        &self,
        _msg: &IncomingMessage,
        keyboard: Vec<Vec<InlineButton>>,
    ) -> Result<(), ChannelError> {
        self.edits.lock().unwrap().push(keyboard);
        Ok(())
    }

    async fn answer_callback(
        &self,
        _msg: &IncomingMessage,
        notice: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.notices
            .lock()
            .unwrap()
            .push(notice.map(str::to_string));
        Ok(())
    }

    async fn forward(&self, msg: &IncomingMessage, to_chat_id: &str) -> Result<(), ChannelError> {
        self.forwards
            .lock()
            .unwrap()
            .push((msg.content.clone(), to_chat_id.to_string()));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Bot over the built-in forms talking to `channel`.
pub(crate) fn bot_with(channel: Arc<RecordingChannel>, operator: Option<&str>) -> Bot {
    let config = BotConfig {
        operator_chat_id: operator.map(str::to_string),
        ..BotConfig::default()
    };
    let engine = FormEngine::with_builtin_forms().unwrap();
    Bot::new(Arc::new(engine), channel, &config)
}
