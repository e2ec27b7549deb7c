//! Telegram channel: long-polls the Bot API for messages and button presses.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::channels::{
    Attachment, ButtonAction, Channel, IncomingMessage, InlineButton, Keyboard, MessageStream,
    OutgoingResponse,
};
use crate::error::{ChannelError, ExportError};
use crate::export::ExportSink;
use crate::record::Record;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before asking again.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        check_user_allowed(&self.allowed_users, [username])
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        check_user_allowed(&self.allowed_users, identities)
    }

    /// POST a JSON body to a Bot API method and check the HTTP status.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| send_failed(format!("{method}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!("{method} returned {status}: {err}")));
        }
        resp.json()
            .await
            .map_err(|e| ChannelError::Http(format!("{method}: {e}")))
    }

    /// Send a text message, split to Telegram's length limit. The keyboard
    /// goes with the last chunk.
    ///
    /// No parse mode: texts echo user input and must not be read as markup.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last
                && let Some(markup) = reply_markup(keyboard)
            {
                body["reply_markup"] = markup;
            }
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    async fn send_attachment(
        &self,
        chat_id: &str,
        attachment: Attachment,
    ) -> Result<(), ChannelError> {
        let result = match attachment {
            Attachment::Photo { path, caption } => {
                self.send_photo(chat_id, &path, caption.as_deref()).await
            }
            Attachment::Document {
                file_name,
                bytes,
                caption,
            } => {
                self.send_document_bytes(chat_id, bytes, &file_name, caption.as_deref())
                    .await
            }
        };
        result.map_err(|e| send_failed(e.to_string()))
    }

    // ── Rich media methods ─────────────────────────────────────────

    /// Send a document from bytes (in-memory).
    pub async fn send_document_bytes(
        &self,
        chat_id: &str,
        file_bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
    ) -> anyhow::Result<()> {
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendDocument failed: {err}");
        }

        tracing::info!("Telegram document sent to {chat_id}: {file_name}");
        Ok(())
    }

    /// Send a photo from disk.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        file_path: &Path,
        caption: Option<&str>,
    ) -> anyhow::Result<()> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg");

        let file_bytes = tokio::fs::read(file_path).await?;
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendPhoto failed: {err}");
        }

        tracing::debug!("Telegram photo sent to {chat_id}: {file_name}");
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(description) => {
                        tracing::warn!("Telegram getUpdates refused: {description}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_to(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError> {
        for attachment in response.attachments {
            // A missing picture should not swallow the question that follows it.
            if let Err(e) = self.send_attachment(chat_id, attachment).await {
                tracing::warn!(chat_id, "Telegram attachment failed: {e}");
            }
        }
        if response.content.is_empty() {
            return Ok(());
        }
        self.send_message(chat_id, &response.content, &response.keyboard)
            .await
    }

    async fn update_buttons(
        &self,
        msg: &IncomingMessage,
        keyboard: Vec<Vec<InlineButton>>,
    ) -> Result<(), ChannelError> {
        let message_id = msg
            .callback
            .as_ref()
            .and_then(|cb| cb.message_id)
            .ok_or_else(|| ChannelError::InvalidMessage("callback without message id".into()))?;

        let body = json!({
            "chat_id": msg.chat_id,
            "message_id": message_id,
            "reply_markup": inline_keyboard(&keyboard),
        });
        self.call("editMessageReplyMarkup", &body).await.map(|_| ())
    }

    async fn answer_callback(
        &self,
        msg: &IncomingMessage,
        notice: Option<&str>,
    ) -> Result<(), ChannelError> {
        let Some(callback) = msg.callback.as_ref() else {
            return Ok(());
        };
        let mut body = json!({ "callback_query_id": callback.id });
        if let Some(text) = notice {
            body["text"] = Value::String(text.to_string());
        }
        self.call("answerCallbackQuery", &body).await.map(|_| ())
    }

    async fn forward(&self, msg: &IncomingMessage, to_chat_id: &str) -> Result<(), ChannelError> {
        let message_id = msg
            .message_id
            .ok_or_else(|| ChannelError::InvalidMessage("message without id".into()))?;
        let body = json!({
            "chat_id": to_chat_id,
            "from_chat_id": msg.chat_id,
            "message_id": message_id,
        });
        self.call("forwardMessage", &body).await.map(|_| ())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ExportSink for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Upload the record as a text document to the operator chat.
    async fn export(&self, record: &Record, destination: Option<&str>) -> Result<(), ExportError> {
        let chat_id = destination.ok_or_else(|| ExportError::DeliveryFailed {
            sink: "telegram".into(),
            reason: "no operator chat configured".into(),
        })?;

        self.send_document_bytes(
            chat_id,
            record.to_text().into_bytes(),
            &record.file_name(),
            None,
        )
        .await
        .map_err(|e| ExportError::DeliveryFailed {
            sink: "telegram".into(),
            reason: e.to_string(),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason,
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Updates of a getUpdates response, or the API's error description.
fn poll_results(data: &Value) -> Result<&[Value], String> {
    if data.get("ok").and_then(Value::as_bool) == Some(true)
        && let Some(results) = data.get("result").and_then(Value::as_array)
    {
        return Ok(results.as_slice());
    }
    Err(data
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no result in response")
        .to_string())
}

/// Turn one getUpdates entry into an incoming message.
///
/// Returns `None` for update kinds we do not handle and for senders outside
/// the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let (user_id, username, display) = sender(from)?;
        if !check_user_allowed(allowed_users, [username.as_str(), user_id.as_str()]) {
            tracing::warn!(
                "Telegram: ignoring button press from unauthorized user: \
                 username={username}, user_id={user_id}"
            );
            return None;
        }

        let callback_id = query.get("id").and_then(Value::as_str)?;
        let data = query.get("data").and_then(Value::as_str).unwrap_or_default();
        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map_or_else(|| user_id.clone(), |id| id.to_string());

        let mut incoming = IncomingMessage::callback("telegram", &user_id, data, callback_id)
            .with_chat_id(chat_id)
            .with_user_name(&display)
            .with_metadata(json!({ "username": username }));
        if let Some(message_id) = message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64)
        {
            incoming = incoming.with_message_id(message_id);
        }
        return Some(incoming);
    }

    let message = update.get("message")?;
    let (user_id, username, display) = sender(message.get("from")?)?;
    if !check_user_allowed(allowed_users, [username.as_str(), user_id.as_str()]) {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: \
             username={username}, user_id={user_id}"
        );
        return None;
    }

    // Photos and documents carry their text in the caption; the operator
    // relay forwards them as a whole.
    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map_or_else(|| user_id.clone(), |id| id.to_string());

    let mut incoming = IncomingMessage::new("telegram", &user_id, text)
        .with_chat_id(chat_id)
        .with_user_name(&display)
        .with_metadata(json!({ "username": username }));
    if let Some(message_id) = message.get("message_id").and_then(Value::as_i64) {
        incoming = incoming.with_message_id(message_id);
    }
    Some(incoming)
}

/// Numeric id, username and full name of an update's sender.
fn sender(from: &Value) -> Option<(String, String, String)> {
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let first = from.get("first_name").and_then(Value::as_str);
    let last = from.get("last_name").and_then(Value::as_str);
    let display = match (first, last) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        _ => username.clone(),
    };
    Some((user_id, username, display))
}

fn inline_keyboard(rows: &[Vec<InlineButton>]) -> Value {
    let rows: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Callback(data) => {
                        json!({ "text": button.text, "callback_data": data })
                    }
                    ButtonAction::Url(url) => json!({ "text": button.text, "url": url }),
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn reply_markup(keyboard: &Keyboard) -> Option<Value> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Remove => Some(json!({ "remove_keyboard": true })),
        Keyboard::Reply(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|text| json!({ "text": text })).collect())
                .collect();
            Some(json!({ "keyboard": rows, "resize_keyboard": true }))
        }
        Keyboard::Inline(rows) => Some(inline_keyboard(rows)),
    }
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char
/// boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }

        // Find a good split point
        let chunk = &remaining[..cut];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(allowed: &[&str]) -> TelegramChannel {
        TelegramChannel::new(
            SecretString::from("123:ABC".to_string()),
            allowed.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn wildcard() -> Vec<String> {
        vec!["*".into()]
    }

    // ── Basic channel tests ─────────────────────────────────────────

    #[test]
    fn telegram_channel_name() {
        assert_eq!(Channel::name(&channel(&["*"])), "telegram");
        assert_eq!(ExportSink::name(&channel(&["*"])), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel(&[]).api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── User allowlist tests ────────────────────────────────────────

    #[test]
    fn telegram_user_allowed_wildcard() {
        assert!(channel(&["*"]).is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_allowed_specific() {
        let ch = channel(&["alice", "bob"]);
        assert!(ch.is_user_allowed("alice"));
        assert!(!ch.is_user_allowed("eve"));
    }

    #[test]
    fn telegram_user_denied_empty() {
        assert!(!channel(&[]).is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_exact_match_not_substring() {
        let ch = channel(&["alice"]);
        assert!(!ch.is_user_allowed("alice_bot"));
        assert!(!ch.is_user_allowed("malice"));
    }

    #[test]
    fn telegram_user_allowed_by_numeric_id_identity() {
        let ch = channel(&["123456789"]);
        assert!(ch.is_any_user_allowed(["unknown", "123456789"]));
        assert!(!ch.is_any_user_allowed(["unknown", "987654321"]));
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn parse_text_message() {
        let update = json!({
            "update_id": 1,
            "message": {
                "message_id": 55,
                "from": {"id": 42, "username": "ivan", "first_name": "Иван", "last_name": "Петров"},
                "chat": {"id": 42},
                "text": "/calculate"
            }
        });
        let msg = parse_update(&update, &wildcard()).unwrap();
        assert_eq!(msg.user_id, "42");
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.content, "/calculate");
        assert_eq!(msg.message_id, Some(55));
        assert_eq!(msg.display_name(), "Иван Петров");
        assert!(!msg.is_callback());
    }

    #[test]
    fn poll_results_accepts_ok_response() {
        let data = json!({"ok": true, "result": [{"update_id": 1}, {"update_id": 2}]});
        assert_eq!(poll_results(&data).unwrap().len(), 2);
    }

    #[test]
    fn poll_results_reports_refused_poll() {
        let conflict = json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: terminated by other getUpdates request"
        });
        assert_eq!(
            poll_results(&conflict).unwrap_err(),
            "Conflict: terminated by other getUpdates request"
        );
        assert_eq!(
            poll_results(&json!({"ok": true})).unwrap_err(),
            "no result in response"
        );
    }

    #[test]
    fn parse_photo_uses_caption() {
        let update = json!({
            "update_id": 2,
            "message": {
                "message_id": 56,
                "from": {"id": 42},
                "chat": {"id": 42},
                "photo": [],
                "caption": "Смотрите"
            }
        });
        let msg = parse_update(&update, &wildcard()).unwrap();
        assert_eq!(msg.content, "Смотрите");
        assert_eq!(msg.display_name(), "unknown");
    }

    #[test]
    fn parse_callback_query() {
        let update = json!({
            "update_id": 3,
            "callback_query": {
                "id": "cb-9",
                "from": {"id": 42, "first_name": "Иван"},
                "message": {"message_id": 77, "chat": {"id": -100}},
                "data": "area_check"
            }
        });
        let msg = parse_update(&update, &wildcard()).unwrap();
        assert!(msg.is_callback());
        assert_eq!(msg.content, "area_check");
        assert_eq!(msg.chat_id, "-100");
        let callback = msg.callback.unwrap();
        assert_eq!(callback.id, "cb-9");
        assert_eq!(callback.message_id, Some(77));
    }

    #[test]
    fn parse_drops_unauthorized_sender() {
        let update = json!({
            "update_id": 4,
            "message": {
                "message_id": 1,
                "from": {"id": 7, "username": "eve"},
                "chat": {"id": 7},
                "text": "hi"
            }
        });
        assert!(parse_update(&update, &["alice".to_string()]).is_none());
        assert!(parse_update(&update, &["7".to_string()]).is_some());
    }

    #[test]
    fn parse_ignores_other_updates() {
        let update = json!({"update_id": 5, "edited_message": {}});
        assert!(parse_update(&update, &wildcard()).is_none());
    }

    // ── Keyboard markup ─────────────────────────────────────────────

    #[test]
    fn reply_keyboard_markup() {
        let markup = reply_markup(&Keyboard::Reply(vec![
            vec!["1".into(), "2".into()],
            vec!["Студия".into()],
        ]))
        .unwrap();
        assert_eq!(markup["keyboard"][0][1]["text"], "2");
        assert_eq!(markup["keyboard"][1][0]["text"], "Студия");
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[test]
    fn inline_keyboard_markup() {
        let markup = reply_markup(&Keyboard::Inline(vec![
            vec![InlineButton::callback("Оценка для банка ❌", "bank_evaluation")],
            vec![InlineButton::url("Сайт", "https://housedecor.pro/")],
        ]))
        .unwrap();
        assert_eq!(
            markup["inline_keyboard"][0][0]["callback_data"],
            "bank_evaluation"
        );
        assert_eq!(markup["inline_keyboard"][1][0]["url"], "https://housedecor.pro/");
    }

    #[test]
    fn remove_and_none_markup() {
        assert_eq!(
            reply_markup(&Keyboard::Remove),
            Some(json!({"remove_keyboard": true}))
        );
        assert_eq!(reply_markup(&Keyboard::None), None);
    }

    // ── Network error tests (expected to fail with no server) ───────

    #[tokio::test]
    async fn telegram_send_photo_nonexistent_file() {
        let ch = channel(&["*"]);
        let path = Path::new("/nonexistent/path/to/photo.jpg");

        let result = ch.send_photo("123456", path, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn export_without_destination_fails() {
        let ch = channel(&["*"]);
        let record = crate::record::tests_support::sample_record();
        let err = ch.export(&record, None).await.unwrap_err();
        assert!(matches!(err, ExportError::DeliveryFailed { .. }));
    }

    // ── Message splitting tests ─────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        // Cyrillic letters are two bytes each; 4096 falls mid-letter for odd offsets.
        let msg = format!("x{}", "ж".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.concat(), msg);
        assert!(chunks.iter().all(|c| c.len() <= 4096));
    }
}
