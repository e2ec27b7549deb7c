//! CLI channel: stdin/stdout REPL for local runs.
//!
//! Buttons are printed inline. A reply button is pressed by typing its text;
//! an inline button by typing `/toggle <data>`.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Attachment, ButtonAction, Channel, IncomingMessage, InlineButton, Keyboard, MessageStream,
    OutgoingResponse,
};
use crate::error::ChannelError;

const LOCAL_USER: &str = "local-user";
const TOGGLE_COMMAND: &str = "/toggle";

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Turn one input line into a message; `/toggle <id>` emulates a button.
fn parse_line(line: &str) -> Option<IncomingMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let msg = match line.strip_prefix(TOGGLE_COMMAND) {
        Some(rest) if rest.starts_with(' ') => {
            let data = rest.trim();
            IncomingMessage::callback("cli", LOCAL_USER, data, data)
        }
        _ => IncomingMessage::new("cli", LOCAL_USER, line),
    };
    Some(msg.with_user_name("Local User"))
}

fn render_inline(rows: &[Vec<InlineButton>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Callback(data) => {
                        format!("[{}] ({TOGGLE_COMMAND} {data})", button.text)
                    }
                    ButtonAction::Url(url) => format!("[{}] <{url}>", button.text),
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(response: &OutgoingResponse) -> String {
    let mut out = Vec::new();
    for attachment in &response.attachments {
        match attachment {
            Attachment::Photo { path, caption } => out.push(format!(
                "🖼  {} {}",
                path.display(),
                caption.as_deref().unwrap_or_default()
            )),
            Attachment::Document { file_name, .. } => out.push(format!("📄 {file_name}")),
        }
    }
    if !response.content.is_empty() {
        out.push(response.content.clone());
    }
    match &response.keyboard {
        Keyboard::None | Keyboard::Remove => {}
        Keyboard::Reply(rows) => out.push(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|text| format!("[{text}]"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Keyboard::Inline(rows) => out.push(render_inline(rows)),
    }
    out.join("\n")
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(msg) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_to(&self, chat_id: &str, response: OutgoingResponse) -> Result<(), ChannelError> {
        if chat_id != LOCAL_USER {
            println!("\n(to {chat_id})");
        }
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn update_buttons(
        &self,
        _msg: &IncomingMessage,
        keyboard: Vec<Vec<InlineButton>>,
    ) -> Result<(), ChannelError> {
        println!("{}", render_inline(&keyboard));
        eprint!("> ");
        Ok(())
    }

    async fn forward(&self, msg: &IncomingMessage, to_chat_id: &str) -> Result<(), ChannelError> {
        println!("\n(forwarded to {to_chat_id}) {}\n", msg.content);
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
