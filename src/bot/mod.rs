//! The chat front end: commands, form conversations and the operator relay.

mod commands;
mod relay;
mod render;
#[cfg(test)]
pub(crate) mod testing;
mod workers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

pub use commands::Command;
pub use relay::{Relay, RelayState};

use crate::channels::{Channel, IncomingMessage, InlineButton, Keyboard, OutgoingResponse};
use crate::config::BotConfig;
use crate::engine::{FormEngine, Outcome, ToggleOutcome};
use crate::error::{Error, FormError, Rejection};
use crate::export::ExportSink;
use crate::form::catalog;
use crate::record::Record;
use crate::session::{ClientInfo, SessionId, spawn_prune_task};

const CANCELLED: &str = "Отменено";
const NO_ACTIVE_FORM: &str = "Для оформления заказа воспользуйтесь кнопками меню.";
const LINKS: &str = "По ссылкам ниже вы можете ознакомиться с нашими проектами:";
const RELAY_ASK_CLIENT: &str = "Напишите Id клиента, которому хотите отправить сообщение";
const RELAY_BAD_CLIENT: &str = "Id клиента должен быть числом. Попробуйте ещё раз.";
const RELAY_ASK_MESSAGE: &str = "Напишите текст сообщения или приложите фото";
const RELAY_SENT: &str =
    "Ваше сообщение отправлено. Чтобы завершить отправку сообщений, наберите /cancel";
const RELAY_DENIED: &str = "Эта команда доступна только оператору.";
const STALE_BUTTON: &str = "Эта кнопка больше не активна";
const UNKNOWN_OPTION: &str = "Неизвестная услуга";
const NOT_DELIVERED: &str =
    "Не удалось передать заявку. Пожалуйста, попробуйте оформить её ещё раз позже.";
const INTERNAL_ERROR: &str = "Что-то пошло не так. Попробуйте, пожалуйста, ещё раз.";

fn greeting(name: &str) -> String {
    format!(
        "Привет {name}!\nЯ Чат-бот!\n\
         Чтобы рассчитать стоимость приемки квартиры, нажмите /calculate\n\
         Чтобы оформить заказ на ремонт, нажмите /order\n\
         Наши проекты: /links"
    )
}

fn links() -> OutgoingResponse {
    OutgoingResponse::text(LINKS).with_keyboard(Keyboard::Inline(vec![
        vec![InlineButton::url(
            "Участвуй в STandARTup проекте",
            "https://housedecor.pro/start",
        )],
        vec![InlineButton::url(
            "Перейти на сайт HouseDecor",
            "https://housedecor.pro/",
        )],
    ]))
}

/// Connects one channel to the form engine and the export sinks.
pub struct Bot {
    engine: Arc<FormEngine>,
    channel: Arc<dyn Channel>,
    sinks: Vec<Arc<dyn ExportSink>>,
    relay: Relay,
    operator_chat_id: Option<String>,
    images_dir: PathBuf,
    session_idle_timeout: Option<Duration>,
    worker_idle_timeout: Duration,
}

impl Bot {
    pub fn new(engine: Arc<FormEngine>, channel: Arc<dyn Channel>, config: &BotConfig) -> Self {
        Self {
            engine,
            channel,
            sinks: Vec::new(),
            relay: Relay::new(),
            operator_chat_id: config.operator_chat_id.clone(),
            images_dir: config.images_dir.clone(),
            session_idle_timeout: config.session_idle_timeout,
            worker_idle_timeout: config.worker_idle_timeout,
        }
    }

    /// Deliver finished records to `sink` as well.
    pub fn with_sink(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn engine(&self) -> &Arc<FormEngine> {
        &self.engine
    }

    /// Run until Ctrl+C or until the channel stream ends.
    pub async fn run(self: Arc<Self>) -> Result<(), Error> {
        let mut messages = self.channel.start().await?;

        let prune_handle = self
            .session_idle_timeout
            .map(|max_idle| spawn_prune_task(Arc::clone(self.engine.store()), max_idle));

        let mut workers = workers::Workers::new(Arc::clone(&self), self.worker_idle_timeout);
        let mut sweep = tokio::time::interval(self.worker_idle_timeout);
        sweep.tick().await; // Skip immediate first tick

        info!(channel = self.channel.name(), "Bot ready and listening");

        loop {
            tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                _ = sweep.tick() => workers.retire_idle(),
                msg = messages.next() => match msg {
                    Some(msg) => workers.dispatch(msg),
                    None => {
                        info!("Channel stream ended, shutting down...");
                        break;
                    }
                },
            }
        }

        if let Some(handle) = prune_handle {
            handle.abort();
        }
        workers.shutdown().await;
        self.channel.shutdown().await?;
        Ok(())
    }

    /// Handle one message, telling the user when something went wrong.
    pub async fn process(&self, msg: &IncomingMessage) {
        if let Err(e) = self.handle(msg).await {
            error!(chat_id = %msg.chat_id, "Error handling message: {e}");
            let _ = self
                .channel
                .respond(msg, OutgoingResponse::text(INTERNAL_ERROR))
                .await;
        }
    }

    pub async fn handle(&self, msg: &IncomingMessage) -> Result<(), Error> {
        if msg.is_callback() {
            return self.handle_toggle(msg).await;
        }

        let session_id = SessionId::new(&msg.chat_id);
        match Command::parse(&msg.content) {
            Some(Command::Start) => {
                self.reply(msg, OutgoingResponse::text(greeting(msg.display_name())))
                    .await
            }
            Some(Command::Cancel) => {
                let relayed = self.relay.end(&msg.chat_id).await;
                let cancelled = self.engine.cancel_session(&session_id).await;
                if relayed || cancelled {
                    self.reply(
                        msg,
                        OutgoingResponse::text(CANCELLED).with_keyboard(Keyboard::Remove),
                    )
                    .await
                } else {
                    Ok(())
                }
            }
            Some(Command::Calculate) => self.start_form(msg, catalog::INSPECTION).await,
            Some(Command::Order) => self.start_form(msg, catalog::RENOVATION).await,
            Some(Command::Links) => self.reply(msg, links()).await,
            Some(Command::Forward) => self.begin_relay(msg).await,
            None => match self.relay.state(&msg.chat_id).await {
                Some(state) => self.continue_relay(msg, state).await,
                None => self.answer(msg, &session_id).await,
            },
        }
    }

    async fn reply(&self, msg: &IncomingMessage, response: OutgoingResponse) -> Result<(), Error> {
        self.channel.respond(msg, response).await?;
        Ok(())
    }

    async fn reply_all(
        &self,
        msg: &IncomingMessage,
        responses: Vec<OutgoingResponse>,
    ) -> Result<(), Error> {
        for response in responses {
            self.channel.respond(msg, response).await?;
        }
        Ok(())
    }

    async fn start_form(&self, msg: &IncomingMessage, form_id: &str) -> Result<(), Error> {
        self.relay.end(&msg.chat_id).await;
        let client = ClientInfo::new(&msg.user_id, msg.display_name());
        let prompt = self
            .engine
            .start(&SessionId::new(&msg.chat_id), form_id, client)
            .await?;
        info!(chat_id = %msg.chat_id, form = form_id, "Form started");
        self.reply_all(msg, render::prompt(&prompt, &self.images_dir))
            .await
    }

    async fn answer(&self, msg: &IncomingMessage, session_id: &SessionId) -> Result<(), Error> {
        // Stickers, photos and the like arrive without text and answer nothing.
        if msg.content.trim().is_empty() {
            return match self.engine.current_prompt(session_id).await {
                Ok(prompt) => {
                    self.reply(msg, render::rejection(Rejection::NoText, &prompt))
                        .await
                }
                Err(FormError::NoActiveSession { .. }) => {
                    self.reply(msg, OutgoingResponse::text(NO_ACTIVE_FORM)).await
                }
                Err(e) => Err(e.into()),
            };
        }

        let outcome = match self.engine.submit_input(session_id, &msg.content).await {
            Ok(outcome) => outcome,
            Err(FormError::NoActiveSession { .. }) => {
                return self
                    .reply(msg, OutgoingResponse::text(NO_ACTIVE_FORM))
                    .await;
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            Outcome::Accepted(prompt) | Outcome::Discarded(prompt) => {
                self.reply_all(msg, render::prompt(&prompt, &self.images_dir))
                    .await
            }
            Outcome::Rejected { reason, prompt } => {
                self.reply(msg, render::rejection(reason, &prompt)).await
            }
            Outcome::Completed(record) => self.complete(msg, record).await,
        }
    }

    async fn complete(&self, msg: &IncomingMessage, record: Record) -> Result<(), Error> {
        if !self.deliver(&record).await {
            return self
                .reply(
                    msg,
                    OutgoingResponse::text(NOT_DELIVERED).with_keyboard(Keyboard::Remove),
                )
                .await;
        }

        let form = self
            .engine
            .form(record.form.as_str())
            .ok_or_else(|| FormError::UnknownForm(record.form.to_string()))?;
        self.reply(msg, render::completed(&record, form.texts()))
            .await
    }

    /// Hand the record to every sink. True when at least one took it.
    async fn deliver(&self, record: &Record) -> bool {
        if self.sinks.is_empty() {
            warn!(record_id = %record.id, "No export sinks configured");
            return true;
        }

        let mut delivered = false;
        for sink in &self.sinks {
            match sink
                .export(record, self.operator_chat_id.as_deref())
                .await
            {
                Ok(()) => {
                    debug!(record_id = %record.id, sink = sink.name(), "Record exported");
                    delivered = true;
                }
                Err(e) => {
                    error!(record_id = %record.id, sink = sink.name(), "Export failed: {e}");
                }
            }
        }
        if !delivered {
            error!(record_id = %record.id, "Record not delivered:\n{}", record.to_text());
        }
        delivered
    }

    async fn handle_toggle(&self, msg: &IncomingMessage) -> Result<(), Error> {
        let session_id = SessionId::new(&msg.chat_id);
        let outcome = self.engine.submit_toggle(&session_id, &msg.content).await;

        let notice = match outcome {
            Ok(ToggleOutcome::ToggledOn(item) | ToggleOutcome::ToggledOff(item)) => {
                self.channel
                    .update_buttons(msg, vec![vec![render::toggle_button(&item)]])
                    .await?;
                None
            }
            Ok(ToggleOutcome::Unrecognized) => Some(UNKNOWN_OPTION),
            Err(FormError::NoActiveSession { .. } | FormError::StepMismatch { .. }) => {
                Some(STALE_BUTTON)
            }
            Err(e) => {
                let _ = self.channel.answer_callback(msg, None).await;
                return Err(e.into());
            }
        };
        self.channel.answer_callback(msg, notice).await?;
        Ok(())
    }

    fn is_operator(&self, chat_id: &str) -> bool {
        self.operator_chat_id.as_deref() == Some(chat_id)
    }

    async fn begin_relay(&self, msg: &IncomingMessage) -> Result<(), Error> {
        if !self.is_operator(&msg.chat_id) {
            warn!(chat_id = %msg.chat_id, "Relay requested by non-operator");
            return self.reply(msg, OutgoingResponse::text(RELAY_DENIED)).await;
        }

        self.engine
            .cancel_session(&SessionId::new(&msg.chat_id))
            .await;
        self.relay.begin(&msg.chat_id).await;
        self.reply(
            msg,
            OutgoingResponse::text(RELAY_ASK_CLIENT).with_keyboard(Keyboard::Remove),
        )
        .await
    }

    async fn continue_relay(&self, msg: &IncomingMessage, state: RelayState) -> Result<(), Error> {
        match state {
            RelayState::AwaitingClientId => match relay::parse_client_id(&msg.content) {
                Some(client_chat_id) => {
                    info!(chat_id = %msg.chat_id, client = %client_chat_id, "Relay target set");
                    self.relay.set_target(&msg.chat_id, client_chat_id).await;
                    self.reply(msg, OutgoingResponse::text(RELAY_ASK_MESSAGE))
                        .await
                }
                None => self.reply(msg, OutgoingResponse::text(RELAY_BAD_CLIENT)).await,
            },
            RelayState::Forwarding { client_chat_id } => {
                self.channel.forward(msg, &client_chat_id).await?;
                debug!(chat_id = %msg.chat_id, client = %client_chat_id, "Message relayed");
                self.reply(msg, OutgoingResponse::text(RELAY_SENT)).await
            }
        }
    }
}
