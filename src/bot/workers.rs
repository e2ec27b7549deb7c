//! Per-chat workers.
//!
//! Messages of one chat are handled strictly in arrival order, different
//! chats concurrently. A worker that stays idle is retired; its successor
//! for the same chat waits for it to drain first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::Bot;
use crate::channels::IncomingMessage;

struct Worker {
    tx: mpsc::UnboundedSender<IncomingMessage>,
    last_seen: Instant,
    handle: JoinHandle<()>,
}

pub(crate) struct Workers {
    bot: Arc<Bot>,
    idle_timeout: Duration,
    active: HashMap<String, Worker>,
    /// Retired workers that may still be finishing queued messages.
    draining: HashMap<String, JoinHandle<()>>,
}

impl Workers {
    pub(crate) fn new(bot: Arc<Bot>, idle_timeout: Duration) -> Self {
        Self {
            bot,
            idle_timeout,
            active: HashMap::new(),
            draining: HashMap::new(),
        }
    }

    /// Queue `msg` on its chat's worker, spawning one if needed.
    pub(crate) fn dispatch(&mut self, msg: IncomingMessage) {
        let chat_id = msg.chat_id.clone();
        let msg = match self.active.get_mut(&chat_id) {
            Some(worker) => match worker.tx.send(msg) {
                Ok(()) => {
                    worker.last_seen = Instant::now();
                    return;
                }
                // The task is gone (it panicked); start over.
                Err(mpsc::error::SendError(msg)) => {
                    self.active.remove(&chat_id);
                    msg
                }
            },
            None => msg,
        };

        let previous = self.draining.remove(&chat_id);
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(msg);
        let handle = tokio::spawn(run_worker(
            Arc::clone(&self.bot),
            chat_id.clone(),
            previous,
            rx,
        ));
        tracing::debug!(chat_id = %chat_id, "Worker started");
        self.active.insert(
            chat_id,
            Worker {
                tx,
                last_seen: Instant::now(),
                handle,
            },
        );
    }

    /// Retire workers idle for longer than the timeout and forget drained ones.
    pub(crate) fn retire_idle(&mut self) {
        let now = Instant::now();
        let idle: Vec<String> = self
            .active
            .iter()
            .filter(|(_, worker)| now.duration_since(worker.last_seen) >= self.idle_timeout)
            .map(|(chat_id, _)| chat_id.clone())
            .collect();

        for chat_id in idle {
            if let Some(worker) = self.active.remove(&chat_id) {
                // Dropping the sender lets the worker exit once its queue is empty.
                drop(worker.tx);
                self.draining.insert(chat_id, worker.handle);
            }
        }
        self.draining.retain(|_, handle| !handle.is_finished());
        tracing::trace!(
            active = self.active_count(),
            draining = self.draining.len(),
            "Worker sweep"
        );
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Close every queue and wait for the workers to finish.
    pub(crate) async fn shutdown(self) {
        let handles = self
            .active
            .into_values()
            .map(|worker| worker.handle)
            .chain(self.draining.into_values());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Worker ended abnormally: {e}");
            }
        }
    }
}

async fn run_worker(
    bot: Arc<Bot>,
    chat_id: String,
    previous: Option<JoinHandle<()>>,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
) {
    if let Some(previous) = previous
        && let Err(e) = previous.await
    {
        tracing::warn!(chat_id = %chat_id, "Previous worker ended abnormally: {e}");
    }

    while let Some(msg) = rx.recv().await {
        bot.process(&msg).await;
    }
    tracing::debug!(chat_id = %chat_id, "Worker stopped");
}
