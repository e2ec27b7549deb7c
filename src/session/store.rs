//! Session store: in-memory map of live sessions with one lock per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::state::{ClientInfo, Session, SessionId};
use crate::error::FormError;
use crate::form::{AnswerValue, Form, OptionId, Position};

/// How often the prune task looks for idle sessions.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by id.
///
/// The map lock is only held to look a session up, insert or remove it.
/// Every mutation of a session runs under that session's own mutex, so
/// sessions progress independently while each one sees its inputs one at a
/// time.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Return the session for `id`, creating it at the first step of `form`
    /// when absent.
    pub async fn get_or_create(
        &self,
        id: &SessionId,
        form: Arc<Form>,
        client: ClientInfo,
    ) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(id.clone()).or_insert_with(|| {
            info!(session_id = %id, form = %form.id(), "Session created");
            Arc::new(Mutex::new(Session::new(id.clone(), form, client)))
        });
        Arc::clone(handle)
    }

    /// Start `form` afresh for `id`, replacing any session already there.
    pub async fn start(&self, id: &SessionId, form: Arc<Form>, client: ClientInfo) -> SessionHandle {
        let form_id = form.id();
        let handle = Arc::new(Mutex::new(Session::new(id.clone(), form, client)));
        let previous = self
            .sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&handle));

        if let Some(previous) = previous {
            previous.lock().await.close();
            debug!(session_id = %id, "Replaced previous session");
        }
        info!(session_id = %id, form = %form_id, "Session started");
        handle
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Run `f` inside the exclusive section of session `id`.
    ///
    /// If `f` closes the session, it is removed from the store before the
    /// lock is released, so no other input can reach it afterwards.
    pub async fn update<T, F>(&self, id: &SessionId, f: F) -> Result<T, FormError>
    where
        F: FnOnce(&mut Session) -> Result<T, FormError>,
    {
        let handle = self.get(id).await.ok_or_else(|| no_session(id))?;
        let mut session = handle.lock().await;
        if session.is_closed() {
            return Err(no_session(id));
        }

        let result = f(&mut *session);

        if session.is_closed() {
            self.remove_handle(id, &handle).await;
        }
        result
    }

    /// Store `value` under the current step and move on.
    pub async fn advance(
        &self,
        id: &SessionId,
        value: Option<AnswerValue>,
    ) -> Result<Position, FormError> {
        self.update(id, |session| session.advance(value)).await
    }

    /// Flip one option of session `id`. Returns the new state.
    pub async fn toggle(&self, id: &SessionId, option: OptionId) -> Result<bool, FormError> {
        self.update(id, |session| session.toggle(option)).await
    }

    /// Abandon session `id`. Returns whether there was one.
    pub async fn cancel(&self, id: &SessionId) -> bool {
        let removed = self.take(id).await;
        if removed {
            info!(session_id = %id, "Session cancelled");
        }
        removed
    }

    /// Remove session `id` after it completed normally.
    pub async fn clear(&self, id: &SessionId) -> bool {
        let removed = self.take(id).await;
        if removed {
            debug!(session_id = %id, "Session cleared");
        }
        removed
    }

    /// Remove every session idle for longer than `max_idle`. Sessions busy
    /// with an input are never idle. Returns the number removed.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or(TimeDelta::MAX);
        self.prune_idle_at(max_idle, Utc::now()).await
    }

    async fn prune_idle_at(&self, max_idle: TimeDelta, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(mut session) if session.is_idle(max_idle, now) => {
                session.close();
                debug!(session_id = %id, "Session expired");
                false
            }
            _ => true,
        });

        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(count = pruned, "Pruned idle sessions");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn take(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(handle) => {
                handle.lock().await.close();
                true
            }
            None => false,
        }
    }

    /// Remove `id` only if it still maps to `handle`; a concurrent `start`
    /// may already have put a new session there.
    async fn remove_handle(&self, id: &SessionId, handle: &SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            sessions.remove(id);
        }
    }
}

fn no_session(id: &SessionId) -> FormError {
    FormError::NoActiveSession {
        session_id: id.to_string(),
    }
}

/// Spawn a background task that periodically drops idle sessions.
pub fn spawn_prune_task(store: Arc<SessionStore>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            store.prune_idle(max_idle).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::StepId;
    use crate::form::catalog::{self, option_ids};

    fn form() -> Arc<Form> {
        Arc::new(catalog::inspection_form().unwrap())
    }

    fn client() -> ClientInfo {
        ClientInfo::new("7", "Anna")
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_session() {
        let store = SessionStore::new();
        let id = SessionId::new("7");

        let first = store.get_or_create(&id, form(), client()).await;
        store.advance(&id, Some(AnswerValue::Number("30".into()))).await.unwrap();
        let second = store.get_or_create(&id, form(), client()).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.lock().await.position,
            Position::Step(StepId::new("rooms_number"))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn start_replaces_and_closes_previous() {
        let store = SessionStore::new();
        let id = SessionId::new("7");

        let old = store.start(&id, form(), client()).await;
        store.advance(&id, Some(AnswerValue::Number("30".into()))).await.unwrap();
        let new = store.start(&id, form(), client()).await;

        assert!(old.lock().await.is_closed());
        assert_eq!(
            new.lock().await.position,
            Position::Step(StepId::new("house_area"))
        );
    }

    #[tokio::test]
    async fn advance_without_session_fails() {
        let store = SessionStore::new();
        let err = store
            .advance(&SessionId::new("nobody"), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FormError::NoActiveSession {
                session_id: "nobody".into()
            }
        );
    }

    #[tokio::test]
    async fn toggle_through_store() {
        let store = SessionStore::new();
        let id = SessionId::new("7");
        store.start(&id, form(), client()).await;
        store.advance(&id, Some(AnswerValue::Number("30".into()))).await.unwrap();
        store.advance(&id, Some(AnswerValue::Choice("2".into()))).await.unwrap();

        assert!(store.toggle(&id, option_ids::LEGAL_PENALTY).await.unwrap());
        assert!(!store.toggle(&id, option_ids::LEGAL_PENALTY).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let store = SessionStore::new();
        let id = SessionId::new("7");
        let handle = store.start(&id, form(), client()).await;

        assert!(store.cancel(&id).await);
        assert!(!store.cancel(&id).await);
        assert!(handle.lock().await.is_closed());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn closed_handle_cannot_be_mutated() {
        let store = SessionStore::new();
        let id = SessionId::new("7");
        let stale = store.start(&id, form(), client()).await;
        store.cancel(&id).await;
        store.start(&id, form(), client()).await;

        // the stale handle is closed; updates go to the fresh session only
        assert!(stale.lock().await.is_closed());
        store.advance(&id, Some(AnswerValue::Number("10".into()))).await.unwrap();
        assert_eq!(stale.lock().await.answers.len(), 0);
    }

    #[tokio::test]
    async fn closing_inside_update_removes_session() {
        let store = SessionStore::new();
        let id = SessionId::new("7");
        store.start(&id, form(), client()).await;

        store
            .update(&id, |session| {
                session.close();
                Ok(())
            })
            .await
            .unwrap();
        assert!(!store.contains(&id).await);
    }

    #[tokio::test]
    async fn prune_removes_only_idle_sessions() {
        let store = SessionStore::new();
        store.start(&SessionId::new("a"), form(), client()).await;
        store.start(&SessionId::new("b"), form(), client()).await;

        assert_eq!(store.prune_idle(Duration::from_secs(3600)).await, 0);

        let later = Utc::now() + TimeDelta::hours(2);
        assert_eq!(store.prune_idle_at(TimeDelta::hours(1), later).await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::new();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        store.start(&a, form(), client()).await;
        store.start(&b, form(), client()).await;

        store.advance(&a, Some(AnswerValue::Number("1".into()))).await.unwrap();
        store.cancel(&b).await;

        assert!(store.contains(&a).await);
        assert!(!store.contains(&b).await);
    }
}
