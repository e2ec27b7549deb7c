//! Per-conversation session state and its transitions.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::answers::{Answers, ToggleSet};
use crate::error::FormError;
use crate::form::{AnswerValue, Form, OptionId, Position, Step};

/// Identifies one conversation. For chat transports this is the chat id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who is filling in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Transport-level user id.
    pub id: String,
    pub full_name: String,
}

impl ClientInfo {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }
}

/// Progress of one user through one form.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub form: Arc<Form>,
    pub position: Position,
    pub answers: Answers,
    pub toggles: ToggleSet,
    pub client: ClientInfo,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the session leaves the store; a closed session must not be
    /// mutated by whoever still holds its handle.
    pub(crate) closed: bool,
}

impl Session {
    /// Fresh session at the first step of `form`.
    pub fn new(id: SessionId, form: Arc<Form>, client: ClientInfo) -> Self {
        let now = Utc::now();
        Self {
            id,
            position: Position::Step(form.first_step()),
            form,
            answers: Answers::default(),
            toggles: ToggleSet::default(),
            client,
            started_at: now,
            updated_at: now,
            closed: false,
        }
    }

    /// The step awaiting an answer; `None` at the terminal confirmation.
    pub fn current_step(&self) -> Option<&Step> {
        self.position.step().and_then(|id| self.form.step(id))
    }

    pub fn is_terminal(&self) -> bool {
        self.position.is_terminal()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Store `value` under the current step and move to the next position.
    ///
    /// `value` is `None` when leaving a toggle step, which contributes
    /// through the toggle set only.
    pub fn advance(&mut self, value: Option<AnswerValue>) -> Result<Position, FormError> {
        let current = self.position.step().ok_or_else(|| self.mismatch("a form step"))?;
        let next = self
            .form
            .step_after(current)
            .ok_or_else(|| FormError::FormDefinition {
                form: self.form.id().to_string(),
                reason: format!("session {} sits on unknown step {current}", self.id),
            })?;

        if let Some(value) = value {
            self.answers.record(current, value);
        }
        self.position = next;
        self.touch();
        Ok(next)
    }

    /// Flip `option`. The session must be at the toggle step offering it.
    pub fn toggle(&mut self, option: OptionId) -> Result<bool, FormError> {
        let offered_at = self.form.toggle_step_for(option).ok_or_else(|| {
            FormError::UnrecognizedOption {
                form: self.form.id().to_string(),
                option,
            }
        })?;
        if self.position != Position::Step(offered_at) {
            return Err(self.mismatch(offered_at.as_str()));
        }
        let selected = self.toggles.toggle(option);
        self.touch();
        Ok(selected)
    }

    /// Drop every answer and selection and go back to the first step.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.toggles.clear();
        self.position = Position::Step(self.form.first_step());
        self.touch();
    }

    /// Whether the session has been left alone for longer than `max_idle`.
    pub fn is_idle(&self, max_idle: TimeDelta, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.updated_at) > max_idle
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn mismatch(&self, expected: &str) -> FormError {
        FormError::StepMismatch {
            session_id: self.id.to_string(),
            expected: expected.to_string(),
            actual: self.position.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::StepId;
    use crate::form::catalog::{self, option_ids};

    fn inspection_session() -> Session {
        Session::new(
            SessionId::new("42"),
            Arc::new(catalog::inspection_form().unwrap()),
            ClientInfo::new("42", "Иван Петров"),
        )
    }

    #[test]
    fn new_session_starts_at_first_step() {
        let session = inspection_session();
        assert_eq!(session.position, Position::Step(StepId::new("house_area")));
        assert!(session.answers.is_empty());
        assert!(!session.is_closed());
    }

    #[test]
    fn advance_walks_the_chain_to_terminal() {
        let mut session = inspection_session();
        assert_eq!(
            session.advance(Some(AnswerValue::Number("50".into()))).unwrap(),
            Position::Step(StepId::new("rooms_number"))
        );
        assert_eq!(
            session.advance(Some(AnswerValue::Choice("2".into()))).unwrap(),
            Position::Step(StepId::new("user_choices"))
        );
        assert_eq!(session.advance(None).unwrap(), Position::Terminal);
        assert!(session.is_terminal());
        assert_eq!(session.answers.len(), 2);
    }

    #[test]
    fn advance_at_terminal_is_a_mismatch() {
        let mut session = inspection_session();
        session.position = Position::Terminal;
        let err = session.advance(None).unwrap_err();
        assert!(matches!(err, FormError::StepMismatch { actual, .. } if actual == "terminal"));
    }

    #[test]
    fn toggle_only_at_its_step() {
        let mut session = inspection_session();
        let err = session.toggle(option_ids::AREA_CHECK).unwrap_err();
        assert!(matches!(err, FormError::StepMismatch { expected, .. } if expected == "user_choices"));

        session.position = Position::Step(StepId::new("user_choices"));
        assert!(session.toggle(option_ids::AREA_CHECK).unwrap());
        assert!(!session.toggle(option_ids::AREA_CHECK).unwrap());
    }

    #[test]
    fn toggle_unknown_option_is_unrecognized() {
        let mut session = inspection_session();
        session.position = Position::Step(StepId::new("user_choices"));
        let err = session.toggle(OptionId::new("sauna")).unwrap_err();
        assert!(matches!(err, FormError::UnrecognizedOption { .. }));
    }

    #[test]
    fn reset_clears_progress() {
        let mut session = inspection_session();
        session.advance(Some(AnswerValue::Number("50".into()))).unwrap();
        session.advance(Some(AnswerValue::Choice("1".into()))).unwrap();
        session.toggle(option_ids::BANK_EVALUATION).unwrap();
        session.advance(None).unwrap();

        session.reset();
        assert_eq!(session.position, Position::Step(StepId::new("house_area")));
        assert!(session.answers.is_empty());
        assert_eq!(session.toggles.selected().count(), 0);
    }

    #[test]
    fn idle_detection() {
        let session = inspection_session();
        let later = session.updated_at + TimeDelta::minutes(31);
        assert!(session.is_idle(TimeDelta::minutes(30), later));
        assert!(!session.is_idle(TimeDelta::minutes(60), later));
    }
}
