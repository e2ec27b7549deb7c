//! Form engine: the transport-independent entry point.
//!
//! Transports hand raw user input to [`FormEngine`] tagged with a session id
//! and get back a [`Prompt`] describing what to ask next, or the finished
//! [`Record`]. The engine never renders and never performs I/O.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{FormError, Rejection};
use crate::form::{
    AnswerValue, Form, FormId, GalleryItem, OptionId, Position, StepId, StepKind, Validated,
    catalog, validate,
};
use crate::record::{self, Record};
use crate::session::{ClientInfo, Session, SessionId, SessionStore};

/// Labels of the confirmation buttons.
pub const CONFIRM_YES: &str = "✅ да";
pub const CONFIRM_NO: &str = "❌ нет";

/// One add-on as shown on a toggle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleItem {
    pub id: OptionId,
    pub label: &'static str,
    pub description: &'static str,
    pub selected: bool,
}

/// What kind of input the next prompt expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedInput {
    FreeText,
    Number,
    Phone,
    Choice {
        rows: Vec<Vec<&'static str>>,
    },
    Toggles {
        items: Vec<ToggleItem>,
        continue_label: &'static str,
    },
    Confirmation {
        yes: &'static str,
        no: &'static str,
    },
}

/// The next question of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub form: FormId,
    pub position: Position,
    /// Sent before the question, e.g. the form intro.
    pub preamble: Option<&'static str>,
    pub text: String,
    pub expected: ExpectedInput,
    /// Pictures to show before the question.
    pub gallery: Vec<GalleryItem>,
}

impl Prompt {
    fn for_session(session: &Session) -> Result<Self, FormError> {
        let form = &session.form;
        let (text, expected, gallery) = match session.current_step() {
            None => (
                record::summary(session)?,
                ExpectedInput::Confirmation {
                    yes: CONFIRM_YES,
                    no: CONFIRM_NO,
                },
                Vec::new(),
            ),
            Some(step) => {
                let expected = match &step.kind {
                    StepKind::FreeText => ExpectedInput::FreeText,
                    StepKind::NumericText => ExpectedInput::Number,
                    StepKind::Phone { .. } => ExpectedInput::Phone,
                    StepKind::SingleChoice { rows } => ExpectedInput::Choice { rows: rows.clone() },
                    StepKind::MultiToggle {
                        options,
                        continue_label,
                    } => ExpectedInput::Toggles {
                        items: options
                            .iter()
                            .filter_map(|id| form.option(id.as_str()))
                            .map(|option| ToggleItem {
                                id: option.id,
                                label: option.label,
                                description: option.description,
                                selected: session.toggles.is_selected(option.id),
                            })
                            .collect(),
                        continue_label: *continue_label,
                    },
                };
                (step.prompt.to_string(), expected, step.gallery.clone())
            }
        };

        Ok(Self {
            form: form.id(),
            position: session.position,
            preamble: None,
            text,
            expected,
            gallery,
        })
    }

    fn with_preamble(mut self, preamble: &'static str) -> Self {
        self.preamble = Some(preamble);
        self
    }
}

/// Result of submitting one raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The input was stored; ask the next question.
    Accepted(Prompt),
    /// The input does not fit the current step; nothing changed.
    Rejected { reason: Rejection, prompt: Prompt },
    /// The user declined the summary; the session is back at step one.
    Discarded(Prompt),
    /// The user confirmed; the session is gone.
    Completed(Record),
}

/// Result of pressing an add-on button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    ToggledOn(ToggleItem),
    ToggledOff(ToggleItem),
    /// The id is not in the form's catalog; nothing changed.
    Unrecognized,
}

/// Parse the answer to the confirmation summary.
pub fn parse_confirmation(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "✅ да" | "да" | "yes" => Some(true),
        "❌ нет" | "нет" | "no" => Some(false),
        _ => None,
    }
}

/// Drives sessions through the registered forms.
pub struct FormEngine {
    forms: HashMap<&'static str, Arc<Form>>,
    store: Arc<SessionStore>,
}

impl FormEngine {
    pub fn new(forms: Vec<Form>, store: Arc<SessionStore>) -> Result<Self, FormError> {
        let mut registry = HashMap::with_capacity(forms.len());
        for form in forms {
            let id = form.id().as_str();
            if registry.insert(id, Arc::new(form)).is_some() {
                return Err(FormError::FormDefinition {
                    form: id.to_string(),
                    reason: "registered twice".into(),
                });
            }
        }
        Ok(Self {
            forms: registry,
            store,
        })
    }

    /// Engine over the inspection and renovation forms.
    pub fn with_builtin_forms() -> Result<Self, FormError> {
        Self::new(catalog::builtin_forms()?, SessionStore::new())
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn form(&self, id: &str) -> Option<Arc<Form>> {
        self.forms.get(id).cloned()
    }

    /// Begin `form_id` for `session_id`, discarding any session in progress.
    pub async fn start(
        &self,
        session_id: &SessionId,
        form_id: &str,
        client: ClientInfo,
    ) -> Result<Prompt, FormError> {
        let form = self
            .form(form_id)
            .ok_or_else(|| FormError::UnknownForm(form_id.to_string()))?;
        let intro = form.texts().intro;
        let handle = self.store.start(session_id, form, client).await;
        let session = handle.lock().await;
        Ok(Prompt::for_session(&session)?.with_preamble(intro))
    }

    pub async fn has_session(&self, session_id: &SessionId) -> bool {
        self.store.contains(session_id).await
    }

    /// Re-ask the current question without changing anything.
    pub async fn current_prompt(&self, session_id: &SessionId) -> Result<Prompt, FormError> {
        self.store
            .update(session_id, |session| Prompt::for_session(session))
            .await
    }

    /// Feed one raw text input to the session.
    pub async fn submit_input(
        &self,
        session_id: &SessionId,
        raw: &str,
    ) -> Result<Outcome, FormError> {
        self.store
            .update(session_id, |session| match session.position {
                Position::Terminal => confirm(session, raw),
                Position::Step(step_id) => {
                    let form = Arc::clone(&session.form);
                    let step = form.step(step_id).ok_or_else(|| FormError::FormDefinition {
                        form: form.id().to_string(),
                        reason: format!("session {} sits on unknown step {step_id}", session.id),
                    })?;

                    let checked = validate(step, raw).and_then(|validated| match validated {
                        Validated::Answer(value) if !priceable(&form, step_id, &value) => {
                            Err(Rejection::OutOfRange)
                        }
                        other => Ok(other),
                    });
                    let value = match checked {
                        Ok(Validated::Answer(value)) => Some(value),
                        Ok(Validated::Continue) => None,
                        Err(reason) => {
                            debug!(session_id = %session.id, step = %step_id, %reason, "Answer rejected");
                            return Ok(Outcome::Rejected {
                                reason,
                                prompt: Prompt::for_session(session)?,
                            });
                        }
                    };
                    let next = session.advance(value)?;
                    debug!(session_id = %session.id, step = %step_id, %next, "Answer accepted");
                    Ok(Outcome::Accepted(Prompt::for_session(session)?))
                }
            })
            .await
    }

    /// Flip the add-on with raw id `option` (e.g. callback data).
    pub async fn submit_toggle(
        &self,
        session_id: &SessionId,
        option: &str,
    ) -> Result<ToggleOutcome, FormError> {
        self.store
            .update(session_id, |session| {
                let Some(addon) = session.form.option(option).cloned() else {
                    debug!(session_id = %session.id, option, "Unrecognized option");
                    return Ok(ToggleOutcome::Unrecognized);
                };
                let selected = session.toggle(addon.id)?;
                let item = ToggleItem {
                    id: addon.id,
                    label: addon.label,
                    description: addon.description,
                    selected,
                };
                Ok(if selected {
                    ToggleOutcome::ToggledOn(item)
                } else {
                    ToggleOutcome::ToggledOff(item)
                })
            })
            .await
    }

    /// Abandon the session. Returns whether one existed.
    pub async fn cancel_session(&self, session_id: &SessionId) -> bool {
        self.store.cancel(session_id).await
    }
}

/// An area that could overflow the total is refused before the session moves on.
fn priceable(form: &Form, step: StepId, answer: &AnswerValue) -> bool {
    form.tariff()
        .is_none_or(|tariff| tariff.admits(form.options(), step, answer))
}

fn confirm(session: &mut Session, raw: &str) -> Result<Outcome, FormError> {
    match parse_confirmation(raw) {
        Some(true) => {
            let record = Record::assemble(session)?;
            session.close();
            info!(
                session_id = %session.id,
                form = %record.form,
                record_id = %record.id,
                "Form completed"
            );
            Ok(Outcome::Completed(record))
        }
        Some(false) => {
            session.reset();
            info!(session_id = %session.id, form = %session.form.id(), "Form discarded");
            let discarded = session.form.texts().discarded;
            Ok(Outcome::Discarded(
                Prompt::for_session(session)?.with_preamble(discarded),
            ))
        }
        None => Ok(Outcome::Rejected {
            reason: Rejection::NotConfirmation,
            prompt: Prompt::for_session(session)?,
        }),
    }
}
