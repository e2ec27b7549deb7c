//! Answer validation: turns raw chat input into typed answers.

use super::step::{AnswerValue, Step, StepKind};
use crate::error::Rejection;

/// Outcome of validating one raw input against a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// The input answers the step.
    Answer(AnswerValue),
    /// The input closes a toggle step; the selection lives in the toggle set.
    Continue,
}

/// Validate raw input against the expectations of `step`.
///
/// Pure: never touches session state.
pub fn validate(step: &Step, raw: &str) -> Result<Validated, Rejection> {
    match &step.kind {
        StepKind::FreeText => Ok(Validated::Answer(AnswerValue::Text(raw.to_string()))),
        StepKind::NumericText => {
            if is_digits(raw) {
                Ok(Validated::Answer(AnswerValue::Number(raw.to_string())))
            } else {
                Err(Rejection::NotNumeric)
            }
        }
        StepKind::Phone { min_len } => {
            if is_digits(raw) && raw.chars().count() >= *min_len {
                Ok(Validated::Answer(AnswerValue::Text(raw.to_string())))
            } else {
                Err(Rejection::InvalidPhoneFormat)
            }
        }
        StepKind::SingleChoice { .. } => step
            .kind
            .choices()
            .find(|choice| *choice == raw)
            .map(|choice| Validated::Answer(AnswerValue::Choice(choice.to_string())))
            .ok_or(Rejection::NotAnOption),
        StepKind::MultiToggle { .. } => Ok(Validated::Continue),
    }
}

fn is_digits(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}
