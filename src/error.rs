//! Error types for the order bot.

use crate::form::{OptionId, StepId};

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Contract violations and configuration errors raised by the form engine.
///
/// Invalid answers are not errors; they come back as a [`Rejection`] and
/// leave the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("No active session {session_id}")]
    NoActiveSession { session_id: String },

    #[error("Session {session_id} is at {actual}, not at step {expected}")]
    StepMismatch {
        session_id: String,
        expected: String,
        actual: String,
    },

    #[error("Session {session_id} has not reached the final step")]
    IncompleteSession { session_id: String },

    #[error("Form {form} references unknown option {option}")]
    UnrecognizedOption { form: String, option: OptionId },

    #[error("Invalid definition of form {form}: {reason}")]
    FormDefinition { form: String, reason: String },

    #[error("Unknown form {0}")]
    UnknownForm(String),

    #[error("Step {step} has no usable answer: {reason}")]
    InvalidAnswer { step: StepId, reason: String },
}

/// Record export errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export sink {sink} failed: {reason}")]
    DeliveryFailed { sink: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a raw answer was not accepted at the current step.
///
/// Rejections are recoverable: the caller re-prompts the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("answer is not a number")]
    NotNumeric,

    #[error("number is too large")]
    OutOfRange,

    #[error("message has no text")]
    NoText,

    #[error("answer is not one of the offered options")]
    NotAnOption,

    #[error("answer is not a valid phone number")]
    InvalidPhoneFormat,

    #[error("answer is neither yes nor no")]
    NotConfirmation,
}

impl Rejection {
    /// Text shown to the user before the step is asked again.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotNumeric => "Введите числовое значение",
            Self::OutOfRange => "Слишком большое значение, введите реальную площадь.",
            Self::NoText => "Ответьте, пожалуйста, текстовым сообщением.",
            Self::NotAnOption => "Нажмите одну из кнопок ниже.",
            Self::InvalidPhoneFormat => "Не корректный номер.",
            Self::NotConfirmation => "Нажмите, пожалуйста, кнопку да или нет",
        }
    }
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
