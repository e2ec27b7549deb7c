//! Form definitions: the fixed step tables the engine walks through.
//!
//! A form is a linear chain of steps. Each step knows which answers it
//! accepts and which step follows it; the step after the last one is the
//! terminal confirmation. Tables are built and validated once at startup and
//! shared read-only afterwards.

pub mod catalog;
pub mod definition;
pub mod option;
pub mod step;
pub mod validate;

pub use definition::{Form, FormBuilder, FormId, FormTexts};
pub use option::AddOn;
pub use step::{AnswerValue, GalleryItem, OptionId, Position, Step, StepId, StepKind};
pub use validate::{Validated, validate};
