//! Conversation sessions: per-user progress, answers and add-on selections.

mod answers;
mod state;
mod store;

pub use answers::{Answers, ToggleSet};
pub use state::{ClientInfo, Session, SessionId};
pub use store::{SessionStore, spawn_prune_task};
