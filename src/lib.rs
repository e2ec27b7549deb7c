//! Order Bot: questionnaire-driven order intake over chat.

pub mod bot;
pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod form;
pub mod pricing;
pub mod record;
pub mod session;
