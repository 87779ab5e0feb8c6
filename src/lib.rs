//! Campaign Assist — conversational campaign builder and sequence editor.

pub mod campaign;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod sequence;
pub mod server;
pub mod voice;
