// Library interface for briefing modules
// This allows tests and the binary to import modules

pub mod article;
pub mod ingestion;
pub mod llm;
pub mod newsletter;
pub mod pipeline;
pub mod sanitize;
pub mod server;
