// Library exports for inbox-digest crate
// This allows tests and other crates to use the modules

pub mod agent;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod email;
pub mod execution_log;
pub mod gmail_client;
pub mod llm;
pub mod mailbox;
pub mod server;
