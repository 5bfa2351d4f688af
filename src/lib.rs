pub mod chat;
pub mod error;
pub mod exchange_log;
pub mod extractor;
pub mod llm_wrapper;
pub mod responder;
pub mod schemas;
pub mod server;
pub mod settings;
