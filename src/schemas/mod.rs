pub mod chat;
pub mod exchange;
pub mod generation;
