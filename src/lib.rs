pub mod app;
pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod handlers;
pub mod relay;
pub mod upstream;
